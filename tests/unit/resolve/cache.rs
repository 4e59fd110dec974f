use super::*;
use crate::resolve::resolver::ResolverConfig;
use crate::timeline::index::TimelineIndex;
use crate::timeline::record::{MatchRecording, TickRecord};

fn resolver(n: u64) -> FrameResolver {
    let rec = MatchRecording {
        map: "de_mirage".to_owned(),
        ticks: (0..n)
            .map(|i| TickRecord {
                tick: Tick(i),
                time: i as f64 / 128.0,
                players: Vec::new(),
                utility: Vec::new(),
                kills: Vec::new(),
                bomb: None,
                projectiles: Vec::new(),
            })
            .collect(),
        rounds: Vec::new(),
    };
    FrameResolver::new(
        Arc::new(TimelineIndex::from_recording(&rec).unwrap()),
        ResolverConfig::default(),
    )
}

#[test]
fn bounded_and_keeps_pinned_frame() {
    let r = resolver(1000);
    let cache = FrameCache::new(500);
    cache.pin(Tick(999));
    for t in 0..1000 {
        let f = cache.get(Tick(t), &r);
        assert_eq!(f.tick(), Tick(t));
        assert!(cache.len() <= 500);
    }
    assert!(cache.contains(Tick(999)));
    assert_eq!(cache.len(), 500);
    assert_eq!(cache.stats().misses, 1000);
    assert_eq!(cache.stats().evictions, 500);
}

#[test]
fn pinned_frame_survives_a_full_sweep() {
    let r = resolver(1000);
    let cache = FrameCache::new(500);
    cache.get(Tick(0), &r);
    cache.pin(Tick(0));
    for t in 1..1000 {
        cache.get(Tick(t), &r);
    }
    assert!(cache.contains(Tick(0)));
    assert!(cache.contains(Tick(999)));
    assert!(!cache.contains(Tick(1)));
    assert_eq!(cache.len(), 500);

    cache.unpin();
    cache.get(Tick(1), &r);
    assert!(!cache.contains(Tick(0)));
}

#[test]
fn hits_refresh_recency() {
    let r = resolver(10);
    let cache = FrameCache::new(2);
    let a = cache.get(Tick(1), &r);
    cache.get(Tick(2), &r);
    let again = cache.get(Tick(1), &r);
    assert!(Arc::ptr_eq(&a, &again));
    cache.get(Tick(3), &r);
    assert!(cache.contains(Tick(1)));
    assert!(!cache.contains(Tick(2)));
    assert_eq!(
        cache.stats(),
        CacheStats {
            hits: 1,
            misses: 3,
            evictions: 1
        }
    );
}

#[test]
fn cached_frames_match_fresh_resolution() {
    let r = resolver(100);
    let cache = FrameCache::new(4);
    for t in [5, 6, 5, 90, 5, 200] {
        assert_eq!(*cache.get(Tick(t), &r), r.resolve(Tick(t)));
    }
    // Out-of-range ticks share the clamped entry.
    assert!(cache.contains(Tick(99)));
}

#[test]
fn zero_capacity_is_raised_to_one() {
    let cache = FrameCache::new(0);
    assert_eq!(cache.capacity(), 1);
    let r = resolver(10);
    cache.get(Tick(1), &r);
    cache.get(Tick(2), &r);
    assert_eq!(cache.len(), 1);
    assert!(cache.peek(Tick(2)).is_some());
}

#[test]
fn clear_keeps_only_the_pin() {
    let r = resolver(10);
    let cache = FrameCache::new(8);
    for t in 0..5 {
        cache.get(Tick(t), &r);
    }
    cache.pin(Tick(3));
    cache.clear();
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(Tick(3)));
    assert_eq!(cache.pinned(), Some(Tick(3)));
}
