use super::*;

fn times(n: usize, rate: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 / rate).collect()
}

#[test]
fn detects_64_and_128() {
    assert_eq!(detect_tick_rate(&times(100, 64.0)).unwrap(), TickRate(64));
    assert_eq!(detect_tick_rate(&times(100, 128.0)).unwrap(), TickRate(128));
}

#[test]
fn median_ignores_sparse_hiccups() {
    let mut t = times(100, 64.0);
    // A handful of long frames (server hitch) must not shift the median.
    for v in t.iter_mut().skip(50) {
        *v += 0.25;
    }
    for v in t.iter_mut().skip(80) {
        *v += 0.5;
    }
    assert_eq!(detect_tick_rate(&t).unwrap(), TickRate(64));
}

#[test]
fn jitter_within_tolerance_is_accepted() {
    let t: Vec<f64> = (0..200)
        .map(|i| i as f64 / 64.0 + if i % 2 == 0 { 0.0002 } else { -0.0002 })
        .collect();
    assert_eq!(detect_tick_rate(&t).unwrap(), TickRate(64));
}

#[test]
fn rate_between_supported_values_is_ambiguous() {
    let err = detect_tick_rate(&times(100, 96.0)).unwrap_err();
    assert!(matches!(err, IndexError::AmbiguousRate { .. }));
}

#[test]
fn alternating_long_gaps_are_ambiguous() {
    // Every other delta is half a second; the median still lands on 1/64 s.
    let mut t = vec![0.0];
    for i in 0..101 {
        let step = if i % 2 == 0 { 1.0 / 64.0 } else { 0.5 };
        t.push(t[t.len() - 1] + step);
    }
    match detect_tick_rate(&t).unwrap_err() {
        IndexError::AmbiguousRate {
            median_secs,
            consistent,
        } => {
            assert!((median_secs - 1.0 / 64.0).abs() < 1e-12);
            assert!((consistent - 51.0 / 101.0).abs() < 1e-12);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn consistency_threshold_is_inclusive() {
    // 100 deltas: exactly 10 off-period ones still pass, 11 do not.
    let build = |irregular: usize| {
        let mut t = vec![0.0];
        for i in 0..100 {
            let step = if i < irregular { 0.1 } else { 1.0 / 128.0 };
            t.push(t[t.len() - 1] + step);
        }
        t
    };
    assert_eq!(detect_tick_rate(&build(10)).unwrap(), TickRate(128));
    assert!(matches!(
        detect_tick_rate(&build(11)).unwrap_err(),
        IndexError::AmbiguousRate { .. }
    ));
}

#[test]
fn too_few_ticks_is_an_error() {
    assert_eq!(
        detect_tick_rate(&[0.0]).unwrap_err(),
        IndexError::Empty { min: 2, got: 1 }
    );
}

#[test]
fn tick_conversions() {
    let r = TickRate(64);
    assert_eq!(r.secs_to_ticks(20.0), 1280);
    assert_eq!(r.ticks_to_secs(32), 0.5);
    assert_eq!(r.period_secs(), 1.0 / 64.0);
}
