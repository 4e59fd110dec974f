use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::core::Tick;
use crate::resolve::frame::ResolvedFrame;
use crate::resolve::resolver::FrameResolver;

/// Default number of resolved frames kept per session.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Environment override for the cache capacity.
pub const CACHE_CAPACITY_ENV: &str = "TICKREEL_FRAME_CACHE_CAPACITY";

/// Hit/miss/eviction counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to resolve.
    pub misses: u64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
}

struct CacheInner {
    frames: HashMap<Tick, Arc<ResolvedFrame>>,
    // Front = least recently used.
    lru: VecDeque<Tick>,
    pinned: Option<Tick>,
    stats: CacheStats,
}

impl CacheInner {
    fn touch(&mut self, tick: Tick) {
        if let Some(pos) = self.lru.iter().position(|t| *t == tick) {
            self.lru.remove(pos);
        }
        self.lru.push_back(tick);
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.frames.len() > capacity {
            let pinned = self.pinned;
            let Some(pos) = self.lru.iter().position(|t| Some(*t) != pinned) else {
                break;
            };
            if let Some(old) = self.lru.remove(pos) {
                self.frames.remove(&old);
                self.stats.evictions += 1;
                tracing::trace!(tick = old.0, "frame cache eviction");
            }
        }
    }
}

/// Bounded LRU cache of resolved frames with one pinned entry.
///
/// The pinned tick (the frame currently on screen) is never evicted. Lookups and bookkeeping
/// share one mutex; resolution of a miss happens outside it, so workers resolving distinct
/// ticks do not serialize on the resolver.
pub struct FrameCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl std::fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("FrameCache")
            .field("capacity", &self.capacity)
            .field("len", &inner.frames.len())
            .field("pinned", &inner.pinned)
            .field("stats", &inner.stats)
            .finish()
    }
}

impl FrameCache {
    /// Create a cache holding at most `capacity` frames (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                frames: HashMap::with_capacity(capacity + 1),
                lru: VecDeque::with_capacity(capacity + 1),
                pinned: None,
                stats: CacheStats::default(),
            }),
        }
    }

    /// `default`, unless [`CACHE_CAPACITY_ENV`] holds a positive integer.
    pub fn capacity_from_env(default: usize) -> usize {
        std::env::var(CACHE_CAPACITY_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(default)
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Every critical section leaves the maps consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum number of frames retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the frame for `tick`, resolving and inserting it on a miss.
    pub fn get(&self, tick: Tick, resolver: &FrameResolver) -> Arc<ResolvedFrame> {
        let tick = resolver.index().clamp(tick);
        {
            let mut inner = self.lock();
            if let Some(frame) = inner.frames.get(&tick).cloned() {
                inner.stats.hits += 1;
                inner.touch(tick);
                return frame;
            }
            inner.stats.misses += 1;
        }

        let resolved = Arc::new(resolver.resolve(tick));

        let mut inner = self.lock();
        let frame = match inner.frames.get(&tick) {
            Some(existing) => Arc::clone(existing),
            None => {
                inner.frames.insert(tick, Arc::clone(&resolved));
                resolved
            }
        };
        inner.touch(tick);
        inner.evict_to(self.capacity);
        frame
    }

    /// Cached frame for `tick`, without resolving or updating recency.
    pub fn peek(&self, tick: Tick) -> Option<Arc<ResolvedFrame>> {
        self.lock().frames.get(&tick).cloned()
    }

    /// Return `true` when `tick` is cached.
    pub fn contains(&self, tick: Tick) -> bool {
        self.lock().frames.contains_key(&tick)
    }

    /// Exempt `tick` from eviction, replacing any previous pin.
    pub fn pin(&self, tick: Tick) {
        self.lock().pinned = Some(tick);
    }

    /// Drop the pin; the formerly pinned entry becomes evictable again.
    pub fn unpin(&self) {
        let mut inner = self.lock();
        inner.pinned = None;
        inner.evict_to(self.capacity);
    }

    /// Currently pinned tick.
    pub fn pinned(&self) -> Option<Tick> {
        self.lock().pinned
    }

    /// Number of cached frames.
    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters since construction.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Drop every entry except the pinned one.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let pinned = inner.pinned;
        inner.frames.retain(|t, _| Some(*t) == pinned);
        inner.lru.retain(|t| Some(*t) == pinned);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/cache.rs"]
mod tests;
