//! Bounded result cache with expiry.
//!
//! Manages computed responses with:
//! - Least-recently-used eviction at a fixed capacity
//! - A time-to-live after which entries are treated as absent
//! - Explicit ownership (one cache per engine, no global state)

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// LRU + TTL cache keyed by request hash.
///
/// A hit refreshes the entry's recency but not its expiry.
#[derive(Debug)]
pub struct ResultCache<V> {
    entries: LruCache<String, (Instant, V)>,
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    /// Create a cache holding at most `capacity` entries (at least one) for
    /// `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    /// Get a live entry. Expired entries are dropped on access.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() <= self.ttl => {
                return Some(value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.pop(key);
        }
        None
    }

    /// Insert or replace an entry, evicting the least recently used one
    /// when full.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.entries.put(key.into(), (Instant::now(), value));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .peek(key)
            .is_some_and(|(stored_at, _)| stored_at.elapsed() <= self.ttl)
    }

    /// Number of stored entries, including any not yet purged after expiry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_set() {
        let mut cache = ResultCache::new(4, Duration::from_secs(60));
        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = ResultCache::new(2, Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        // Touch "a" so "b" becomes the eviction candidate
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let mut cache = ResultCache::new(2, Duration::from_millis(10));
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(30));
        assert!(!cache.contains("a"));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut cache = ResultCache::new(0, Duration::from_secs(60));
        assert_eq!(cache.capacity(), 1);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some(2));
    }
}
