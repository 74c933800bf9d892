//! Bounded TTL cache with lazy expiry.

use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// LRU-bounded cache whose entries expire a fixed time after insertion.
///
/// Expiry is checked on read; there is no background eviction.
pub struct TtlCache<K: Hash + Eq, V: Clone> {
    name: &'static str,
    ttl: Duration,
    entries: Mutex<LruCache<K, Entry<V>>>,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    pub fn new(name: &'static str, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                tracing::debug!(cache = self.name, "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.pop(key);
                tracing::debug!(cache = self.name, "cache entry expired");
                None
            }
            None => {
                tracing::debug!(cache = self.name, "cache miss");
                None
            }
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        self.entries.lock().put(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_expire_lazily() {
        let cache: TtlCache<String, u32> = TtlCache::new("test", 4, Duration::from_secs(60));
        let start = Instant::now();
        cache.insert_at("a".into(), 1, start);

        assert_eq!(cache.get_at(&"a".into(), start + Duration::from_secs(59)), Some(1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at(&"a".into(), start + Duration::from_secs(61)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let cache: TtlCache<u32, u32> = TtlCache::new("test", 2, Duration::from_secs(60));
        cache.insert(1, 10);
        cache.insert(2, 20);
        assert_eq!(cache.get(&1), Some(10));
        cache.insert(3, 30);

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache: TtlCache<u32, u32> = TtlCache::new("test", 0, Duration::from_secs(1));
        cache.insert(1, 1);
        assert_eq!(cache.get(&1), Some(1));
    }
}
