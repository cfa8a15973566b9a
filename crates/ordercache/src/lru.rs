//! LRU (Least Recently Used) cache implementation
//!
//! A key index over an arena-backed recency list, both guarded by one
//! mutex. Every operation is O(1). `get` reorders the list, so there is no
//! shared read path.

use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;
use parking_lot::Mutex;

use crate::list::List;
use crate::stats::CacheStats;

/// Upper bound on slots reserved up front, larger caches grow on demand
const MAX_PREALLOCATED: usize = 4096;

/// Key/value pair stored in a list node
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Index and recency list, always mutated together
struct Inner<K, V> {
    index: HashMap<K, usize, RandomState>,
    list: List<Entry<K, V>>,
}

/// Thread-safe LRU cache with fixed capacity
///
/// A capacity of 0 disables caching: `put` stores nothing and every `get`
/// misses.
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new LRU cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        let reserved = capacity.min(MAX_PREALLOCATED);
        Self {
            inner: Mutex::new(Inner {
                index: HashMap::with_capacity_and_hasher(reserved, RandomState::new()),
                list: List::with_capacity(reserved),
            }),
            capacity,
            stats: CacheStats::new(),
        }
    }

    /// Get a value and mark it most recently used
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();

        let Some(idx) = inner.index.get(key).copied() else {
            self.stats.record_miss();
            return None;
        };

        inner.list.move_to_front(idx);
        self.stats.record_hit();
        inner.list.get(idx).map(|entry| entry.value.clone())
    }

    /// Insert or overwrite a key, evicting the least recently used entry
    /// when the cache grows past capacity
    pub fn put(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock();

        if let Some(idx) = inner.index.get(&key).copied() {
            if let Some(entry) = inner.list.get_mut(idx) {
                entry.value = value;
            }
            inner.list.move_to_front(idx);
            return;
        }

        let idx = inner.list.push_front(Entry {
            key: key.clone(),
            value,
        });
        inner.index.insert(key, idx);
        self.stats.record_insert();

        // At most one over capacity here
        if inner.list.len() > self.capacity {
            if let Some(evicted) = inner.list.pop_back() {
                inner.index.remove(&evicted.key);
                self.stats.record_eviction();
            }
        }
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().list.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the capacity fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Panics unless the index and the list describe the same entries
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let inner = self.inner.lock();

        inner.list.assert_consistent();
        assert!(inner.list.len() <= self.capacity, "over capacity");
        assert_eq!(inner.index.len(), inner.list.len(), "index and list sizes differ");

        for (key, &idx) in &inner.index {
            let entry = inner.list.get(idx).expect("index points at a vacant slot");
            assert!(entry.key == *key, "index points at a node holding another key");
        }

        for entry in inner.list.iter() {
            assert!(inner.index.contains_key(&entry.key), "list node missing from index");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lru_basic() {
        let cache = LruCache::new(2);

        cache.put(1, "a");
        cache.put(2, "b");

        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.len(), 2);
        cache.assert_consistent();
    }

    #[test]
    fn test_lru_eviction_in_insertion_order() {
        let capacity = 5;
        let cache = LruCache::new(capacity);

        for key in 0..=capacity {
            cache.put(key, key * 10);
        }

        assert_eq!(cache.get(&0), None);
        for key in 1..=capacity {
            assert_eq!(cache.get(&key), Some(key * 10));
        }
        assert_eq!(cache.len(), capacity);
        assert_eq!(cache.stats().evictions(), 1);
        cache.assert_consistent();
    }

    #[test]
    fn test_get_defers_eviction() {
        let capacity = 3;
        let cache = LruCache::new(capacity);

        cache.put(0, 0);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.get(&0), Some(0));

        for key in 10..10 + capacity - 1 {
            cache.put(key, key);
        }

        assert_eq!(cache.get(&0), Some(0));
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), None);
        cache.assert_consistent();
    }

    #[test]
    fn test_lru_overwrite() {
        let cache = LruCache::new(2);

        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(1, "c");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some("c"));
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.stats().inserts(), 2);
        assert_eq!(cache.stats().evictions(), 0);
        cache.assert_consistent();
    }

    #[test]
    fn test_overwrite_refreshes_recency() {
        let cache = LruCache::new(2);

        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(1, 100);
        cache.put(3, 3);

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(100));
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = LruCache::new(0);

        for key in 0..10 {
            cache.put(key, key);
            assert_eq!(cache.get(&key), None);
        }

        assert!(cache.is_empty());
        assert_eq!(cache.stats().inserts(), 0);
        assert_eq!(cache.stats().evictions(), 0);
        assert_eq!(cache.stats().misses(), 10);
        cache.assert_consistent();
    }

    #[test]
    fn test_capacity_one() {
        let cache = LruCache::new(1);

        cache.put("a", 1);
        cache.put("b", 2);

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.len(), 1);
        cache.assert_consistent();
    }

    #[test]
    fn test_huge_capacity_grows_on_demand() {
        let cache: LruCache<u64, u64> = LruCache::new(usize::MAX);

        for key in 0..5000 {
            cache.put(key, key * 2);
        }

        assert_eq!(cache.capacity(), usize::MAX);
        assert_eq!(cache.len(), 5000);
        assert_eq!(cache.get(&1), Some(2));
        assert_eq!(cache.get(&4999), Some(9998));
        assert_eq!(cache.stats().evictions(), 0);
        cache.assert_consistent();
    }

    #[test]
    fn test_recency_scenario() {
        let cache = LruCache::new(2);

        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&2), Some(2));

        cache.get(&1);
        cache.put(3, 3);
        assert_eq!(cache.get(&3), Some(3));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(1));

        cache.put(3, 30);
        assert_eq!(cache.get(&3), Some(30));

        // 1 is now the least recently used entry
        cache.put(2, 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(2));
        assert_eq!(cache.get(&3), Some(30));
        cache.assert_consistent();
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = LruCache::new(4);

        cache.put("x", 1);
        cache.get(&"x");
        cache.get(&"x");
        cache.get(&"y");

        let snapshot = cache.stats().snapshot();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.inserts, 1);
    }

    #[test]
    fn test_concurrent_access_keeps_index_and_list_in_sync() {
        let capacity = 64;
        let cache = Arc::new(LruCache::new(capacity));

        let handles: Vec<_> = (0..8u64)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..5_000u64 {
                        let key = (i * 7 + worker * 13) % 200;
                        if i % 3 == 0 {
                            if let Some(value) = cache.get(&key) {
                                assert_eq!(value % 1_000, key);
                            }
                        } else {
                            cache.put(key, worker * 1_000_000 + i * 1_000 + key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        cache.assert_consistent();
        assert_eq!(cache.len(), capacity);

        let snapshot = cache.stats().snapshot();
        assert_eq!(snapshot.inserts - snapshot.evictions, capacity as u64);
    }
}
