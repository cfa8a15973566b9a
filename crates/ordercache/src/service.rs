//! Cache-aside service over a backing store
//!
//! Reads go through the LRU cache and fall back to the store on a miss.
//! Writes go to the store only; the next read of a freshly written key is a
//! cold miss. `fill` warms the cache from the store once at startup.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::lru::LruCache;

/// A value that knows the key it is cached under
pub trait Keyed {
    /// Key type
    type Key;

    /// Key of this value
    fn key(&self) -> Self::Key;
}

/// Durable store the cache sits in front of
pub trait BackingStore<K, V> {
    /// Store failure, including the not-found condition
    type Error;

    /// Fetch one value by key
    fn fetch(&self, key: &K) -> Result<V, Self::Error>;

    /// Fetch every stored value
    fn fetch_all(&self) -> Result<Vec<V>, Self::Error>;

    /// Durably store a value
    fn store(&self, value: &V) -> Result<(), Self::Error>;
}

/// Read-through cache combining an LRU cache with a backing store
pub struct CacheService<K, V, S> {
    /// Underlying persistent storage
    store: S,

    /// LRU cache for hot values
    cache: LruCache<K, V>,

    /// Set once the startup fill has completed
    warm: AtomicBool,
}

impl<K, V, S> CacheService<K, V, S>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone + Keyed<Key = K>,
    S: BackingStore<K, V>,
{
    /// Create a service with an empty cache of the given capacity
    ///
    /// # Arguments
    /// * `store` - Backing store
    /// * `capacity` - Maximum number of cached values, 0 disables caching
    pub fn new(store: S, capacity: usize) -> Self {
        Self {
            store,
            cache: LruCache::new(capacity),
            warm: AtomicBool::new(false),
        }
    }

    /// Get a value from the cache or the store
    ///
    /// Store errors are returned unchanged and nothing is cached for them.
    pub fn get(&self, key: &K) -> Result<V, S::Error> {
        if let Some(value) = self.cache.get(key) {
            debug!(key = ?key, "Got value from cache");
            return Ok(value);
        }

        // Unlocked between the miss and the put, concurrent misses for the
        // same key may both fetch; the later put wins.
        let value = self.store.fetch(key)?;
        debug!(key = ?key, "Got value from store");

        self.cache.put(key.clone(), value.clone());
        Ok(value)
    }

    /// Fetch every stored value, bypassing the cache
    pub fn get_all(&self) -> Result<Vec<V>, S::Error> {
        self.store.fetch_all()
    }

    /// Store a value without touching the cache
    pub fn create(&self, value: &V) -> Result<(), S::Error> {
        self.store.store(value)
    }

    /// Load every stored value into the cache
    ///
    /// Stops at the first store error. Must complete before read traffic is
    /// accepted if readers are to see a warm cache.
    ///
    /// # Returns
    /// * `Result<usize, S::Error>` - Number of values loaded
    pub fn fill(&self) -> Result<usize, S::Error> {
        let values = self.store.fetch_all()?;
        let count = values.len();

        for value in values {
            self.cache.put(value.key(), value);
        }

        self.warm.store(true, Ordering::Release);
        info!(
            loaded = count,
            cached = self.cache.len(),
            capacity = self.cache.capacity(),
            "Cache filled from store"
        );

        Ok(count)
    }

    /// True once `fill` has completed successfully
    pub fn is_warm(&self) -> bool {
        self.warm.load(Ordering::Acquire)
    }

    /// The LRU cache in front of the store
    pub fn cache(&self) -> &LruCache<K, V> {
        &self.cache
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }
}
