//! Cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for cache performance tracking
///
/// Updated with relaxed atomics, so they can be read without taking the
/// cache lock.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    inserts: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Lookups that found their key
    pub hits: u64,
    /// Lookups that did not find their key
    pub misses: u64,
    /// Entries dropped to respect the capacity bound
    pub evictions: u64,
    /// New keys added (updates of existing keys are not counted)
    pub inserts: u64,
}

impl StatsSnapshot {
    /// Total number of lookups
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit ratio (0.0 to 1.0), 0.0 before the first lookup
    pub fn hit_ratio(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

impl CacheStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get total misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get total evictions
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Get total inserts
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Copy all counters at once
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            evictions: self.evictions(),
            inserts: self.inserts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_basic() {
        let stats = CacheStats::new();

        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_insert();

        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.inserts(), 1);
        assert_eq!(stats.evictions(), 0);
        assert_eq!(stats.snapshot().hit_ratio(), 2.0 / 3.0);
    }

    #[test]
    fn test_empty_hit_ratio() {
        let snapshot = CacheStats::new().snapshot();

        assert_eq!(snapshot, StatsSnapshot::default());
        assert_eq!(snapshot.lookups(), 0);
        assert_eq!(snapshot.hit_ratio(), 0.0);
    }
}
