//! # ordercache
//!
//! Bounded in-memory LRU cache and the cache-aside service that puts it in
//! front of a persistent store.
//!
//! ## Architecture
//! - **HashMap**: AHash index from key to list slot (O(1))
//! - **LRU List**: arena-backed doubly-linked list for recency order (O(1))
//! - **Lock**: one mutex around index and list, `get` and `put` hold it for
//!   their full duration
//! - **Service**: read-through on miss, write to store only, startup fill

#![warn(missing_docs)]

mod list;
mod lru;
mod service;
mod stats;

pub use lru::LruCache;
pub use service::{BackingStore, CacheService, Keyed};
pub use stats::{CacheStats, StatsSnapshot};
