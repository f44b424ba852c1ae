//! Generic TTL + LRU cache with hit/miss/eviction statistics, regex invalidation and
//! optional durable mirroring for warm starts.

mod config;
mod core;
mod entry;
mod metrics;
mod policy;
pub mod store;

pub use config::CacheConfig;
pub use core::{Cache, Cacheable};
pub use entry::CacheEntry;
pub use metrics::{CacheMetrics, CacheStats};
pub use store::{DurableStore, FileStore, MemoryStore};
