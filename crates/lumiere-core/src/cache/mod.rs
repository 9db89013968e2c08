//! Caching layer for lumiere-core
//!
//! Provides the 24h timed cache used for metadata API responses.

pub mod timed_cache;

pub use timed_cache::{CacheEntry, TimedCache, CACHE_TTL_MS};
