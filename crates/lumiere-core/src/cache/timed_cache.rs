//! Time-expiring cache over a persistent key-value store
//!
//! Entries are stored as `{"timestamp": <ms since epoch>, "data": <payload>}`.
//!
//! Invalidation:
//! - Age strictly greater than the TTL (24h) → miss, entry removed on read
//! - Unparsable entry → miss, left in place until the next `set` overwrites it
//!
//! No capacity bound and no background eviction.

use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result};
use crate::storage::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache time-to-live in milliseconds (one day)
pub const CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Stored envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Milliseconds since the Unix epoch when the entry was written
    pub timestamp: i64,
    pub data: T,
}

/// Key-value cache with time-based expiry
pub struct TimedCache<S> {
    store: S,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl<S: KeyValueStore> TimedCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl_ms: CACHE_TTL_MS,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the cached value if present, parsable and fresh
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(source) => {
                let err = CoreError::CacheCorrupt {
                    key: key.to_string(),
                    source,
                };
                debug!(key, error = %err, "Corrupt cache entry, treating as miss");
                return None;
            }
        };

        let age = self.clock.now().timestamp_millis() - entry.timestamp;
        if age > self.ttl_ms {
            debug!(key, age_ms = age, "Cache entry expired");
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove expired cache entry");
            }
            return None;
        }

        debug!(key, age_ms = age, "Cache hit");
        Some(entry.data)
    }

    /// Overwrite `key` with a freshly stamped entry
    pub fn set<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let entry = CacheEntry {
            timestamp: self.clock.now().timestamp_millis(),
            data,
        };
        let json = serde_json::to_string(&entry).map_err(CoreError::Serialize)?;
        self.store.set(key, &json)?;
        debug!(key, "Cache entry written");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()
    }
}
