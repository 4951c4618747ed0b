//! Key-value cache with per-entry TTL.
//!
//! Every component shares one [`CacheStore`]; it is the only coordination
//! point between the mirror fetcher, the facet and query engines and the
//! change watcher. Values are stored as opaque JSON text and always written
//! whole, never mutated in place.

pub mod keys;
mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{CacheBackend, CacheConfig};
use crate::metrics::CACHE_LOOKUPS;

/// Errors for cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Trait for cache storage backends.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the raw value for a key, `None` if absent or expired.
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a raw value with the given time to live.
    async fn set_raw(&self, key: &str, ttl: Duration, value: String) -> Result<(), CacheError>;

    /// Delete a key. Returns whether something was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remaining time to live of a key, `None` if absent or expired.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Remove every entry.
    async fn flush_all(&self) -> Result<(), CacheError>;

    /// Drop expired entries eagerly. Returns the number removed.
    async fn purge_expired(&self) -> Result<usize, CacheError>;
}

/// Build the cache backend selected in configuration.
pub fn create_cache_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
        CacheBackend::Sqlite => Ok(Arc::new(SqliteCache::new(&config.path)?)),
    }
}

/// Read and deserialize a cached value.
///
/// A value that no longer deserializes (e.g. written by an older version) is
/// reported as a miss.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>, CacheError> {
    let family = keys::family(key);
    let raw = match store.get_raw(key).await? {
        Some(raw) => raw,
        None => {
            CACHE_LOOKUPS.with_label_values(&[family, "miss"]).inc();
            debug!(key, "cache miss");
            return Ok(None);
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => {
            CACHE_LOOKUPS.with_label_values(&[family, "hit"]).inc();
            Ok(Some(value))
        }
        Err(e) => {
            CACHE_LOOKUPS.with_label_values(&[family, "corrupt"]).inc();
            warn!(key, error = %e, "discarding undecodable cache entry");
            Ok(None)
        }
    }
}

/// Serialize and store a value, handing it back for chaining.
pub async fn set_json<T: Serialize>(
    store: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    value: T,
) -> Result<T, CacheError> {
    let raw =
        serde_json::to_string(&value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    store.set_raw(key, ttl, raw).await?;
    Ok(value)
}
