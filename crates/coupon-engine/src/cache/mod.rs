//! # Cache Layer
//!
//! Cache-aside storage in front of the coupon ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cache Layer                                     │
//! │                                                                         │
//! │  RedemptionEngine                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CouponCache (layer.rs)  typed JSON, TTL policy, errors → warn!        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Arc<dyn CacheBackend>                                                 │
//! │       ├── RedisCache     (redis.rs)   REDIS_URL set                    │
//! │       └── InMemoryCache  (memory.rs)  fallback / tests                 │
//! │                                                                         │
//! │  Keys                                                                  │
//! │    coupon:{code}    one coupon definition                              │
//! │    coupons:valid    snapshot of every unexpired coupon                 │
//! │    coupons:valid:version   bumped by every snapshot invalidation       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store is always authoritative. A miss or a backend failure falls back
//! to the store; a failed write or delete is logged and forgotten.

use std::time::Duration;

use thiserror::Error;

pub mod layer;
pub mod memory;
pub mod redis;

pub use layer::{CouponCache, ValidSnapshot};
pub use memory::InMemoryCache;
pub use self::redis::RedisCache;

/// Cache backend failures. Never leave the cache layer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for cache backend operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// A string key/value store with per-entry TTL.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the value, or `None` on a miss or an expired entry.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores `value` for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Removes the key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically adds one to the counter at `key` (missing counts as 0) and
    /// returns the new value. Counters never expire.
    async fn incr(&self, key: &str) -> CacheResult<u64>;

    /// Round-trips to the backend.
    async fn ping(&self) -> CacheResult<()>;
}

/// Backend whose every call fails. Used to prove cache failures never change
/// an outcome.
#[cfg(test)]
pub(crate) struct FailingCache;

#[cfg(test)]
#[async_trait::async_trait]
impl CacheBackend for FailingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::OperationFailed("backend down".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::OperationFailed("backend down".to_string()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::OperationFailed("backend down".to_string()))
    }

    async fn incr(&self, _key: &str) -> CacheResult<u64> {
        Err(CacheError::OperationFailed("backend down".to_string()))
    }

    async fn ping(&self) -> CacheResult<()> {
        Err(CacheError::OperationFailed("backend down".to_string()))
    }
}
