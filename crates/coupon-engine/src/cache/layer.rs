//! # Typed Coupon Cache
//!
//! Wraps a [`CacheBackend`] with JSON (de)serialization, the TTL policy and
//! error swallowing. Nothing in here returns an error: every failure is logged
//! at `warn` and reported to the caller as a miss.
//!
//! ## TTL Policy
//! ```text
//! coupon:{code}   ttl = min(expiry - now, coupon_ttl_cap)
//! coupons:valid   ttl = min(collection_ttl, earliest member expiry - now)
//!
//! ttl <= 0  ──►  nothing is written
//! ```
//!
//! ## Snapshot Generations
//! ```text
//! invalidate_valid      INCR coupons:valid:version, then DEL coupons:valid
//!
//! listing               g = valid_generation()
//!                       load from store
//!                       put_valid_snapshot(.., g):
//!                           version != g  ──► skip
//!                           SET coupons:valid
//!                           version != g  ──► DEL coupons:valid
//! ```
//! An invalidation that lands while a listing is loading or writing always
//! leaves the snapshot key empty: either its own `DEL` runs after the `SET`,
//! or the writer sees the new version afterwards and deletes its entry. The
//! version lives in the backend, so this holds across processes sharing one
//! Redis.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CacheBackend;
use coupon_core::Coupon;

/// Key of the "all unexpired coupons" snapshot.
pub const VALID_COUPONS_KEY: &str = "coupons:valid";

/// Counter bumped by every snapshot invalidation.
pub const VALID_VERSION_KEY: &str = "coupons:valid:version";

/// Key of a single coupon definition.
pub fn coupon_key(code: &str) -> String {
    format!("coupon:{code}")
}

/// The cached collection of unexpired coupons, with the instant it was
/// computed at. Every member had `expiry_date >= as_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidSnapshot {
    pub as_of: DateTime<Utc>,
    pub coupons: Vec<Coupon>,
}

/// Cache-aside helper for coupons.
#[derive(Clone)]
pub struct CouponCache {
    backend: Arc<dyn CacheBackend>,
    coupon_ttl_cap: Duration,
    collection_ttl: Duration,
}

impl CouponCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        coupon_ttl_cap: Duration,
        collection_ttl: Duration,
    ) -> Self {
        CouponCache {
            backend,
            coupon_ttl_cap,
            collection_ttl,
        }
    }

    // =========================================================================
    // Single coupon
    // =========================================================================

    pub async fn get_coupon(&self, code: &str) -> Option<Coupon> {
        self.get_json(&coupon_key(code)).await
    }

    /// Caches `coupon` until its expiry (capped). Already-expired coupons are
    /// not written.
    pub async fn put_coupon(&self, coupon: &Coupon, now: DateTime<Utc>) {
        let Some(ttl) = remaining(coupon.expiry_date, now).map(|t| t.min(self.coupon_ttl_cap))
        else {
            debug!(code = %coupon.code, "Coupon already expired; not caching");
            return;
        };
        self.set_json(&coupon_key(&coupon.code), coupon, ttl).await;
    }

    pub async fn invalidate_coupon(&self, code: &str) {
        self.delete(&coupon_key(code)).await;
    }

    // =========================================================================
    // Valid-coupons snapshot
    // =========================================================================

    pub async fn get_valid_snapshot(&self) -> Option<ValidSnapshot> {
        self.get_json(VALID_COUPONS_KEY).await
    }

    /// Current snapshot generation. `None` when the backend cannot say, in
    /// which case no snapshot should be written.
    pub async fn valid_generation(&self) -> Option<u64> {
        match self.backend.get(VALID_VERSION_KEY).await {
            Ok(None) => Some(0),
            Ok(Some(raw)) => match raw.parse() {
                Ok(generation) => Some(generation),
                Err(e) => {
                    warn!(key = VALID_VERSION_KEY, error = %e, "Unreadable snapshot version");
                    None
                }
            },
            Err(e) => {
                warn!(key = VALID_VERSION_KEY, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Caches the snapshot until the first member expires (capped by the
    /// collection TTL), provided no invalidation happened since `generation`
    /// was read.
    pub async fn put_valid_snapshot(
        &self,
        snapshot: &ValidSnapshot,
        now: DateTime<Utc>,
        generation: u64,
    ) {
        let earliest = snapshot.coupons.iter().map(|c| c.expiry_date).min();
        let ttl = match earliest {
            None => Some(self.collection_ttl),
            Some(expiry) => remaining(expiry, now).map(|t| t.min(self.collection_ttl)),
        };
        let Some(ttl) = ttl else {
            debug!("Snapshot member already expired; not caching");
            return;
        };

        if self.valid_generation().await != Some(generation) {
            debug!(generation, "Snapshot invalidated while loading; not caching");
            return;
        }
        self.set_json(VALID_COUPONS_KEY, snapshot, ttl).await;

        if self.valid_generation().await != Some(generation) {
            debug!(generation, "Snapshot invalidated while writing; dropping it");
            self.delete(VALID_COUPONS_KEY).await;
        }
    }

    pub async fn invalidate_valid(&self) {
        if let Err(e) = self.backend.incr(VALID_VERSION_KEY).await {
            warn!(key = VALID_VERSION_KEY, error = %e, "Failed to bump snapshot version");
        }
        self.delete(VALID_COUPONS_KEY).await;
    }

    /// `true` when the backend answers.
    pub async fn ping(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Cache ping failed");
                false
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed; falling back to store");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Undecodable cache entry; dropping it");
                self.delete(key).await;
                None
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, &raw, ttl).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            warn!(key, error = %e, "Cache invalidation failed");
        }
    }
}

impl std::fmt::Debug for CouponCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponCache")
            .field("coupon_ttl_cap", &self.coupon_ttl_cap)
            .field("collection_ttl", &self.collection_ttl)
            .finish_non_exhaustive()
    }
}

/// Time from `now` until `until`, or `None` if `until` is not in the future.
fn remaining(until: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    (until - now).to_std().ok().filter(|d| !d.is_zero())
}

// =============================================================================
// Unit Tests
// =============================================================================
