//! Engine configuration.

use std::time::Duration;

/// Tunables for [`RedemptionEngine`](crate::RedemptionEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on how long a single coupon stays cached.
    pub coupon_ttl_cap: Duration,

    /// Upper bound on how long the valid-coupons snapshot stays cached.
    pub collection_ttl: Duration,

    /// Deadline for the locked section of a redemption.
    pub validation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            coupon_ttl_cap: Duration::from_secs(3600),
            collection_ttl: Duration::from_secs(600),
            validation_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub fn coupon_ttl_cap(mut self, ttl: Duration) -> Self {
        self.coupon_ttl_cap = ttl;
        self
    }

    pub fn collection_ttl(mut self, ttl: Duration) -> Self {
        self.collection_ttl = ttl;
        self
    }

    pub fn validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }
}
