//! Shared fixtures for the engine's unit tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use coupon_core::{
    Cart, CartItem, Coupon, DiscountTarget, DiscountType, Money, UsageType, ValidityWindow,
};
use coupon_db::{Database, DbConfig};

use crate::cache::{CacheBackend, InMemoryCache};
use crate::{EngineConfig, RedemptionEngine};

pub(crate) fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

/// 20% off the whole order, redeemable once per user during 2025.
pub(crate) fn save20() -> Coupon {
    Coupon {
        code: "SAVE20".to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: 2000,
        discount_target: DiscountTarget::TotalOrderValue,
        min_order_value: Money::from_cents(10050),
        max_usage_per_user: 1,
        expiry_date: Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap(),
        valid_window: ValidityWindow::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap(),
        ),
        applicable_item_ids: ["med001".to_string()].into_iter().collect(),
        applicable_categories: ["fever".to_string(), "pain_relief".to_string()]
            .into_iter()
            .collect(),
        usage_type: UsageType::SingleUse,
        terms_and_conditions: "One per customer".to_string(),
        max_discount_amount: Money::zero(),
    }
}

/// An unrestricted flat coupon that is valid from a year ago until `expiry`.
pub(crate) fn coupon_expiring(code: &str, expiry: DateTime<Utc>) -> Coupon {
    Coupon {
        code: code.to_string(),
        discount_type: DiscountType::Flat,
        discount_value: 5000,
        discount_target: DiscountTarget::TotalOrderValue,
        min_order_value: Money::zero(),
        max_usage_per_user: 1,
        expiry_date: expiry,
        valid_window: ValidityWindow::new(expiry - chrono::Duration::days(365), expiry),
        applicable_item_ids: Default::default(),
        applicable_categories: Default::default(),
        usage_type: UsageType::SingleUse,
        terms_and_conditions: String::new(),
        max_discount_amount: Money::zero(),
    }
}

/// Order total 120.50 with one pain_relief line.
pub(crate) fn pain_relief_cart() -> Cart {
    Cart::new(
        vec![
            CartItem::new("med001", "pain_relief", Money::from_cents(10078)),
            CartItem::new("med009", "vitamins", Money::from_cents(1972)),
        ],
        Money::from_cents(12050),
    )
}

pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) fn engine_over(db: Database, backend: Arc<dyn CacheBackend>) -> RedemptionEngine {
    RedemptionEngine::new(db, backend, EngineConfig::default())
}

pub(crate) async fn memory_engine() -> RedemptionEngine {
    engine_over(memory_db().await, Arc::new(InMemoryCache::new()))
}
