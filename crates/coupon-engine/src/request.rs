//! # Request Schema
//!
//! Typed request bodies, deserialized from the wire field names. Amounts
//! arrive as JSON numbers and are converted to integer cents (or basis points)
//! here, before anything else sees them.
//!
//! ```text
//! CouponDefinition        ──into_coupon()──►  Coupon
//! ApplicableCouponsRequest ──cart()────────►  Cart   + as_of
//! ValidateCouponRequest    ──cart()────────►  Cart   + user, code, as_of
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coupon_core::money::to_hundredths;
use coupon_db::truncate_to_millis;
use coupon_core::{
    Cart, CartItem, Coupon, DiscountTarget, DiscountType, Money, UsageType, ValidationError,
    ValidityWindow,
};

// =============================================================================
// Coupon Definition
// =============================================================================

/// `{"start": ..., "end": ...}` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Body of `POST /api/coupons`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponDefinition {
    pub coupon_code: String,
    pub expiry_date: DateTime<Utc>,
    pub usage_type: UsageType,
    #[serde(default)]
    pub applicable_medicine_ids: Vec<String>,
    #[serde(default)]
    pub applicable_categories: Vec<String>,
    #[serde(default)]
    pub min_order_value: f64,
    pub valid_time_window: TimeWindow,
    #[serde(default)]
    pub terms_and_conditions: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub max_usage_per_user: i64,
    pub discount_target: DiscountTarget,
    #[serde(default)]
    pub max_discount_amount: f64,
}

impl CouponDefinition {
    /// Converts the wire shape into a domain [`Coupon`].
    ///
    /// Only numeric conversion can fail here. The creation rules (negative
    /// values, inverted window, ...) are checked by
    /// [`validate_coupon`](coupon_core::validation::validate_coupon).
    ///
    /// Instants are cut to whole milliseconds, the precision the ledger
    /// stores, so the returned coupon equals what a later read yields.
    pub fn into_coupon(self) -> Result<Coupon, ValidationError> {
        let discount_value = to_hundredths(self.discount_value)
            .ok_or_else(|| ValidationError::invalid_format("discount_value", "not a finite amount"))?;

        Ok(Coupon {
            code: self.coupon_code.trim().to_string(),
            discount_type: self.discount_type,
            discount_value,
            discount_target: self.discount_target,
            min_order_value: amount("min_order_value", self.min_order_value)?,
            max_usage_per_user: self.max_usage_per_user,
            expiry_date: truncate_to_millis(self.expiry_date),
            valid_window: ValidityWindow::new(
                truncate_to_millis(self.valid_time_window.start),
                truncate_to_millis(self.valid_time_window.end),
            ),
            applicable_item_ids: self.applicable_medicine_ids.into_iter().collect::<BTreeSet<_>>(),
            applicable_categories: self.applicable_categories.into_iter().collect::<BTreeSet<_>>(),
            usage_type: self.usage_type,
            terms_and_conditions: self.terms_and_conditions,
            max_discount_amount: amount("max_discount_amount", self.max_discount_amount)?,
        })
    }
}

// =============================================================================
// Cart Requests
// =============================================================================

/// One cart line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemDto {
    pub medicine_id: String,
    pub category: String,
    pub price: f64,
}

/// Body of `POST /api/coupons/applicable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicableCouponsRequest {
    #[serde(default)]
    pub cart_items: Vec<CartItemDto>,
    pub order_total: f64,
    /// Evaluation instant; the current time when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ApplicableCouponsRequest {
    pub fn cart(&self) -> Result<Cart, ValidationError> {
        to_cart(&self.cart_items, self.order_total)
    }

    pub fn as_of(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.timestamp.unwrap_or(now)
    }
}

/// Body of `POST /api/coupons/validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateCouponRequest {
    pub user_id: String,
    pub coupon_code: String,
    #[serde(default)]
    pub cart_items: Vec<CartItemDto>,
    pub order_total: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ValidateCouponRequest {
    pub fn cart(&self) -> Result<Cart, ValidationError> {
        to_cart(&self.cart_items, self.order_total)
    }

    pub fn as_of(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.timestamp.unwrap_or(now)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn amount(field: &str, value: f64) -> Result<Money, ValidationError> {
    Money::from_decimal(value)
        .ok_or_else(|| ValidationError::invalid_format(field, "not a finite amount"))
}

fn to_cart(items: &[CartItemDto], order_total: f64) -> Result<Cart, ValidationError> {
    let items = items
        .iter()
        .map(|item| {
            Ok(CartItem::new(
                item.medicine_id.trim(),
                item.category.trim(),
                amount("cart_items.price", item.price)?,
            ))
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(Cart::new(items, amount("order_total", order_total)?))
}

// =============================================================================
// Unit Tests
// =============================================================================
