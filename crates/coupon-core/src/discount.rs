//! # Discount Calculator
//!
//! Turns an eligible coupon and an order total into a discount.
//!
//! ```text
//! Flat:        min(value, cap)               cap > 0
//!              value                         cap = 0
//! Percentage:  min(total × pct, cap)         cap > 0
//!              total × pct                   cap = 0
//! ```
//!
//! The result is keyed by the coupon's [`DiscountTarget`] so the caller knows
//! whether the amount comes off medicine lines, delivery or the whole order.

use std::collections::BTreeMap;

use crate::money::Money;
use crate::types::{Coupon, DiscountTarget, DiscountType};

/// Discount amounts keyed by target. Always holds exactly one entry.
pub type DiscountBreakdown = BTreeMap<DiscountTarget, Money>;

/// Computes the discount amount for `coupon` against `order_total`.
///
/// The coupon is assumed to have passed creation validation (non-negative
/// value, percentage at most 100).
///
/// ## Example
/// ```rust,ignore
/// // 20% of 120.50, uncapped
/// assert_eq!(discount_amount(&save20, Money::from_cents(12050)).cents(), 2410);
/// ```
pub fn discount_amount(coupon: &Coupon, order_total: Money) -> Money {
    let raw = match coupon.discount_type {
        DiscountType::Flat => coupon.flat_amount(),
        DiscountType::Percentage => order_total.percentage_of(coupon.percentage()),
    };
    if coupon.is_capped() {
        raw.min(coupon.max_discount_amount)
    } else {
        raw
    }
}

/// Computes the discount and keys it by the coupon's target.
pub fn calculate(coupon: &Coupon, order_total: Money) -> DiscountBreakdown {
    let mut breakdown = DiscountBreakdown::new();
    breakdown.insert(coupon.discount_target, discount_amount(coupon, order_total));
    breakdown
}

// =============================================================================
// Unit Tests
// =============================================================================
