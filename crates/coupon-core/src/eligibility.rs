//! # Eligibility Evaluator
//!
//! Decides whether a cart, at a given instant, with a given prior usage count,
//! qualifies for a coupon.
//!
//! ## Check Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate(coupon, cart, at, prior_usage)                                │
//! │                                                                         │
//! │   1. coupon missing?                 ──► NotFound                       │
//! │   2. at > expiry_date?               ──► Expired                        │
//! │   3. at ∉ [window.start, window.end] ──► OutOfWindow                    │
//! │   4. prior_usage >= max_per_user?    ──► UsageLimitReached              │
//! │   5. restricted and no item matches? ──► NotApplicable                  │
//! │   6. order_total < min_order_value?  ──► BelowMinimum                   │
//! │                                                                         │
//! │   First failing check wins. The order is part of the contract:         │
//! │   an expired coupon reports "expired" even if the user also exhausted  │
//! │   their allowance.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checks 1-3 depend only on immutable coupon fields, so the engine may run
//! them against a cached copy ([`precheck`]). Checks 4-6 always run against
//! the authoritative read inside the redemption transaction.

use chrono::{DateTime, Utc};

use crate::error::Rejection;
use crate::types::{Cart, Coupon};

/// Runs all six checks in order.
///
/// ## Example
/// ```rust,ignore
/// match evaluate(coupon.as_ref(), &cart, now, prior_usage) {
///     Ok(()) => { /* compute discount, record usage */ }
///     Err(rejection) => { /* {"valid": false, "reason": rejection.to_string()} */ }
/// }
/// ```
pub fn evaluate(
    coupon: Option<&Coupon>,
    cart: &Cart,
    at: DateTime<Utc>,
    prior_usage: i64,
) -> Result<(), Rejection> {
    let coupon = coupon.ok_or(Rejection::NotFound)?;
    check_timing(coupon, at)?;
    check_usage(coupon, prior_usage)?;
    check_applicability(coupon, cart)?;
    check_minimum(coupon, cart)
}

/// Checks 1-3 only. Safe to run against a cached coupon.
pub fn precheck(coupon: Option<&Coupon>, at: DateTime<Utc>) -> Result<(), Rejection> {
    let coupon = coupon.ok_or(Rejection::NotFound)?;
    check_timing(coupon, at)
}

/// Checks 5 and 6 only, for the advisory applicable-coupons listing.
///
/// A `true` here says nothing about the user's remaining allowance and is not
/// a promise that a later validation will succeed.
pub fn is_listable(coupon: &Coupon, cart: &Cart) -> bool {
    check_applicability(coupon, cart).is_ok() && check_minimum(coupon, cart).is_ok()
}

fn check_timing(coupon: &Coupon, at: DateTime<Utc>) -> Result<(), Rejection> {
    if coupon.is_expired_at(at) {
        return Err(Rejection::Expired);
    }
    if !coupon.valid_window.contains(at) {
        return Err(Rejection::OutOfWindow);
    }
    Ok(())
}

fn check_usage(coupon: &Coupon, prior_usage: i64) -> Result<(), Rejection> {
    if prior_usage >= coupon.max_usage_per_user {
        return Err(Rejection::UsageLimitReached);
    }
    Ok(())
}

fn check_applicability(coupon: &Coupon, cart: &Cart) -> Result<(), Rejection> {
    if !coupon.is_restricted() {
        return Ok(());
    }
    let matches = cart.items.iter().any(|item| {
        coupon.applicable_item_ids.contains(&item.item_id)
            || coupon.applicable_categories.contains(&item.category)
    });
    if matches {
        Ok(())
    } else {
        Err(Rejection::NotApplicable)
    }
}

fn check_minimum(coupon: &Coupon, cart: &Cart) -> Result<(), Rejection> {
    if cart.order_total < coupon.min_order_value {
        return Err(Rejection::BelowMinimum);
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
