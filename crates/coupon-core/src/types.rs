//! # Domain Types
//!
//! Core domain types used throughout the coupon service.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐   ┌─────────────────┐   ┌─────────────────┐   │
//! │  │       Coupon        │   │      Cart       │   │   UsageRecord   │   │
//! │  │  ─────────────────  │   │  ─────────────  │   │  ─────────────  │   │
//! │  │  code (unique)      │   │  items[]        │   │  id             │   │
//! │  │  discount_type      │   │  order_total    │   │  user_id        │   │
//! │  │  discount_value     │   └─────────────────┘   │  coupon_code FK │   │
//! │  │  discount_target    │                         │  used_at        │   │
//! │  │  expiry / window    │                         └─────────────────┘   │
//! │  │  applicable sets    │                                               │
//! │  │  limits / cap       │                                               │
//! │  └─────────────────────┘                                               │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiscountType   │   │ DiscountTarget  │   │   UsageType     │       │
//! │  │  Flat           │   │  Medicine       │   │  SingleUse      │       │
//! │  │  Percentage     │   │  Delivery       │   │  MultiUse       │       │
//! │  └─────────────────┘   │  TotalOrderValue│   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A coupon is written once and never edited, so every field on [`Coupon`]
//! is safe to cache until the coupon's expiry.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 2000 bps = 20%.
/// A percentage discount of `12.5` arrives on the wire and is stored as 1250.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }
}

// =============================================================================
// Closed Enums
// =============================================================================

/// How the discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Fixed amount off.
    Flat,
    /// Percentage of the order total.
    Percentage,
}

/// What the discount is applied to.
///
/// Used as the key of [`DiscountBreakdown`](crate::DiscountBreakdown), so it
/// is `Ord` and serializes as a plain string map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountTarget {
    /// Medicine line items.
    Medicine,
    /// Delivery fee.
    Delivery,
    /// The whole order.
    TotalOrderValue,
}

impl DiscountTarget {
    /// The wire / storage spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountTarget::Medicine => "medicine",
            DiscountTarget::Delivery => "delivery",
            DiscountTarget::TotalOrderValue => "total_order_value",
        }
    }
}

/// Descriptive usage class. The enforced limit is always
/// [`Coupon::max_usage_per_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    #[serde(alias = "single-use")]
    SingleUse,
    #[serde(alias = "multi-use")]
    MultiUse,
}

// =============================================================================
// Validity Window
// =============================================================================

/// Inclusive `[start, end]` interval during which a coupon may be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ValidityWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        ValidityWindow { start, end }
    }

    /// Both bounds are inclusive.
    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// `start <= end`; enforced when a coupon is created.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A coupon definition.
///
/// ## Discount Value Encoding
/// `discount_value` is an integer in hundredths of the wire value:
/// - `Flat`: cents (`50.0` → `5000`)
/// - `Percentage`: basis points (`20` → `2000`)
///
/// Use [`Coupon::flat_amount`] / [`Coupon::percentage`] instead of reading the
/// raw field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Unique business identifier (e.g. `SAVE20`).
    pub code: String,

    pub discount_type: DiscountType,

    /// Hundredths: cents for flat, basis points for percentage.
    pub discount_value: i64,

    pub discount_target: DiscountTarget,

    /// Order total must be at least this amount.
    pub min_order_value: Money,

    /// How many times a single user may redeem this coupon.
    pub max_usage_per_user: i64,

    /// After this instant the coupon is expired.
    pub expiry_date: DateTime<Utc>,

    pub valid_window: ValidityWindow,

    /// Item ids the coupon applies to. Empty means "no item restriction".
    #[serde(default)]
    pub applicable_item_ids: BTreeSet<String>,

    /// Categories the coupon applies to. Empty means "no category restriction".
    #[serde(default)]
    pub applicable_categories: BTreeSet<String>,

    pub usage_type: UsageType,

    #[serde(default)]
    pub terms_and_conditions: String,

    /// Upper bound on the discount. Zero means uncapped.
    #[serde(default)]
    pub max_discount_amount: Money,
}

impl Coupon {
    /// The flat discount amount (meaningful for `DiscountType::Flat`).
    #[inline]
    pub fn flat_amount(&self) -> Money {
        Money::from_cents(self.discount_value)
    }

    /// The percentage discount (meaningful for `DiscountType::Percentage`).
    ///
    /// Values outside `0..=u32::MAX` collapse to zero; validation keeps stored
    /// coupons inside `0..=10000`.
    #[inline]
    pub fn percentage(&self) -> Percentage {
        Percentage::from_bps(u32::try_from(self.discount_value).unwrap_or(0))
    }

    /// The discount value as it appears on the wire (`20.0`, `50.0`).
    #[inline]
    pub fn discount_value_decimal(&self) -> f64 {
        self.discount_value as f64 / 100.0
    }

    /// `true` when `at` is strictly after the expiry date.
    #[inline]
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at > self.expiry_date
    }

    /// `true` when at least one applicability set restricts the coupon.
    #[inline]
    pub fn is_restricted(&self) -> bool {
        !self.applicable_item_ids.is_empty() || !self.applicable_categories.is_empty()
    }

    /// `true` when the cap applies.
    #[inline]
    pub fn is_capped(&self) -> bool {
        self.max_discount_amount.is_positive()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of the shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub item_id: String,
    pub category: String,
    pub price: Money,
}

impl CartItem {
    pub fn new(item_id: impl Into<String>, category: impl Into<String>, price: Money) -> Self {
        CartItem {
            item_id: item_id.into(),
            category: category.into(),
            price,
        }
    }
}

/// The cart presented at checkout. Never persisted.
///
/// `order_total` is supplied by the caller and is not recomputed from the
/// items (it may include delivery and other fees).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub order_total: Money,
}

impl Cart {
    pub fn new(items: Vec<CartItem>, order_total: Money) -> Self {
        Cart { items, order_total }
    }
}

// =============================================================================
// Usage Record
// =============================================================================

/// Append-only evidence that a user redeemed a coupon once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: i64,
    pub user_id: String,
    pub coupon_code: String,
    pub used_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = ValidityWindow::new(ts(2025, 1, 1), ts(2025, 12, 31));
        assert!(window.contains(ts(2025, 1, 1)));
        assert!(window.contains(ts(2025, 12, 31)));
        assert!(!window.contains(ts(2024, 12, 31)));
        assert!(!window.contains(ts(2026, 1, 1)));
    }

    #[test]
    fn test_window_well_formed() {
        assert!(ValidityWindow::new(ts(2025, 1, 1), ts(2025, 1, 1)).is_well_formed());
        assert!(!ValidityWindow::new(ts(2025, 2, 1), ts(2025, 1, 1)).is_well_formed());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&DiscountTarget::TotalOrderValue).unwrap(),
            "\"total_order_value\""
        );
        assert_eq!(
            serde_json::from_str::<UsageType>("\"single-use\"").unwrap(),
            UsageType::SingleUse
        );
        assert_eq!(
            serde_json::from_str::<UsageType>("\"multi_use\"").unwrap(),
            UsageType::MultiUse
        );
        assert!(serde_json::from_str::<DiscountType>("\"bogus\"").is_err());
    }

    #[test]
    fn test_discount_target_as_str_matches_serde() {
        for target in [
            DiscountTarget::Medicine,
            DiscountTarget::Delivery,
            DiscountTarget::TotalOrderValue,
        ] {
            let json = serde_json::to_string(&target).unwrap();
            assert_eq!(json, format!("\"{}\"", target.as_str()));
        }
    }

    #[test]
    fn test_percentage_accessor_clamps_negative() {
        let mut coupon = crate::eligibility::tests::sample_coupon();
        coupon.discount_value = -5;
        assert_eq!(coupon.percentage(), Percentage::zero());
        coupon.discount_value = 2000;
        assert_eq!(coupon.percentage().bps(), 2000);
        assert_eq!(coupon.discount_value_decimal(), 20.0);
    }
}
