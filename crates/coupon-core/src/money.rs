//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    120.50 * 20 / 100 = 24.100000000000001  ❌                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    12050 cents × 2000 bps / 10000 = 2410 cents  ✅                      │
//! │                                                                         │
//! │  Floats only exist at the JSON boundary (`from_decimal` /              │
//! │  `to_decimal`). Every comparison and calculation runs on cents.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use coupon_core::money::Money;
//!
//! let total = Money::from_cents(12050);
//! assert_eq!(Money::from_decimal(120.5), Some(total));
//! assert_eq!(total.to_decimal(), 120.5);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: a coupon definition may arrive with a negative value;
///   it must be representable so validation can reject it
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serializes as cents**: cache blobs and database rows carry integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use coupon_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount from the wire into cents.
    ///
    /// Rounds half away from zero to the nearest cent. Returns `None` for
    /// NaN, infinities and amounts that do not fit in an `i64` of cents.
    ///
    /// ## Example
    /// ```rust
    /// use coupon_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(100.78).map(|m| m.cents()), Some(10078));
    /// assert_eq!(Money::from_decimal(f64::NAN), None);
    /// ```
    pub fn from_decimal(amount: f64) -> Option<Self> {
        to_hundredths(amount).map(Money)
    }

    /// Returns the amount as a decimal for JSON output.
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates `rate` of this amount, rounding half-up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(cents * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use coupon_core::money::Money;
    /// use coupon_core::types::Percentage;
    ///
    /// let total = Money::from_cents(12050);     // 120.50
    /// let rate = Percentage::from_bps(2000);    // 20%
    /// assert_eq!(total.percentage_of(rate).cents(), 2410); // 24.10
    /// ```
    pub fn percentage_of(&self, rate: Percentage) -> Money {
        // i128 so a large order total times 10000 bps cannot overflow
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }
}

/// Scales a wire decimal by 100 and rounds half away from zero.
///
/// Shared by money amounts (cents) and percentage discounts (basis points).
pub fn to_hundredths(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (value * 100.0).round();
    if scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
        return None;
    }
    Some(scaled as i64)
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with two decimals, e.g. `24.10`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_rounds_to_cent() {
        assert_eq!(Money::from_decimal(120.5), Some(Money::from_cents(12050)));
        assert_eq!(Money::from_decimal(100.78), Some(Money::from_cents(10078)));
        assert_eq!(Money::from_decimal(0.005), Some(Money::from_cents(1)));
        assert_eq!(Money::from_decimal(-5.0), Some(Money::from_cents(-500)));
    }

    #[test]
    fn test_from_decimal_rejects_non_finite() {
        assert_eq!(Money::from_decimal(f64::NAN), None);
        assert_eq!(Money::from_decimal(f64::INFINITY), None);
        assert_eq!(Money::from_decimal(1e300), None);
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(Money::from_cents(2410).to_decimal(), 24.1);
        assert_eq!(Money::from_cents(3000).to_decimal(), 30.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(2410).to_string(), "24.10");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
    }

    #[test]
    fn test_percentage_of_rounds_half_up() {
        // 10.05 at 10% = 1.005 -> 1.01
        let amount = Money::from_cents(1005);
        assert_eq!(amount.percentage_of(Percentage::from_bps(1000)).cents(), 101);
    }

    #[test]
    fn test_percentage_of_full_and_zero() {
        let amount = Money::from_cents(9999);
        assert_eq!(amount.percentage_of(Percentage::from_bps(10_000)), amount);
        assert!(amount.percentage_of(Percentage::zero()).is_zero());
    }

    #[test]
    fn test_min_and_arithmetic() {
        let a = Money::from_cents(5000);
        let b = Money::from_cents(3000);
        assert_eq!(a.min(b), b);
        assert_eq!(b.min(a), b);
        assert_eq!((a + b).cents(), 8000);
        assert_eq!((a - b).cents(), 2000);
    }
}
