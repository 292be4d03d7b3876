//! # Validation Module
//!
//! Field-level validation for coupon definitions and redemption requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request schema (coupon-engine::request)                      │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Decimal → cents conversion                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── validate_coupon: creation rules → InvalidDefinition               │
//! │  └── validate_cart / validate_user_id: request rules → InvalidInput    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── PRIMARY KEY on coupon_code (final AlreadyExists decision)         │
//! │  └── Foreign key coupon_usages → coupons                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{Cart, Coupon, DiscountType};
use crate::{MAX_CART_ITEMS, MAX_COUPON_CODE_LEN, MAX_PERCENTAGE_BPS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifiers
// =============================================================================

/// Validates a coupon code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, digits, hyphens and underscores
///
/// ## Example
/// ```rust
/// use coupon_core::validation::validate_coupon_code;
///
/// assert!(validate_coupon_code("SAVE20").is_ok());
/// assert!(validate_coupon_code("").is_err());
/// assert!(validate_coupon_code("SAVE 20").is_err());
/// ```
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("coupon_code"));
    }

    if code.chars().count() > MAX_COUPON_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "coupon_code".to_string(),
            max: MAX_COUPON_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "coupon_code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a user id. Any non-blank string is accepted.
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    if user_id.trim().is_empty() {
        return Err(ValidationError::required("user_id"));
    }
    Ok(())
}

// =============================================================================
// Coupon Definition
// =============================================================================

/// Validates a coupon definition before it is persisted.
///
/// ## Rules
/// - valid coupon code
/// - `discount_value >= 0`, and `<= 100%` for percentage coupons
/// - `valid_window.start <= valid_window.end`
/// - `min_order_value >= 0`, `max_discount_amount >= 0`
/// - `max_usage_per_user >= 1`
///
/// An expiry date in the past is allowed; such a coupon simply never
/// validates.
pub fn validate_coupon(coupon: &Coupon) -> ValidationResult<()> {
    validate_coupon_code(&coupon.code)?;

    if coupon.discount_value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "discount_value".to_string(),
        });
    }

    if coupon.discount_type == DiscountType::Percentage && coupon.discount_value > MAX_PERCENTAGE_BPS
    {
        return Err(ValidationError::OutOfRange {
            field: "discount_value".to_string(),
            min: 0,
            max: 100,
        });
    }

    if !coupon.valid_window.is_well_formed() {
        return Err(ValidationError::InvalidWindow);
    }

    if coupon.min_order_value.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "min_order_value".to_string(),
        });
    }

    if coupon.max_discount_amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "max_discount_amount".to_string(),
        });
    }

    if coupon.max_usage_per_user < 1 {
        return Err(ValidationError::MustBePositive {
            field: "max_usage_per_user".to_string(),
        });
    }

    if coupon
        .applicable_item_ids
        .iter()
        .chain(coupon.applicable_categories.iter())
        .any(|entry| entry.trim().is_empty())
    {
        return Err(ValidationError::invalid_format(
            "applicable_medicine_ids",
            "entries must not be blank",
        ));
    }

    Ok(())
}

// =============================================================================
// Cart
// =============================================================================

/// Validates a cart presented for listing or redemption.
///
/// ## Rules
/// - `order_total > 0`
/// - at most [`MAX_CART_ITEMS`] items
/// - every item has a non-blank id and category and a positive price
pub fn validate_cart(cart: &Cart) -> ValidationResult<()> {
    if !cart.order_total.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "order_total".to_string(),
        });
    }

    if cart.items.len() > MAX_CART_ITEMS {
        return Err(ValidationError::TooMany {
            field: "cart_items".to_string(),
            max: MAX_CART_ITEMS,
        });
    }

    for item in &cart.items {
        if item.item_id.trim().is_empty() {
            return Err(ValidationError::required("cart_items.medicine_id"));
        }
        if item.category.trim().is_empty() {
            return Err(ValidationError::required("cart_items.category"));
        }
        if !item.price.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "cart_items.price".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::tests::{sample_cart, sample_coupon, ts};
    use crate::money::Money;
    use crate::types::{CartItem, ValidityWindow};

    #[test]
    fn test_validate_coupon_code() {
        assert!(validate_coupon_code("SAVE20").is_ok());
        assert!(validate_coupon_code("new-user_10").is_ok());
        assert!(validate_coupon_code("   ").is_err());
        assert!(validate_coupon_code("SAVE 20").is_err());
        assert!(validate_coupon_code(&"A".repeat(51)).is_err());
        assert!(validate_coupon_code(&"A".repeat(50)).is_ok());
    }

    #[test]
    fn test_sample_coupon_is_valid() {
        assert_eq!(validate_coupon(&sample_coupon()), Ok(()));
    }

    #[test]
    fn test_negative_discount_rejected() {
        let mut coupon = sample_coupon();
        coupon.discount_value = -1;
        assert!(matches!(
            validate_coupon(&coupon),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_percentage_above_100_rejected() {
        let mut coupon = sample_coupon();
        coupon.discount_value = 10_001;
        assert!(matches!(
            validate_coupon(&coupon),
            Err(ValidationError::OutOfRange { .. })
        ));

        // the same value is fine as a flat amount (100.01)
        coupon.discount_type = DiscountType::Flat;
        assert!(validate_coupon(&coupon).is_ok());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut coupon = sample_coupon();
        coupon.valid_window = ValidityWindow::new(ts(2025, 6, 1), ts(2025, 5, 1));
        assert_eq!(validate_coupon(&coupon), Err(ValidationError::InvalidWindow));
    }

    #[test]
    fn test_zero_usage_limit_rejected() {
        let mut coupon = sample_coupon();
        coupon.max_usage_per_user = 0;
        assert!(validate_coupon(&coupon).is_err());
    }

    #[test]
    fn test_negative_min_order_and_cap_rejected() {
        let mut coupon = sample_coupon();
        coupon.min_order_value = Money::from_cents(-1);
        assert!(validate_coupon(&coupon).is_err());

        let mut coupon = sample_coupon();
        coupon.max_discount_amount = Money::from_cents(-1);
        assert!(validate_coupon(&coupon).is_err());
    }

    #[test]
    fn test_expired_coupon_may_be_created() {
        let mut coupon = sample_coupon();
        coupon.valid_window = ValidityWindow::new(ts(2020, 1, 1), ts(2020, 2, 1));
        coupon.expiry_date = ts(2020, 2, 1);
        assert!(validate_coupon(&coupon).is_ok());
    }

    #[test]
    fn test_validate_cart() {
        assert!(validate_cart(&sample_cart()).is_ok());

        let mut cart = sample_cart();
        cart.order_total = Money::zero();
        assert!(validate_cart(&cart).is_err());

        let mut cart = sample_cart();
        cart.items.push(CartItem::new("med1", "fever", Money::zero()));
        assert!(validate_cart(&cart).is_err());

        let mut cart = sample_cart();
        cart.items.push(CartItem::new("", "fever", Money::from_cents(100)));
        assert_eq!(
            validate_cart(&cart),
            Err(ValidationError::required("cart_items.medicine_id"))
        );
    }

    #[test]
    fn test_cart_size_limit() {
        let items = (0..=MAX_CART_ITEMS)
            .map(|i| CartItem::new(format!("med{i}"), "fever", Money::from_cents(100)))
            .collect();
        let cart = Cart::new(items, Money::from_cents(10_000));
        assert!(matches!(validate_cart(&cart), Err(ValidationError::TooMany { .. })));
    }

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("user-1").is_ok());
        assert!(validate_user_id(" ").is_err());
    }
}
