//! # Error Types
//!
//! Domain-specific error types for coupon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  coupon-core (this file)                                               │
//! │  ├── Rejection        - Legitimate "no" answers to a redemption        │
//! │  └── ValidationError  - Malformed input or coupon definition           │
//! │                                                                         │
//! │  coupon-db                                                             │
//! │  └── DbError          - Store failures                                 │
//! │                                                                         │
//! │  coupon-engine                                                         │
//! │  ├── CacheError       - Logged and swallowed, never surfaced           │
//! │  └── EngineError      - What callers of the engine see                 │
//! │                                                                         │
//! │  coupon-api                                                            │
//! │  └── ApiError         - JSON body + HTTP status                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`Rejection`] is NOT a failure of the system. It is returned to the
//! caller verbatim as `{"valid": false, "reason": "..."}`.

use thiserror::Error;

// =============================================================================
// Rejection
// =============================================================================

/// Why a coupon was not redeemed.
///
/// The `Display` text of each variant is a stable reason string that clients
/// match on. Do not reword them.
///
/// The variant order mirrors the order in which the eligibility checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    #[error("coupon not found")]
    NotFound,

    #[error("coupon expired")]
    Expired,

    #[error("coupon not valid at this time")]
    OutOfWindow,

    #[error("usage limit reached")]
    UsageLimitReached,

    #[error("coupon not applicable to cart items")]
    NotApplicable,

    #[error("order total does not meet minimum requirement")]
    BelowMinimum,
}

impl Rejection {
    /// The stable reason string returned to clients.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Short machine-friendly name, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::NotFound => "not_found",
            Rejection::Expired => "expired",
            Rejection::OutOfWindow => "out_of_window",
            Rejection::UsageLimitReached => "usage_limit_reached",
            Rejection::NotApplicable => "not_applicable",
            Rejection::BelowMinimum => "below_minimum",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised for malformed requests and for coupon definitions that break a
/// creation rule (negative value, inverted window, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. bad characters, unparseable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Validity window ends before it starts.
    #[error("valid_time_window start must not be after end")]
    InvalidWindow,

    /// Too many entries in a list.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reason_strings_are_stable() {
        assert_eq!(Rejection::NotFound.to_string(), "coupon not found");
        assert_eq!(Rejection::Expired.to_string(), "coupon expired");
        assert_eq!(Rejection::OutOfWindow.to_string(), "coupon not valid at this time");
        assert_eq!(Rejection::UsageLimitReached.to_string(), "usage limit reached");
        assert_eq!(
            Rejection::NotApplicable.to_string(),
            "coupon not applicable to cart items"
        );
        assert_eq!(
            Rejection::BelowMinimum.to_string(),
            "order total does not meet minimum requirement"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("coupon_code").to_string(),
            "coupon_code is required"
        );
        let err = ValidationError::MustNotBeNegative {
            field: "discount_value".to_string(),
        };
        assert_eq!(err.to_string(), "discount_value must not be negative");
    }
}
