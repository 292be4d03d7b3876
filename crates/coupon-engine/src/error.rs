//! # Engine Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where each failure ends up                           │
//! │                                                                         │
//! │  ValidationError (request)     → EngineError::InvalidInput              │
//! │  ValidationError (definition)  → EngineError::InvalidDefinition         │
//! │  DbError::DuplicateCoupon      → EngineError::AlreadyExists             │
//! │  DbError (anything else)       → EngineError::Store                     │
//! │  deadline elapsed              → EngineError::Timeout                   │
//! │                                                                         │
//! │  Rejection                     → not an error: Redemption::Rejected     │
//! │  CacheError                    → logged, never surfaces                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use coupon_core::ValidationError;
use coupon_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A request field is missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(ValidationError),

    /// A coupon definition breaks a creation rule.
    #[error("Invalid coupon definition: {0}")]
    InvalidDefinition(ValidationError),

    /// A coupon with this code already exists.
    #[error("Coupon '{0}' already exists")]
    AlreadyExists(String),

    /// The store failed on the authoritative path.
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// The locked section did not finish in time; nothing was persisted.
    #[error("Validation timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
