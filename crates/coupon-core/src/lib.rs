//! # coupon-core: Pure Coupon Rules
//!
//! This crate contains the coupon domain as pure functions with zero I/O
//! dependencies. Everything that decides *whether* a coupon applies and *how
//! much* it is worth lives here; everything that touches storage or the cache
//! lives in `coupon-db` / `coupon-engine`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Coupon Service Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    coupon-api (axum)                            │   │
//! │  │    POST /api/coupons   /applicable   /validate                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    coupon-engine                                │   │
//! │  │    cache-aside reads, locked redemption transaction             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ coupon-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌─────────────┐ ┌───────────┐ │   │
//! │  │   │   types   │  │   money   │  │ eligibility │ │ discount  │ │   │
//! │  │   │  Coupon   │  │   Money   │  │  6 ordered  │ │ flat / %  │ │   │
//! │  │   │   Cart    │  │Percentage │  │   checks    │ │  + cap    │ │   │
//! │  │   └───────────┘  └───────────┘  └─────────────┘ └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    coupon-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Coupon, Cart, DiscountTarget, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`eligibility`] - The ordered eligibility checks
//! - [`discount`] - Discount calculation
//! - [`validation`] - Coupon definition and request validation
//! - [`error`] - Rejections and validation errors
//!
//! ## Example Usage
//!
//! ```rust
//! use coupon_core::money::Money;
//! use coupon_core::types::Percentage;
//!
//! let order_total = Money::from_cents(12050); // 120.50
//! let discount = order_total.percentage_of(Percentage::from_bps(2000)); // 20%
//! assert_eq!(discount.cents(), 2410);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod eligibility;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use discount::DiscountBreakdown;
pub use error::{Rejection, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum items accepted in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum length of a coupon code.
pub const MAX_COUPON_CODE_LEN: usize = 50;

/// Upper bound for a percentage discount, in basis points (100%).
pub const MAX_PERCENTAGE_BPS: i64 = 10_000;
