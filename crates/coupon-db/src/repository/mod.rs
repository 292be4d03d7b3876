//! # Repository Module
//!
//! Database repository implementations for the coupon ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Redemption engine                                                     │
//! │       │                                                                 │
//! │       │  db.coupons().get_valid(now)            (pool, no tx)          │
//! │       │  CouponRepository::lock_for_update(&mut tx, code)              │
//! │       │  UsageRepository::count_in(&mut tx, user, code)                │
//! │       │  UsageRepository::record_in(&mut tx, user, code, at)           │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │  ├── coupons        (one row per code, immutable)                     │
//! │  └── coupon_usages  (append-only ledger)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CouponRepository`](coupon::CouponRepository) - Coupon definitions
//! - [`UsageRepository`](usage::UsageRepository) - Redemption ledger

pub mod coupon;
pub mod usage;
