//! # coupon-engine: Cache Layer + Redemption Engine
//!
//! Turns the pure rules of `coupon-core` and the ledger of `coupon-db` into
//! the three service operations: create, list applicable, validate-and-redeem.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Coupon Service Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    coupon-api (axum)                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ request / response types              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ coupon-engine (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐ │   │
//! │  │   │ request.rs   │  │  engine.rs   │  │  cache/              │ │   │
//! │  │   │ response.rs  │  │  create      │  │  CouponCache         │ │   │
//! │  │   │ wire schema  │  │  list        │  │  Redis / in-memory   │ │   │
//! │  │   └──────────────┘  │  redeem      │  └──────────────────────┘ │   │
//! │  │                     └──────────────┘                           │   │
//! │  └───────────────┬─────────────────────────────────┬───────────────┘   │
//! │                  │                                 │                    │
//! │  ┌───────────────▼──────────────┐   ┌──────────────▼──────────────┐    │
//! │  │  coupon-core (rules)         │   │  coupon-db (SQLite ledger)  │    │
//! │  └──────────────────────────────┘   └─────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coupon_engine::{EngineConfig, InMemoryCache, RedemptionEngine};
//!
//! let engine = RedemptionEngine::new(db, Arc::new(InMemoryCache::new()), EngineConfig::default());
//! let outcome = engine.redeem("user-1", "SAVE20", &cart, Utc::now()).await?;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod request;
pub mod response;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheBackend, CacheError, CouponCache, InMemoryCache, RedisCache};
pub use config::EngineConfig;
pub use engine::RedemptionEngine;
pub use error::{EngineError, EngineResult};
pub use request::{ApplicableCouponsRequest, CartItemDto, CouponDefinition, ValidateCouponRequest};
pub use response::{CouponSummary, Redemption, ValidationOutcome};
