//! # Coupon API
//!
//! HTTP transport for the coupon redemption engine.
//!
//! ## Routes
//! ```text
//! POST /api/coupons              create a coupon           201 | 400 | 409
//! POST /api/coupons/applicable   list applicable coupons   200 | 400
//! POST /api/coupons/validate     validate + redeem         200 | 400 | 504
//! GET  /health                   store / cache status      200 | 503
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use coupon_engine::RedemptionEngine;

pub use routes::build_router;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RedemptionEngine>,
}

impl AppState {
    pub fn new(engine: RedemptionEngine) -> Self {
        AppState {
            engine: Arc::new(engine),
        }
    }
}
