//! Route definitions for the coupon API.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{applicable_coupons, create_coupon, health, validate_coupon};
use crate::AppState;

/// Creates the router with every route and the request trace layer.
pub fn build_router(state: AppState) -> Router {
    let coupon_routes = Router::new()
        .route("/coupons", post(create_coupon))
        .route("/coupons/applicable", post(applicable_coupons))
        .route("/coupons/validate", post(validate_coupon));

    Router::new()
        .route("/health", get(health))
        .nest("/api", coupon_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Unit Tests
// =============================================================================
