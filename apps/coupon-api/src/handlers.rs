//! HTTP request handlers.
//!
//! Each handler unwraps its JSON body, calls the engine and maps the result.
//! Rejected validations are ordinary `200` responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use coupon_engine::{
    ApplicableCouponsRequest, CouponDefinition, CouponSummary, ValidateCouponRequest,
    ValidationOutcome,
};

use crate::error::ApiError;
use crate::AppState;

/// Creates a coupon.
///
/// # Response
///
/// - **201 Created** - `{"message": "coupon created successfully"}`
/// - **400 Bad Request** - malformed body or a broken creation rule
/// - **409 Conflict** - the code is already taken
pub async fn create_coupon(
    State(state): State<AppState>,
    payload: Result<Json<CouponDefinition>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(definition) = payload?;
    state.engine.create_coupon(definition).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "coupon created successfully" })),
    ))
}

/// Lists the unexpired coupons that would apply to the posted cart.
pub async fn applicable_coupons(
    State(state): State<AppState>,
    payload: Result<Json<ApplicableCouponsRequest>, JsonRejection>,
) -> Result<Json<Vec<CouponSummary>>, ApiError> {
    let Json(request) = payload?;
    let coupons = state.engine.applicable_coupons(&request).await?;
    Ok(Json(coupons))
}

/// Validates a coupon against a cart and, when eligible, redeems it.
///
/// # Response
///
/// - **200 OK** - `{"valid": true, "discount": {...}, "message": ...}` or
///   `{"valid": false, "reason": ...}`
/// - **400 Bad Request** - malformed body or missing fields
/// - **504 Gateway Timeout** - the locked section overran; nothing was recorded
pub async fn validate_coupon(
    State(state): State<AppState>,
    payload: Result<Json<ValidateCouponRequest>, JsonRejection>,
) -> Result<Json<ValidationOutcome>, ApiError> {
    let Json(request) = payload?;
    let outcome = state.engine.validate_coupon(&request).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub cache: bool,
}

/// Liveness plus dependency status. A dead cache only degrades the service.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.engine.database().health_check().await;
    let cache = state.engine.cache().ping().await;

    let (status, code) = if database {
        ("ok", StatusCode::OK)
    } else {
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            cache,
        }),
    )
}
