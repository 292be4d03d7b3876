//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Coupon API                         │
//! │                                                                         │
//! │  Handler                                                                │
//! │  Result<Json<T>, ApiError>                                              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Malformed JSON? ── JsonRejection ───────────────┐                      │
//! │         │                                        │                      │
//! │         ▼                                        ▼                      │
//! │  Engine error? ──── EngineError ───────────► ApiError ──► status + JSON │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Success (including {"valid": false, ...}) ──────────────► 200 / 201    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A coupon rejection is not an error: it is a normal `200` validation
//! outcome. Only input, conflict and infrastructure failures end up here.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use coupon_db::DbError;
use coupon_engine::EngineError;

/// Error body returned by every failing endpoint.
///
/// ```json
/// {
///   "code": "ALREADY_EXISTS",
///   "message": "Coupon 'SAVE20' already exists"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body or field failed validation (400)
    ValidationError,

    /// Coupon definition breaks a creation rule (400)
    InvalidDefinition,

    /// Coupon code already taken (409)
    AlreadyExists,

    /// Database operation failed (500)
    DatabaseError,

    /// Database unreachable (503)
    Unavailable,

    /// Validation deadline elapsed (504)
    Timeout,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError | ErrorCode::InvalidDefinition => StatusCode::BAD_REQUEST,
            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::Unavailable, "Database connection failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::Unavailable, "Database pool exhausted")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts engine errors to API errors.
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput(e) => ApiError::validation(e.to_string()),
            EngineError::InvalidDefinition(e) => {
                ApiError::new(ErrorCode::InvalidDefinition, e.to_string())
            }
            EngineError::AlreadyExists(code) => ApiError::new(
                ErrorCode::AlreadyExists,
                format!("Coupon '{}' already exists", code),
            ),
            EngineError::Store(e) => e.into(),
            EngineError::Timeout(after) => ApiError::new(
                ErrorCode::Timeout,
                format!("Validation did not complete within {}ms", after.as_millis()),
            ),
        }
    }
}

/// Malformed or mistyped JSON bodies.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
