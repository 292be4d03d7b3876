//! # Ledger Errors
//!
//! Every failure the coupon store can report.
//!
//! ```text
//! sqlx::Error ──From──► DbError ──► EngineError::Store
//!                          │
//!                          └── DuplicateCoupon ──► EngineError::AlreadyExists
//! ```
//!
//! Constraint failures are classified through
//! [`sqlx::error::ErrorKind`], so nothing here parses SQLite message text.

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// `coupons.coupon_code` already holds this code.
    #[error("Coupon '{0}' already exists")]
    DuplicateCoupon(String),

    /// Some other UNIQUE or PRIMARY KEY constraint failed.
    #[error("Unique constraint failed: {0}")]
    UniqueViolation(String),

    /// A usage row referenced a coupon that does not exist.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Invalid {table} row: {reason}")]
    InvalidRow { table: String, reason: String },

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl DbError {
    pub fn invalid_row(table: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::InvalidRow {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// `true` when an insert lost to an existing key.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            DbError::DuplicateCoupon(_) | DbError::UniqueViolation(_)
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation(message),
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Applicability sets are stored as JSON text.
impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::invalid_row("coupons", err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
