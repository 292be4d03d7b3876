//! # Usage Repository
//!
//! The append-only `coupon_usages` ledger. One row per successful redemption;
//! rows are never updated and only disappear when their coupon is deleted
//! (`ON DELETE CASCADE`).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::coupon::{from_millis, to_millis};
use coupon_core::UsageRecord;

#[derive(Debug, sqlx::FromRow)]
struct UsageRow {
    id: i64,
    user_id: String,
    coupon_code: String,
    used_at_ms: i64,
}

/// Repository for coupon usage records.
#[derive(Debug, Clone)]
pub struct UsageRepository {
    pool: SqlitePool,
}

impl UsageRepository {
    /// Creates a new UsageRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UsageRepository { pool }
    }

    /// How many times `user_id` has redeemed `coupon_code`.
    pub async fn count_for_user(&self, user_id: &str, coupon_code: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::count_in(&mut conn, user_id, coupon_code).await
    }

    /// Total redemptions of `coupon_code` across all users.
    pub async fn count_for_coupon(&self, coupon_code: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM coupon_usages WHERE coupon_code = ?1")
                .bind(coupon_code)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Usage records for a coupon, oldest first.
    pub async fn list_for_coupon(&self, coupon_code: &str) -> DbResult<Vec<UsageRecord>> {
        let rows = sqlx::query_as::<_, UsageRow>(
            r#"
            SELECT id, user_id, coupon_code, used_at_ms
            FROM coupon_usages
            WHERE coupon_code = ?1
            ORDER BY id
            "#,
        )
        .bind(coupon_code)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UsageRecord {
                    used_at: from_millis(row.used_at_ms, "used_at_ms")?,
                    id: row.id,
                    user_id: row.user_id,
                    coupon_code: row.coupon_code,
                })
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Connection-scoped operations (used inside transactions)
    // -------------------------------------------------------------------------

    /// Counts prior redemptions on the given connection.
    pub async fn count_in(
        conn: &mut SqliteConnection,
        user_id: &str,
        coupon_code: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM coupon_usages WHERE coupon_code = ?1 AND user_id = ?2",
        )
        .bind(coupon_code)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count)
    }

    /// Appends a usage row and returns its id.
    pub async fn record_in(
        conn: &mut SqliteConnection,
        user_id: &str,
        coupon_code: &str,
        used_at: DateTime<Utc>,
    ) -> DbResult<i64> {
        let result = sqlx::query(
            "INSERT INTO coupon_usages (user_id, coupon_code, used_at_ms) VALUES (?1, ?2, ?3)",
        )
        .bind(user_id)
        .bind(coupon_code)
        .bind(to_millis(used_at))
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, user_id = %user_id, coupon_code = %coupon_code, "Recorded coupon usage");
        Ok(id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
