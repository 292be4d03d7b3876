//! # Coupon Repository
//!
//! Database operations for coupon definitions.
//!
//! ## Pool vs. Transaction Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  &self methods (pool)                associated fns (&mut connection)   │
//! │  ─────────────────────               ──────────────────────────────     │
//! │  get_by_code   cache fill, pre-check find_in          plain read        │
//! │  get_valid     listing               lock_for_update  redemption read   │
//! │  insert        seeding               insert_in        create            │
//! │  count         diagnostics                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Locking
//! SQLite has no `SELECT ... FOR UPDATE`. [`CouponRepository::lock_for_update`]
//! opens the transaction with a no-op `UPDATE` on the coupon row, which takes
//! the database write lock before anything is read. A second redemption
//! blocks on that statement (up to the busy timeout) and, once it gets the
//! lock, reads a snapshot that includes the first redemption's usage row.

use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use coupon_core::{
    Coupon, DiscountTarget, DiscountType, Money, UsageType, ValidityWindow,
};

const COUPON_COLUMNS: &str = r#"
    coupon_code,
    discount_type,
    discount_value,
    discount_target,
    min_order_value_cents,
    max_usage_per_user,
    expiry_date_ms,
    valid_from_ms,
    valid_until_ms,
    applicable_item_ids,
    applicable_categories,
    usage_type,
    terms_and_conditions,
    max_discount_cents
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    coupon_code: String,
    discount_type: DiscountType,
    discount_value: i64,
    discount_target: DiscountTarget,
    min_order_value_cents: i64,
    max_usage_per_user: i64,
    expiry_date_ms: i64,
    valid_from_ms: i64,
    valid_until_ms: i64,
    applicable_item_ids: String,
    applicable_categories: String,
    usage_type: UsageType,
    terms_and_conditions: String,
    max_discount_cents: i64,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> DbResult<Self> {
        let applicable_item_ids: BTreeSet<String> = serde_json::from_str(&row.applicable_item_ids)?;
        let applicable_categories: BTreeSet<String> =
            serde_json::from_str(&row.applicable_categories)?;

        Ok(Coupon {
            discount_type: row.discount_type,
            discount_value: row.discount_value,
            discount_target: row.discount_target,
            min_order_value: Money::from_cents(row.min_order_value_cents),
            max_usage_per_user: row.max_usage_per_user,
            expiry_date: from_millis(row.expiry_date_ms, "expiry_date_ms")?,
            valid_window: ValidityWindow::new(
                from_millis(row.valid_from_ms, "valid_from_ms")?,
                from_millis(row.valid_until_ms, "valid_until_ms")?,
            ),
            applicable_item_ids,
            applicable_categories,
            usage_type: row.usage_type,
            terms_and_conditions: row.terms_and_conditions,
            max_discount_amount: Money::from_cents(row.max_discount_cents),
            code: row.coupon_code,
        })
    }
}

/// Timestamps are stored as Unix epoch milliseconds; anything finer is
/// dropped on write. Callers that hand back the coupon they stored should
/// pass it through [`truncate_to_millis`] first.
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64, column: &str) -> DbResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| DbError::invalid_row("coupons", format!("{column} out of range: {ms}")))
}

/// Rounds `at` down to the precision the ledger keeps.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(3)
}

fn into_coupons(rows: Vec<CouponRow>) -> DbResult<Vec<Coupon>> {
    rows.into_iter().map(Coupon::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Gets a coupon by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut conn, code).await
    }

    /// All coupons whose expiry is at or after `as_of`, ordered by code.
    ///
    /// Only the expiry is filtered here; validity windows and cart rules are
    /// applied by the caller.
    pub async fn get_valid(&self, as_of: DateTime<Utc>) -> DbResult<Vec<Coupon>> {
        let sql = format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE expiry_date_ms >= ?1 ORDER BY coupon_code"
        );
        let rows = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(to_millis(as_of))
            .fetch_all(&self.pool)
            .await?;

        debug!(as_of = %as_of, count = rows.len(), "Loaded valid coupons");
        into_coupons(rows)
    }

    /// Inserts a coupon outside of any caller transaction.
    pub async fn insert(&self, coupon: &Coupon, created_at: DateTime<Utc>) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, coupon, created_at).await
    }

    /// Number of stored coupons.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Connection-scoped operations (used inside transactions)
    // -------------------------------------------------------------------------

    /// Reads a coupon on the given connection without locking.
    pub async fn find_in(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE coupon_code = ?1");
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Takes the write lock, then reads the coupon.
    ///
    /// Must be the first statement of the transaction so the snapshot it
    /// reads from is taken after the lock is granted.
    ///
    /// ## Returns
    /// * `Ok(Some(coupon))` - row exists, lock held until commit/rollback
    /// * `Ok(None)` - no such coupon (the lock is still held)
    pub async fn lock_for_update(
        conn: &mut SqliteConnection,
        code: &str,
    ) -> DbResult<Option<Coupon>> {
        // No-op write on a non-key column: acquires the lock, changes nothing.
        let touched = sqlx::query(
            "UPDATE coupons SET max_usage_per_user = max_usage_per_user WHERE coupon_code = ?1",
        )
        .bind(code)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        debug!(code = %code, touched, "Acquired coupon write lock");

        if touched == 0 {
            return Ok(None);
        }
        Self::find_in(conn, code).await
    }

    /// Inserts a coupon on the given connection.
    ///
    /// A duplicate code surfaces as [`DbError::DuplicateCoupon`].
    pub async fn insert_in(
        conn: &mut SqliteConnection,
        coupon: &Coupon,
        created_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(code = %coupon.code, "Inserting coupon");

        let item_ids = serde_json::to_string(&coupon.applicable_item_ids)?;
        let categories = serde_json::to_string(&coupon.applicable_categories)?;

        sqlx::query(
            r#"
            INSERT INTO coupons (
                coupon_code, discount_type, discount_value, discount_target,
                min_order_value_cents, max_usage_per_user,
                expiry_date_ms, valid_from_ms, valid_until_ms,
                applicable_item_ids, applicable_categories,
                usage_type, terms_and_conditions, max_discount_cents,
                created_at_ms
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11,
                ?12, ?13, ?14,
                ?15
            )
            "#,
        )
        .bind(&coupon.code)
        .bind(coupon.discount_type)
        .bind(coupon.discount_value)
        .bind(coupon.discount_target)
        .bind(coupon.min_order_value.cents())
        .bind(coupon.max_usage_per_user)
        .bind(to_millis(coupon.expiry_date))
        .bind(to_millis(coupon.valid_window.start))
        .bind(to_millis(coupon.valid_window.end))
        .bind(item_ids)
        .bind(categories)
        .bind(coupon.usage_type)
        .bind(&coupon.terms_and_conditions)
        .bind(coupon.max_discount_amount.cents())
        .bind(to_millis(created_at))
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation(_) => DbError::DuplicateCoupon(coupon.code.clone()),
            other => other,
        })?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
