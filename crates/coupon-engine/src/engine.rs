//! # Redemption Engine
//!
//! Orchestrates the pure rules in `coupon-core`, the ledger in `coupon-db`
//! and the cache.
//!
//! ## Redemption Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         redeem(user, code, cart, as_of)                 │
//! │                                                                         │
//! │  1. validate input ───────────────────────────► EngineError::InvalidInput│
//! │  2. cache → store lookup, checks 1-3 ─────────► Rejected (quick reject) │
//! │                                                                         │
//! │  ┌──── tokio::time::timeout(validation_timeout) ─────────────────────┐ │
//! │  │ 3. BEGIN                                                          │ │
//! │  │ 4. lock_for_update(code)   authoritative re-read under the lock   │ │
//! │  │ 5. count_in(user, code)                                           │ │
//! │  │ 6. evaluate() ──────────── reject ──► ROLLBACK ──► Rejected       │ │
//! │  │ 7. calculate() + record_in()                                      │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │        │ elapsed: transaction dropped (rolled back) ──► Timeout        │
//! │        ▼                                                                │
//! │  8. COMMIT                                                             │
//! │  9. invalidate coupons:valid (and coupon:{code} once exhausted)        │
//! │ 10. Applied { discount, usage_id }                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache is only ever used to reject early on immutable fields (missing,
//! expired, outside the window). Every decision that commits is made from the
//! locked re-read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use coupon_core::discount::calculate;
use coupon_core::eligibility::{evaluate, is_listable, precheck};
use coupon_core::validation::{validate_cart, validate_coupon, validate_user_id};
use coupon_core::{Cart, Coupon, DiscountBreakdown, Rejection, ValidationError};
use coupon_db::{CouponRepository, Database, DbError, UsageRepository};

use crate::cache::{CacheBackend, CouponCache, ValidSnapshot};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::request::{ApplicableCouponsRequest, CouponDefinition, ValidateCouponRequest};
use crate::response::{CouponSummary, Redemption, ValidationOutcome};

/// What the locked section decided, before commit or rollback.
enum Decision {
    Apply {
        discount: DiscountBreakdown,
        usage_id: i64,
        exhausted: bool,
    },
    Reject(Rejection),
}

/// Creates, lists and redeems coupons.
///
/// Holds its store and cache handles explicitly; build one at startup and
/// share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RedemptionEngine {
    db: Database,
    cache: CouponCache,
    config: EngineConfig,
}

impl RedemptionEngine {
    pub fn new(db: Database, backend: Arc<dyn CacheBackend>, config: EngineConfig) -> Self {
        let cache = CouponCache::new(backend, config.coupon_ttl_cap, config.collection_ttl);
        RedemptionEngine { db, cache, config }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn cache(&self) -> &CouponCache {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Persists a new coupon.
    ///
    /// ## Errors
    /// - `InvalidDefinition` - a creation rule is broken; nothing is written
    /// - `AlreadyExists` - the code is taken (decided by the primary key)
    /// - `Store` - the ledger failed
    pub async fn create(&self, coupon: &Coupon) -> EngineResult<()> {
        validate_coupon(coupon).map_err(EngineError::InvalidDefinition)?;

        // Advisory only: a racing create is caught by the primary key below.
        if self.db.coupons().get_by_code(&coupon.code).await?.is_some() {
            debug!(code = %coupon.code, "Coupon code already taken");
            return Err(EngineError::AlreadyExists(coupon.code.clone()));
        }

        self.insert_new(coupon).await?;

        self.cache.invalidate_valid().await;
        info!(
            code = %coupon.code,
            discount_type = ?coupon.discount_type,
            target = coupon.discount_target.as_str(),
            "Coupon created"
        );
        Ok(())
    }

    /// Inserts and commits. The primary key is the final word on duplicates.
    async fn insert_new(&self, coupon: &Coupon) -> EngineResult<()> {
        let mut tx = self.db.begin().await?;
        match CouponRepository::insert_in(&mut *tx, coupon, Utc::now()).await {
            Ok(()) => {}
            Err(e) if e.is_duplicate() => {
                debug!(code = %coupon.code, "Lost a create race on the primary key");
                return Err(EngineError::AlreadyExists(coupon.code.clone()));
            }
            Err(e) => {
                error!(code = %coupon.code, error = %e, "Failed to insert coupon");
                return Err(e.into());
            }
        }
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// [`create`](Self::create) from a wire definition. Returns the stored coupon.
    pub async fn create_coupon(&self, definition: CouponDefinition) -> EngineResult<Coupon> {
        let coupon = definition
            .into_coupon()
            .map_err(EngineError::InvalidDefinition)?;
        self.create(&coupon).await?;
        Ok(coupon)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Coupons that are unexpired at `as_of` and would apply to `cart`,
    /// ordered by code.
    ///
    /// Advisory: usage limits and the validity window are not checked, and
    /// nothing is locked or written to the ledger.
    pub async fn list_applicable(
        &self,
        cart: &Cart,
        as_of: DateTime<Utc>,
    ) -> EngineResult<Vec<Coupon>> {
        self.list_applicable_at(cart, as_of, Utc::now()).await
    }

    /// [`list_applicable`](Self::list_applicable) from a wire request. A
    /// missing timestamp means the instant the request was read.
    pub async fn applicable_coupons(
        &self,
        request: &ApplicableCouponsRequest,
    ) -> EngineResult<Vec<CouponSummary>> {
        let cart = request.cart().map_err(EngineError::InvalidInput)?;
        let now = Utc::now();
        let coupons = self
            .list_applicable_at(&cart, request.as_of(now), now)
            .await?;
        Ok(coupons.iter().map(CouponSummary::from).collect())
    }

    async fn list_applicable_at(
        &self,
        cart: &Cart,
        as_of: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Coupon>> {
        validate_cart(cart).map_err(EngineError::InvalidInput)?;

        let applicable: Vec<Coupon> = self
            .unexpired_at(as_of, now)
            .await?
            .into_iter()
            .filter(|coupon| is_listable(coupon, cart))
            .collect();

        debug!(count = applicable.len(), %as_of, "Listed applicable coupons");
        Ok(applicable)
    }

    /// Every coupon unexpired at `as_of`, ordered by code.
    ///
    /// A snapshot taken at or before `as_of` answers directly. Instants older
    /// than `now` go to the store uncached; anything else refreshes the
    /// snapshot at `now`.
    async fn unexpired_at(
        &self,
        as_of: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Coupon>> {
        if let Some(snapshot) = self.cache.get_valid_snapshot().await {
            if snapshot.as_of <= as_of {
                return Ok(unexpired(snapshot.coupons, as_of));
            }
        }

        if as_of < now {
            return Ok(self.db.coupons().get_valid(as_of).await?);
        }

        // Read before the store so an invalidation during the load is seen.
        let generation = self.cache.valid_generation().await;
        let snapshot = ValidSnapshot {
            as_of: now,
            coupons: self.db.coupons().get_valid(now).await?,
        };
        if let Some(generation) = generation {
            self.cache.put_valid_snapshot(&snapshot, now, generation).await;
        }
        Ok(unexpired(snapshot.coupons, as_of))
    }

    // =========================================================================
    // Redeem
    // =========================================================================

    /// Checks eligibility and, if eligible, durably records one use.
    ///
    /// ## Returns
    /// * `Ok(Redemption::Applied { .. })` - usage row committed
    /// * `Ok(Redemption::Rejected(_))` - not eligible, nothing persisted
    /// * `Err(EngineError::Timeout(_))` - the locked section overran; rolled back
    pub async fn redeem(
        &self,
        user_id: &str,
        code: &str,
        cart: &Cart,
        as_of: DateTime<Utc>,
    ) -> EngineResult<Redemption> {
        let attempt = Uuid::new_v4();
        let span = info_span!("redeem", %attempt, user_id = %user_id, code = %code.trim());
        self.redeem_inner(user_id, code.trim(), cart, as_of)
            .instrument(span)
            .await
    }

    /// [`redeem`](Self::redeem) from a wire request.
    pub async fn validate_coupon(
        &self,
        request: &ValidateCouponRequest,
    ) -> EngineResult<ValidationOutcome> {
        let cart = request.cart().map_err(EngineError::InvalidInput)?;
        let as_of = request.as_of(Utc::now());
        let redemption = self
            .redeem(&request.user_id, &request.coupon_code, &cart, as_of)
            .await?;
        Ok(redemption.into())
    }

    async fn redeem_inner(
        &self,
        user_id: &str,
        code: &str,
        cart: &Cart,
        as_of: DateTime<Utc>,
    ) -> EngineResult<Redemption> {
        validate_user_id(user_id).map_err(EngineError::InvalidInput)?;
        if code.is_empty() {
            return Err(EngineError::InvalidInput(ValidationError::required(
                "coupon_code",
            )));
        }
        validate_cart(cart).map_err(EngineError::InvalidInput)?;

        let known = self.lookup(code).await?;
        if let Err(rejection) = precheck(known.as_ref(), as_of) {
            info!(reason = rejection.kind(), "Coupon rejected before locking");
            return Ok(Redemption::Rejected(rejection));
        }

        let deadline = self.config.validation_timeout;
        let locked = tokio::time::timeout(deadline, self.decide(user_id, code, cart, as_of)).await;
        let (tx, decision) = match locked {
            Ok(result) => result?,
            Err(_) => {
                warn!(?deadline, "Redemption timed out; rolled back");
                return Err(EngineError::Timeout(deadline));
            }
        };

        match decision {
            Decision::Reject(rejection) => {
                tx.rollback().await.map_err(DbError::from)?;
                info!(reason = rejection.kind(), "Coupon rejected");
                Ok(Redemption::Rejected(rejection))
            }
            Decision::Apply {
                discount,
                usage_id,
                exhausted,
            } => {
                if let Err(e) = tx.commit().await {
                    error!(error = %e, "Failed to commit redemption");
                    return Err(DbError::from(e).into());
                }

                self.cache.invalidate_valid().await;
                if exhausted {
                    self.cache.invalidate_coupon(code).await;
                }

                info!(usage_id, ?discount, "Coupon redeemed");
                Ok(Redemption::Applied { discount, usage_id })
            }
        }
    }

    /// The locked read-evaluate-record section. The transaction is handed back
    /// uncommitted; dropping it rolls everything back.
    async fn decide(
        &self,
        user_id: &str,
        code: &str,
        cart: &Cart,
        as_of: DateTime<Utc>,
    ) -> EngineResult<(Transaction<'static, Sqlite>, Decision)> {
        let mut tx = self.db.begin().await?;

        let Some(coupon) = CouponRepository::lock_for_update(&mut *tx, code).await? else {
            return Ok((tx, Decision::Reject(Rejection::NotFound)));
        };

        let prior = UsageRepository::count_in(&mut *tx, user_id, code).await?;
        debug!(prior, limit = coupon.max_usage_per_user, "Read usage under lock");

        if let Err(rejection) = evaluate(Some(&coupon), cart, as_of, prior) {
            return Ok((tx, Decision::Reject(rejection)));
        }

        let discount = calculate(&coupon, cart.order_total);
        let usage_id = UsageRepository::record_in(&mut *tx, user_id, code, Utc::now()).await?;

        Ok((
            tx,
            Decision::Apply {
                discount,
                usage_id,
                exhausted: prior + 1 >= coupon.max_usage_per_user,
            },
        ))
    }

    /// Cache first, then the store. Store hits are written back to the cache.
    async fn lookup(&self, code: &str) -> EngineResult<Option<Coupon>> {
        if let Some(coupon) = self.cache.get_coupon(code).await {
            return Ok(Some(coupon));
        }

        let coupon = self.db.coupons().get_by_code(code).await?;
        if let Some(coupon) = &coupon {
            self.cache.put_coupon(coupon, Utc::now()).await;
        }
        Ok(coupon)
    }
}

fn unexpired(coupons: Vec<Coupon>, as_of: DateTime<Utc>) -> Vec<Coupon> {
    coupons
        .into_iter()
        .filter(|coupon| !coupon.is_expired_at(as_of))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::layer::VALID_COUPONS_KEY;
    use crate::cache::{CacheResult, FailingCache, InMemoryCache};
    use crate::request::CartItemDto;
    use crate::testing::{
        coupon_expiring, engine_over, memory_db, memory_engine, pain_relief_cart, save20, ts,
    };
    use chrono::Duration as ChronoDuration;
    use coupon_core::{CartItem, DiscountTarget, Money};
    use coupon_db::DbConfig;
    use std::time::Duration;

    fn applied_cents(redemption: &Redemption) -> i64 {
        match redemption {
            Redemption::Applied { discount, .. } => discount
                .get(&DiscountTarget::TotalOrderValue)
                .map(Money::cents)
                .unwrap_or_default(),
            Redemption::Rejected(r) => panic!("expected Applied, got {r:?}"),
        }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let engine = memory_engine().await;
        engine.create(&save20()).await.unwrap();

        let err = engine.create(&save20()).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists(ref code) if code == "SAVE20"));
        assert_eq!(engine.database().coupons().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_definition_persists_nothing() {
        let engine = memory_engine().await;

        let mut negative = save20();
        negative.discount_value = -100;
        let err = engine.create(&negative).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidDefinition(_)));

        let mut inverted = save20();
        inverted.valid_window.start = ts(2026, 1, 1);
        let err = engine.create(&inverted).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidDefinition(ValidationError::InvalidWindow)
        ));

        assert_eq!(engine.database().coupons().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_race_maps_to_already_exists() {
        let engine = memory_engine().await;
        // another request committed the same code after our pre-check
        engine
            .database()
            .coupons()
            .insert(&save20(), Utc::now())
            .await
            .unwrap();

        let err = engine.insert_new(&save20()).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists(ref code) if code == "SAVE20"));
        assert_eq!(engine.database().coupons().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_created_coupon_matches_stored_row() {
        let engine = memory_engine().await;
        let definition: CouponDefinition = serde_json::from_value(serde_json::json!({
            "coupon_code": "PRECISE",
            "expiry_date": "2025-12-31T23:59:59.123456789Z",
            "usage_type": "single_use",
            "valid_time_window": {
                "start": "2025-01-01T00:00:00.000000001Z",
                "end": "2025-12-31T23:59:59.999999999Z"
            },
            "discount_type": "flat",
            "discount_value": 10,
            "max_usage_per_user": 1,
            "discount_target": "total_order_value"
        }))
        .unwrap();

        let created = engine.create_coupon(definition).await.unwrap();
        let stored = engine
            .database()
            .coupons()
            .get_by_code("PRECISE")
            .await
            .unwrap();
        assert_eq!(stored, Some(created));
    }

    // -------------------------------------------------------------------------
    // Redeem
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_save20_end_to_end() {
        let engine = memory_engine().await;
        engine.create(&save20()).await.unwrap();

        let redemption = engine
            .redeem("new-user", "SAVE20", &pain_relief_cart(), ts(2025, 6, 1))
            .await
            .unwrap();
        assert_eq!(applied_cents(&redemption), 2410);

        let outcome = ValidationOutcome::from(redemption);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({
                "valid": true,
                "discount": {"total_order_value": 24.1},
                "message": "coupon applied successfully"
            })
        );
        assert_eq!(
            engine
                .database()
                .usages()
                .count_for_user("new-user", "SAVE20")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_second_redemption_hits_limit() {
        let engine = memory_engine().await;
        engine.create(&save20()).await.unwrap();
        let cart = pain_relief_cart();

        let first = engine.redeem("u1", "SAVE20", &cart, ts(2025, 6, 1)).await.unwrap();
        assert!(first.is_applied());

        let second = engine.redeem("u1", "SAVE20", &cart, ts(2025, 6, 1)).await.unwrap();
        assert_eq!(second, Redemption::Rejected(Rejection::UsageLimitReached));

        // limits are per user
        let other = engine.redeem("u2", "SAVE20", &cart, ts(2025, 6, 1)).await.unwrap();
        assert!(other.is_applied());
        assert_eq!(
            engine.database().usages().count_for_coupon("SAVE20").await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_expired_coupon_leaves_usage_unchanged() {
        let engine = memory_engine().await;
        engine.create(&save20()).await.unwrap();

        let redemption = engine
            .redeem("u1", "SAVE20", &pain_relief_cart(), ts(2026, 1, 2))
            .await
            .unwrap();
        assert_eq!(redemption, Redemption::Rejected(Rejection::Expired));
        assert_eq!(
            ValidationOutcome::from(redemption).reason.as_deref(),
            Some("coupon expired")
        );
        assert_eq!(
            engine.database().usages().count_for_coupon("SAVE20").await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_rejections_in_check_order() {
        let engine = memory_engine().await;
        engine.create(&save20()).await.unwrap();
        let at = ts(2025, 6, 1);

        let missing = engine.redeem("u1", "NOPE", &pain_relief_cart(), at).await.unwrap();
        assert_eq!(missing, Redemption::Rejected(Rejection::NotFound));

        let elsewhere = Cart::new(
            vec![CartItem::new("med777", "vitamins", Money::from_cents(20000))],
            Money::from_cents(20000),
        );
        let not_applicable = engine.redeem("u1", "SAVE20", &elsewhere, at).await.unwrap();
        assert_eq!(not_applicable, Redemption::Rejected(Rejection::NotApplicable));

        let mut small = pain_relief_cart();
        small.order_total = Money::from_cents(10049);
        let below = engine.redeem("u1", "SAVE20", &small, at).await.unwrap();
        assert_eq!(below, Redemption::Rejected(Rejection::BelowMinimum));

        assert_eq!(
            engine.database().usages().count_for_coupon("SAVE20").await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_invalid_input_is_an_error() {
        let engine = memory_engine().await;
        engine.create(&save20()).await.unwrap();
        let at = ts(2025, 6, 1);

        let err = engine.redeem("  ", "SAVE20", &pain_relief_cart(), at).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let err = engine.redeem("u1", "", &pain_relief_cart(), at).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let mut free = pain_relief_cart();
        free.order_total = Money::zero();
        let err = engine.redeem("u1", "SAVE20", &free, at).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_quick_reject_from_cache_matches_store() {
        let backend = InMemoryCache::new();
        let engine = engine_over(memory_db().await, Arc::new(backend.clone()));
        let now = Utc::now();
        let live = coupon_expiring("LIVE", now + ChronoDuration::days(30));
        engine.create(&live).await.unwrap();

        // first call fills coupon:LIVE
        let before = engine
            .redeem("u1", "LIVE", &pain_relief_cart(), now - ChronoDuration::days(400))
            .await
            .unwrap();
        assert_eq!(before, Redemption::Rejected(Rejection::OutOfWindow));
        assert!(engine.cache().get_coupon("LIVE").await.is_some());

        let again = engine
            .redeem("u1", "LIVE", &pain_relief_cart(), now - ChronoDuration::days(400))
            .await
            .unwrap();
        assert_eq!(again, before);
    }

    #[tokio::test]
    async fn test_exhausted_coupon_is_evicted() {
        let engine = memory_engine().await;
        let now = Utc::now();
        engine
            .create(&coupon_expiring("ONCE", now + ChronoDuration::days(30)))
            .await
            .unwrap();
        engine.lookup("ONCE").await.unwrap();
        assert!(engine.cache().get_coupon("ONCE").await.is_some());

        let redemption = engine.redeem("u1", "ONCE", &pain_relief_cart(), now).await.unwrap();
        assert_eq!(applied_cents(&redemption), 5000);
        assert!(engine.cache().get_coupon("ONCE").await.is_none());
    }

    // -------------------------------------------------------------------------
    // Listing
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_listing_historical_instant() {
        let engine = memory_engine().await;
        engine.create(&save20()).await.unwrap();

        let listed = engine
            .list_applicable(&pain_relief_cart(), ts(2025, 6, 1))
            .await
            .unwrap();
        assert_eq!(listed, vec![save20()]);

        let after_expiry = engine
            .list_applicable(&pain_relief_cart(), ts(2026, 1, 2))
            .await
            .unwrap();
        assert!(after_expiry.is_empty());
    }

    fn untimed_request() -> ApplicableCouponsRequest {
        ApplicableCouponsRequest {
            cart_items: vec![
                CartItemDto {
                    medicine_id: "med001".to_string(),
                    category: "pain_relief".to_string(),
                    price: 100.78,
                },
                CartItemDto {
                    medicine_id: "med009".to_string(),
                    category: "vitamins".to_string(),
                    price: 19.72,
                },
            ],
            order_total: 120.5,
            timestamp: None,
        }
    }

    fn codes(summaries: &[CouponSummary]) -> Vec<&str> {
        summaries.iter().map(|c| c.coupon_code.as_str()).collect()
    }

    #[tokio::test]
    async fn test_listing_reflects_create_immediately() {
        let engine = memory_engine().await;
        let now = Utc::now();
        engine
            .create(&coupon_expiring("AAA", now + ChronoDuration::days(10)))
            .await
            .unwrap();

        let first = engine.applicable_coupons(&untimed_request()).await.unwrap();
        assert_eq!(codes(&first), vec!["AAA"]);
        assert!(engine.cache().get_valid_snapshot().await.is_some());

        engine
            .create(&coupon_expiring("BBB", now + ChronoDuration::days(10)))
            .await
            .unwrap();
        assert!(engine.cache().get_valid_snapshot().await.is_none());

        let second = engine.applicable_coupons(&untimed_request()).await.unwrap();
        assert_eq!(codes(&second), vec!["AAA", "BBB"]);
    }

    #[tokio::test]
    async fn test_untimed_listings_are_served_from_snapshot() {
        let engine = memory_engine().await;
        let now = Utc::now();
        engine
            .create(&coupon_expiring("AAA", now + ChronoDuration::days(10)))
            .await
            .unwrap();

        let first = engine.applicable_coupons(&untimed_request()).await.unwrap();
        let snapshot = engine.cache().get_valid_snapshot().await.unwrap();

        // written behind the engine's back, so only a store read would see it
        engine
            .database()
            .coupons()
            .insert(&coupon_expiring("HIDDEN", now + ChronoDuration::days(10)), now)
            .await
            .unwrap();

        for _ in 0..3 {
            let again = engine.applicable_coupons(&untimed_request()).await.unwrap();
            assert_eq!(again, first);
        }

        // a past instant no older than the snapshot is answered by it too
        let at_snapshot = engine
            .list_applicable(&pain_relief_cart(), snapshot.as_of)
            .await
            .unwrap();
        assert_eq!(at_snapshot.len(), 1);

        // older than the snapshot: straight to the store
        let before = engine
            .list_applicable(&pain_relief_cart(), snapshot.as_of - ChronoDuration::seconds(1))
            .await
            .unwrap();
        let codes: Vec<&str> = before.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["AAA", "HIDDEN"]);
    }

    /// Delays every snapshot write so an invalidation can overtake it.
    struct SlowSnapshotWrites(InMemoryCache);

    #[async_trait::async_trait]
    impl CacheBackend for SlowSnapshotWrites {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
            if key == VALID_COUPONS_KEY {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            self.0.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> CacheResult<()> {
            self.0.delete(key).await
        }

        async fn incr(&self, key: &str) -> CacheResult<u64> {
            self.0.incr(key).await
        }

        async fn ping(&self) -> CacheResult<()> {
            self.0.ping().await
        }
    }

    #[tokio::test]
    async fn test_create_during_snapshot_write_is_not_masked() {
        let engine = Arc::new(engine_over(
            memory_db().await,
            Arc::new(SlowSnapshotWrites(InMemoryCache::new())),
        ));
        let now = Utc::now();
        engine
            .create(&coupon_expiring("AAA", now + ChronoDuration::days(10)))
            .await
            .unwrap();

        let listing = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.applicable_coupons(&untimed_request()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine
            .create(&coupon_expiring("BBB", now + ChronoDuration::days(10)))
            .await
            .unwrap();
        listing.await.unwrap().unwrap();

        let after = engine.applicable_coupons(&untimed_request()).await.unwrap();
        assert_eq!(codes(&after), vec!["AAA", "BBB"]);
    }

    #[tokio::test]
    async fn test_listing_is_idempotent() {
        let engine = memory_engine().await;
        let now = Utc::now();
        for code in ["C1", "C2", "C3"] {
            engine
                .create(&coupon_expiring(code, now + ChronoDuration::days(5)))
                .await
                .unwrap();
        }
        let at = now + ChronoDuration::hours(1);

        let first = engine.list_applicable(&pain_relief_cart(), at).await.unwrap();
        let second = engine.list_applicable(&pain_relief_cart(), at).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_listing_filters_snapshot_by_future_instant() {
        let engine = memory_engine().await;
        let now = Utc::now();
        engine
            .create(&coupon_expiring("SHORT", now + ChronoDuration::days(1)))
            .await
            .unwrap();
        engine
            .create(&coupon_expiring("LONG", now + ChronoDuration::days(30)))
            .await
            .unwrap();

        let later = engine
            .list_applicable(&pain_relief_cart(), now + ChronoDuration::days(2))
            .await
            .unwrap();
        let codes: Vec<&str> = later.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["LONG"]);
    }

    // -------------------------------------------------------------------------
    // Cache failure
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_failing_cache_changes_nothing() {
        let healthy = memory_engine().await;
        let broken = engine_over(memory_db().await, Arc::new(FailingCache));

        for engine in [&healthy, &broken] {
            engine.create(&save20()).await.unwrap();
            assert!(matches!(
                engine.create(&save20()).await,
                Err(EngineError::AlreadyExists(_))
            ));
        }

        let at = ts(2025, 6, 1);
        let cart = pain_relief_cart();
        assert_eq!(
            healthy.list_applicable(&cart, at).await.unwrap(),
            broken.list_applicable(&cart, at).await.unwrap()
        );

        for _ in 0..2 {
            let a = healthy.redeem("u1", "SAVE20", &cart, at).await.unwrap();
            let b = broken.redeem("u1", "SAVE20", &cart, at).await.unwrap();
            assert_eq!(a.rejection(), b.rejection());
        }
        assert_eq!(
            broken.database().usages().count_for_coupon("SAVE20").await.unwrap(),
            1
        );
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    async fn file_engine(dir: &tempfile::TempDir, config: EngineConfig) -> RedemptionEngine {
        let db = Database::new(DbConfig::new(dir.path().join("coupons.db")))
            .await
            .unwrap();
        RedemptionEngine::new(db, Arc::new(InMemoryCache::new()), config)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_single_use_redemptions() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            file_engine(
                &dir,
                EngineConfig::default().validation_timeout(Duration::from_secs(30)),
            )
            .await,
        );
        engine.create(&save20()).await.unwrap();

        const N: usize = 12;
        let mut handles = Vec::with_capacity(N);
        for _ in 0..N {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine
                    .redeem("same-user", "SAVE20", &pain_relief_cart(), ts(2025, 6, 1))
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        let mut limited = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Redemption::Applied { .. } => applied += 1,
                Redemption::Rejected(Rejection::UsageLimitReached) => limited += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(limited, N - 1);
        assert_eq!(
            engine
                .database()
                .usages()
                .count_for_user("same-user", "SAVE20")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_while_locked_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = file_engine(
            &dir,
            EngineConfig::default().validation_timeout(Duration::from_millis(200)),
        )
        .await;
        engine.create(&save20()).await.unwrap();

        // another writer holds the coupon lock
        let mut holder = engine.database().begin().await.unwrap();
        CouponRepository::lock_for_update(&mut *holder, "SAVE20")
            .await
            .unwrap()
            .unwrap();

        let err = engine
            .redeem("u1", "SAVE20", &pain_relief_cart(), ts(2025, 6, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(d) if d == Duration::from_millis(200)));

        holder.rollback().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            engine.database().usages().count_for_coupon("SAVE20").await.unwrap(),
            0
        );

        // lock released: a fresh attempt goes through
        let redemption = engine
            .redeem("u1", "SAVE20", &pain_relief_cart(), ts(2025, 6, 1))
            .await
            .unwrap();
        assert!(redemption.is_applied());
    }
}
