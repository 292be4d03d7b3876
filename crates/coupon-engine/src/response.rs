//! Engine results and their wire shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use coupon_core::{
    Coupon, DiscountBreakdown, DiscountTarget, DiscountType, Rejection, UsageType,
};

/// Message attached to every successful redemption.
pub const APPLIED_MESSAGE: &str = "coupon applied successfully";

/// Outcome of a redemption attempt. A rejection is a decision, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// Eligible; one usage row was committed.
    Applied {
        discount: DiscountBreakdown,
        usage_id: i64,
    },
    /// Not eligible; nothing was persisted.
    Rejected(Rejection),
}

impl Redemption {
    pub fn is_applied(&self) -> bool {
        matches!(self, Redemption::Applied { .. })
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Redemption::Rejected(rejection) => Some(*rejection),
            Redemption::Applied { .. } => None,
        }
    }
}

/// `{valid, discount, message}` or `{valid, reason}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<BTreeMap<DiscountTarget, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Redemption> for ValidationOutcome {
    fn from(redemption: Redemption) -> Self {
        match redemption {
            Redemption::Applied { discount, .. } => ValidationOutcome {
                valid: true,
                discount: Some(
                    discount
                        .into_iter()
                        .map(|(target, amount)| (target, amount.to_decimal()))
                        .collect(),
                ),
                message: Some(APPLIED_MESSAGE.to_string()),
                reason: None,
            },
            Redemption::Rejected(rejection) => ValidationOutcome {
                valid: false,
                discount: None,
                message: None,
                reason: Some(rejection.reason()),
            },
        }
    }
}

/// A listable coupon, with amounts back in decimal form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponSummary {
    pub coupon_code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub discount_target: DiscountTarget,
    pub min_order_value: f64,
    pub max_discount_amount: f64,
    pub max_usage_per_user: i64,
    pub usage_type: UsageType,
    pub expiry_date: DateTime<Utc>,
    pub terms_and_conditions: String,
}

impl From<&Coupon> for CouponSummary {
    fn from(coupon: &Coupon) -> Self {
        CouponSummary {
            coupon_code: coupon.code.clone(),
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value_decimal(),
            discount_target: coupon.discount_target,
            min_order_value: coupon.min_order_value.to_decimal(),
            max_discount_amount: coupon.max_discount_amount.to_decimal(),
            max_usage_per_user: coupon.max_usage_per_user,
            usage_type: coupon.usage_type,
            expiry_date: coupon.expiry_date,
            terms_and_conditions: coupon.terms_and_conditions.clone(),
        }
    }
}
