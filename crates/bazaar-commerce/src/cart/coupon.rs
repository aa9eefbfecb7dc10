//! Discount coupons.

use bazaar_db::{Db, Document, Filter, FindOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CommerceError, CommerceResult};
use crate::ids::{CouponId, UserId};
use crate::money::Money;
use crate::validate;

/// How a coupon's value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Percentage off the order value.
    Percentage,
    /// Fixed rupee amount off.
    Fixed,
}

/// A discount code with a validity window and usage cap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: CouponId,
    /// Upper-case code customers enter (e.g., "SAVE10").
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent for percentage coupons, rupees for fixed ones.
    pub discount_value: f64,
    #[serde(default)]
    pub min_order_value: Option<Money>,
    #[serde(default)]
    pub max_discount: Option<Money>,
    #[serde(with = "crate::timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default)]
    pub used_by: Vec<UserId>,
    /// Maximum number of redemptions (None = unlimited).
    #[serde(default)]
    pub usage_limit: Option<u64>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

impl Document for Coupon {
    const COLLECTION: &'static str = "coupons";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn unique_keys() -> &'static [&'static [&'static str]] {
        &[&["code"]]
    }
}

impl Coupon {
    /// Normalize and check before a save. An active coupon whose end date
    /// has passed is switched off.
    fn prepare(&mut self, now: DateTime<Utc>) -> CommerceResult<()> {
        self.code = validate::required(&self.code, "Please add a coupon code")?.to_uppercase();
        if !self.discount_value.is_finite() || self.discount_value < 0.0 {
            return Err(CommerceError::invalid("Discount value must be at least 0"));
        }
        if self.discount_type == DiscountType::Percentage && self.discount_value > 100.0 {
            return Err(CommerceError::invalid("Percentage discount cannot exceed 100"));
        }
        if self.min_order_value.is_some_and(|m| m.is_negative()) {
            return Err(CommerceError::invalid("Minimum order value must be at least 0"));
        }
        if self.max_discount.is_some_and(|m| m.is_negative()) {
            return Err(CommerceError::invalid("Maximum discount must be at least 0"));
        }
        if self.end_date <= self.start_date {
            return Err(CommerceError::invalid("End date must be after start date"));
        }
        if self.is_active && self.end_date < now {
            self.is_active = false;
        }
        Ok(())
    }

    /// Discount for an order of `order_value`, ignoring eligibility.
    ///
    /// Percentage discounts are capped by `maxDiscount`; no discount
    /// exceeds the order value.
    pub fn discount_for(&self, order_value: Money) -> Money {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let amount = order_value.percentage(self.discount_value);
                match self.max_discount {
                    Some(cap) => amount.min(cap),
                    None => amount,
                }
            }
            DiscountType::Fixed => Money::from_decimal(self.discount_value),
        };
        raw.min(order_value).max(Money::zero())
    }

    /// Check that `user` may apply the coupon to `order_value` at `now`.
    pub fn check_eligible(
        &self,
        user: &UserId,
        order_value: Money,
        now: DateTime<Utc>,
    ) -> CommerceResult<()> {
        if !self.is_active {
            return Err(CommerceError::InvalidCoupon("Coupon is not active".into()));
        }
        if now < self.start_date {
            return Err(CommerceError::InvalidCoupon("Coupon is not valid yet".into()));
        }
        if now > self.end_date {
            return Err(CommerceError::InvalidCoupon("Coupon has expired".into()));
        }
        if let Some(limit) = self.usage_limit {
            if self.used_by.len() as u64 >= limit {
                return Err(CommerceError::InvalidCoupon(
                    "Coupon usage limit reached".into(),
                ));
            }
        }
        if self.used_by.contains(user) {
            return Err(CommerceError::InvalidCoupon(
                "You have already used this coupon".into(),
            ));
        }
        if let Some(min) = self.min_order_value {
            if order_value < min {
                return Err(CommerceError::InvalidCoupon(format!(
                    "Minimum order value of {} required",
                    min
                )));
            }
        }
        Ok(())
    }
}

/// Payload for creating a coupon.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub min_order_value: Option<Money>,
    #[serde(default)]
    pub max_discount: Option<Money>,
    #[serde(with = "crate::timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<u64>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Result of checking a coupon against an order value.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuote {
    pub code: String,
    pub discount_type: DiscountType,
    pub order_value: Money,
    pub discount: Money,
    pub final_amount: Money,
}

/// Coupon storage, validation and redemption.
#[derive(Clone)]
pub struct CouponService {
    db: Db,
}

impl CouponService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, created_by: UserId, input: NewCoupon) -> CommerceResult<Coupon> {
        let now = crate::timestamp::now();
        let mut coupon = Coupon {
            id: CouponId::generate(),
            code: input.code,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            min_order_value: input.min_order_value,
            max_discount: input.max_discount,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: input.is_active.unwrap_or(true),
            used_by: Vec::new(),
            usage_limit: input.usage_limit,
            created_at: now,
            created_by,
        };
        coupon.prepare(now)?;
        self.db.insert(&coupon).await?;

        info!(coupon = %coupon.code, "Coupon created");
        Ok(coupon)
    }

    /// All coupons, newest first.
    pub async fn list(&self) -> CommerceResult<Vec<Coupon>> {
        Ok(self
            .db
            .find(&Filter::new(), &FindOptions::new().sort_by("-createdAt,-_id"))
            .await?)
    }

    pub async fn find_by_code(&self, code: &str) -> CommerceResult<Coupon> {
        let code = code.trim().to_uppercase();
        self.db
            .find_one::<Coupon>(&Filter::new().eq("code", code.as_str()))
            .await?
            .ok_or_else(|| CommerceError::InvalidCoupon("Invalid coupon code".into()))
    }

    /// Price an order with a coupon without redeeming it.
    pub async fn quote(
        &self,
        code: &str,
        user: &UserId,
        order_value: Money,
    ) -> CommerceResult<CouponQuote> {
        let coupon = self.find_by_code(code).await?;
        coupon.check_eligible(user, order_value, crate::timestamp::now())?;
        let discount = coupon.discount_for(order_value);
        Ok(CouponQuote {
            code: coupon.code,
            discount_type: coupon.discount_type,
            order_value,
            discount,
            final_amount: order_value
                .checked_sub(discount)
                .ok_or(CommerceError::Overflow)?,
        })
    }

    /// Record that `user` used the coupon, re-checking eligibility under the
    /// write lock. Returns the discount granted.
    pub async fn redeem(
        &self,
        code: &str,
        user: &UserId,
        order_value: Money,
    ) -> CommerceResult<Money> {
        let coupon = self.find_by_code(code).await?;
        let discount = self
            .db
            .update::<Coupon, _, CommerceError, _>(coupon.id.as_str(), |coupon| {
                coupon.check_eligible(user, order_value, crate::timestamp::now())?;
                coupon.used_by.push(user.clone());
                Ok(coupon.discount_for(order_value))
            })
            .await?
            .ok_or_else(|| CommerceError::InvalidCoupon("Invalid coupon code".into()))?;

        info!(coupon = %coupon.code, user = %user, discount = %discount, "Coupon redeemed");
        Ok(discount)
    }

    /// Give a redemption back (e.g. when the order could not be placed).
    pub async fn release(&self, code: &str, user: &UserId) -> CommerceResult<()> {
        let coupon = self.find_by_code(code).await?;
        self.db
            .update::<Coupon, _, CommerceError, _>(coupon.id.as_str(), |coupon| {
                if let Some(pos) = coupon.used_by.iter().position(|u| u == user) {
                    coupon.used_by.remove(pos);
                }
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn deactivate(&self, id: &str) -> CommerceResult<Coupon> {
        self.db
            .update::<Coupon, _, CommerceError, _>(id, |coupon| {
                coupon.is_active = false;
                Ok(coupon.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Coupon", id))
    }

    pub async fn delete(&self, id: &str) -> CommerceResult<()> {
        if !self.db.delete_by_id::<Coupon>(id).await? {
            return Err(CommerceError::not_found("Coupon", id));
        }
        Ok(())
    }
}
