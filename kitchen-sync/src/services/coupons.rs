//! Fixed coupon table with limited uses

use crate::orders::error::{OrderError, OrderResult};
use crate::orders::traits::{CouponGrant, CouponService};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct StaticCoupon {
    pub grant: CouponGrant,
    /// Minimum cart subtotal to redeem
    pub min_subtotal: f64,
    pub uses_left: u32,
}

impl StaticCoupon {
    pub fn discount(amount: f64) -> Self {
        Self {
            grant: CouponGrant {
                discount: amount,
                free_items: vec![],
            },
            min_subtotal: 0.0,
            uses_left: 1,
        }
    }

    pub fn with_min_subtotal(mut self, min_subtotal: f64) -> Self {
        self.min_subtotal = min_subtotal;
        self
    }

    pub fn with_uses(mut self, uses: u32) -> Self {
        self.uses_left = uses;
        self
    }
}

/// Coupons keyed by (tenant, code); codes are case-insensitive
#[derive(Debug, Default)]
pub struct StaticCoupons {
    coupons: Mutex<HashMap<(String, String), StaticCoupon>>,
}

impl StaticCoupons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant_id: &str, code: &str, coupon: StaticCoupon) {
        self.coupons
            .lock()
            .insert((tenant_id.to_string(), code.to_uppercase()), coupon);
    }

    pub fn uses_left(&self, tenant_id: &str, code: &str) -> Option<u32> {
        self.coupons
            .lock()
            .get(&(tenant_id.to_string(), code.to_uppercase()))
            .map(|c| c.uses_left)
    }
}

#[async_trait]
impl CouponService for StaticCoupons {
    async fn validate_and_consume(
        &self,
        tenant_id: &str,
        code: &str,
        subtotal: f64,
    ) -> OrderResult<CouponGrant> {
        let mut coupons = self.coupons.lock();
        let coupon = coupons
            .get_mut(&(tenant_id.to_string(), code.to_uppercase()))
            .ok_or_else(|| OrderError::CouponRejected(format!("unknown code {}", code)))?;

        if coupon.uses_left == 0 {
            return Err(OrderError::CouponRejected(format!("{} already used", code)));
        }
        if subtotal < coupon.min_subtotal {
            return Err(OrderError::CouponRejected(format!(
                "{} needs a subtotal of at least {}",
                code, coupon.min_subtotal
            )));
        }

        coupon.uses_left -= 1;
        Ok(coupon.grant.clone())
    }

    async fn release(&self, tenant_id: &str, code: &str) -> OrderResult<()> {
        let mut coupons = self.coupons.lock();
        let coupon = coupons
            .get_mut(&(tenant_id.to_string(), code.to_uppercase()))
            .ok_or_else(|| OrderError::CouponRejected(format!("unknown code {}", code)))?;
        coupon.uses_left = coupon.uses_left.saturating_add(1);
        Ok(())
    }
}
