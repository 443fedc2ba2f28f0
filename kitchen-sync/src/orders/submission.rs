//! Order Submission Pipeline
//!
//! Cart snapshot -> totals -> persisted `placed` order -> cart cleared.
//! A failure before the order exists leaves the cart untouched.
//!
//! Submissions are single-flight per (tenant, table): a second `submit`
//! for the same table while one is in flight is rejected with
//! `ConcurrencyConflict`. Ordinary cart mutations stay open meanwhile.

use super::cart::{CartKey, CartStore};
use super::error::{OrderError, OrderResult, ValidationError};
use super::money;
use super::traits::{
    CouponGrant, CouponService, Operator, OrderDraft, OrderStore, TableLink, TicketKind,
    TicketPrinter,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::order::{CartLine, Order, OrderOrigin};
use std::sync::Arc;

/// Caller context for one submission
#[derive(Debug, Clone, Default)]
pub struct SubmitContext {
    /// Authenticated operator; required
    pub operator: Option<Operator>,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub origin: OrderOrigin,
    /// "Adding more" to a table that already has an active order
    pub amendment: bool,
}

impl SubmitContext {
    pub fn staff(operator: Operator) -> Self {
        Self {
            operator: Some(operator),
            ..Default::default()
        }
    }

    pub fn amendment(mut self) -> Self {
        self.amendment = true;
        self
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }
}

/// Releases the table's submission lock on drop
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<CartKey, ()>,
    key: CartKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

pub struct SubmissionPipeline {
    carts: Arc<CartStore>,
    store: Arc<dyn OrderStore>,
    printer: Arc<dyn TicketPrinter>,
    coupons: Option<Arc<dyn CouponService>>,
    tax_rate_percent: f64,
    in_flight: DashMap<CartKey, ()>,
}

impl SubmissionPipeline {
    pub fn new(
        carts: Arc<CartStore>,
        store: Arc<dyn OrderStore>,
        printer: Arc<dyn TicketPrinter>,
        tax_rate_percent: f64,
    ) -> Self {
        Self {
            carts,
            store,
            printer,
            coupons: None,
            tax_rate_percent,
            in_flight: DashMap::new(),
        }
    }

    pub fn with_coupons(mut self, coupons: Arc<dyn CouponService>) -> Self {
        self.coupons = Some(coupons);
        self
    }

    /// Whether a submission for this table is currently in flight
    pub fn is_submitting(&self, key: &CartKey) -> bool {
        self.in_flight.contains_key(key)
    }

    fn acquire(&self, key: &CartKey) -> OrderResult<InFlightGuard<'_>> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => Err(OrderError::ConcurrencyConflict {
                tenant_id: key.tenant_id.clone(),
                table_id: key.table_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(InFlightGuard {
                    in_flight: &self.in_flight,
                    key: key.clone(),
                })
            }
        }
    }

    /// Convert the table's cart into a persisted `placed` order
    pub async fn submit(&self, key: &CartKey, ctx: SubmitContext) -> OrderResult<Order> {
        let operator = match ctx.operator.as_ref() {
            Some(op) if !op.id.is_empty() => op.clone(),
            _ => return Err(ValidationError::NotAuthenticated.into()),
        };

        let _guard = self.acquire(key).inspect_err(|_| {
            tracing::warn!(cart = %key, "Submission rejected: already in flight");
        })?;

        // 1. Snapshot
        let snapshot = self.carts.list(key);
        if snapshot.is_empty() {
            return Err(ValidationError::CartEmpty.into());
        }

        // 2. Coupon
        let grant = match ctx.coupon_code.as_deref() {
            Some(code) => self.redeem_coupon(&key.tenant_id, code, &snapshot).await?,
            None => CouponGrant::default(),
        };

        // 3. Totals
        let mut lines = snapshot.clone();
        lines.extend(grant.free_items.iter().map(|item| CartLine {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: 0.0,
            quantity: 1,
            total: 0.0,
            variant_selections: vec![],
            note: Some("coupon".to_string()),
        }));
        let totals = money::compute_totals(&lines, self.tax_rate_percent, grant.discount);

        // 4. Persist
        let draft = OrderDraft {
            tenant_id: key.tenant_id.clone(),
            table_id: Some(key.table_id.clone()),
            origin: ctx.origin,
            lines,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            notes: ctx.notes.clone(),
            is_amendment: ctx.amendment,
            created_by: operator,
        };
        let order = match self.store.create_order(draft).await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(cart = %key, error = %e, "Order creation failed, cart kept");
                if let Some(code) = ctx.coupon_code.as_deref() {
                    self.release_coupon(&key.tenant_id, code).await;
                }
                return Err(e);
            }
        };

        tracing::info!(
            order_id = %order.id,
            seq = order.sequence_number,
            cart = %key,
            total = order.total,
            amendment = order.is_amendment,
            "Order placed"
        );

        // 5. Clear what was sent. The order exists now; later failures are logged only.
        if let Err(e) = self.carts.remove_submitted(key, &snapshot) {
            tracing::error!(cart = %key, order_id = %order.id, error = %e, "Failed to clear submitted cart");
        }

        let link = if ctx.amendment {
            TableLink::Append
        } else {
            TableLink::Occupy
        };
        if let Err(e) = self
            .store
            .link_table_order(&key.tenant_id, &key.table_id, &order.id, link)
            .await
        {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to link order to table");
        }

        // 6. Kitchen ticket (fire-and-forget)
        let printer = self.printer.clone();
        let ticket = order.clone();
        tokio::spawn(async move {
            if let Err(e) = printer.print_ticket(&ticket, TicketKind::Kitchen).await {
                tracing::warn!(order_id = %ticket.id, error = %e, "Kitchen ticket failed");
            }
        });

        Ok(order)
    }

    async fn redeem_coupon(
        &self,
        tenant_id: &str,
        code: &str,
        lines: &[CartLine],
    ) -> OrderResult<CouponGrant> {
        let Some(coupons) = self.coupons.as_ref() else {
            return Err(OrderError::CouponRejected(format!(
                "coupons are not enabled (code {})",
                code
            )));
        };
        let grant = coupons
            .validate_and_consume(tenant_id, code, money::subtotal(lines))
            .await?;
        tracing::debug!(code, discount = grant.discount, free_items = grant.free_items.len(), "Coupon applied");
        Ok(grant)
    }

    /// Undo a redemption whose order was never created
    async fn release_coupon(&self, tenant_id: &str, code: &str) {
        let Some(coupons) = self.coupons.as_ref() else {
            return;
        };
        match coupons.release(tenant_id, code).await {
            Ok(()) => tracing::debug!(code, "Coupon released"),
            Err(e) => tracing::warn!(code, error = %e, "Failed to release coupon"),
        }
    }
}
