//! Automation Mutation Channel (voice commands)
//!
//! Bypasses the UI phase guard (`MutationMode::Forced`) but never the
//! state machine. Every cart change is verified and, if needed, corrected
//! once; whatever still fails comes back with a "please complete manually"
//! message and is pushed to the notifier.

pub mod compensate;
pub mod resolver;

use super::cart::{CartKey, CartStore, MutationMode};
use super::error::{OrderError, OrderResult};
use super::lifecycle::OrderLifecycle;
use super::money;
use super::state_machine::{PaymentInput, TransitionContext, can_transition};
use super::submission::{SubmissionPipeline, SubmitContext};
use super::traits::{MenuCatalog, Notification, Notifier, Operator};
use crate::utils::time::now_millis;
use compensate::{ApplyPath, VerifiedMutation, run_verified};
use parking_lot::Mutex;
use resolver::{ItemResolver, parse_quantity};
use shared::models::MenuItem;
use shared::order::cart::line_key_for;
use shared::order::{CartLine, Order, OrderStatus};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Automation failure with the message relayed to staff
#[derive(Debug, Error)]
#[error("{manual_fallback}")]
pub struct AutomationFailure {
    #[source]
    pub error: OrderError,
    pub manual_fallback: String,
}

pub type AutomationResult<T> = Result<T, AutomationFailure>;

/// Result of `force_add_item`
#[derive(Debug, Clone)]
pub struct AddedItem {
    pub item: MenuItem,
    pub quantity: i32,
    pub lines: Vec<CartLine>,
    pub path: ApplyPath,
}

/// A forced addition not yet submitted
#[derive(Debug, Clone)]
struct PendingAddition {
    item: MenuItem,
    line_key: String,
    quantity: i32,
}

pub struct AutomationChannel {
    carts: Arc<CartStore>,
    pipeline: Arc<SubmissionPipeline>,
    lifecycle: Arc<OrderLifecycle>,
    catalog: Arc<dyn MenuCatalog>,
    notifier: Arc<dyn Notifier>,
    resolver: ItemResolver,
    pending: Mutex<HashMap<CartKey, Vec<PendingAddition>>>,
}

impl AutomationChannel {
    pub fn new(
        carts: Arc<CartStore>,
        pipeline: Arc<SubmissionPipeline>,
        lifecycle: Arc<OrderLifecycle>,
        catalog: Arc<dyn MenuCatalog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            carts,
            pipeline,
            lifecycle,
            catalog,
            notifier,
            resolver: ItemResolver::default(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_resolver(mut self, resolver: ItemResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Resolve a spoken item and add it to the cart
    ///
    /// `quantity = None` uses the quantity spoken in the query, else 1.
    pub async fn force_add_item(
        &self,
        key: &CartKey,
        query: &str,
        quantity: Option<i32>,
    ) -> AutomationResult<AddedItem> {
        self.try_add_item(key, query, quantity)
            .await
            .map_err(|e| self.fail(&format!("add \"{}\"", query), e))
    }

    async fn try_add_item(
        &self,
        key: &CartKey,
        query: &str,
        quantity: Option<i32>,
    ) -> OrderResult<AddedItem> {
        let (spoken, item_query) = parse_quantity(query);
        let quantity = quantity.or(spoken).unwrap_or(1);
        money::validate_quantity(quantity)?;

        let menu = self.catalog.menu_items(&key.tenant_id).await?;
        let item = self.resolver.resolve(&item_query, &menu)?.clone();
        tracing::info!(cart = %key, query, item = %item.name, quantity, "Automation resolved item");

        let (lines, path) = self.add_verified(key, &item, quantity)?;

        let line_key = line_key_for(&item.id, &[]);
        self.pending
            .lock()
            .entry(key.clone())
            .or_default()
            .push(PendingAddition {
                item: item.clone(),
                line_key,
                quantity,
            });

        Ok(AddedItem {
            item,
            quantity,
            lines,
            path,
        })
    }

    fn add_verified(
        &self,
        key: &CartKey,
        item: &MenuItem,
        quantity: i32,
    ) -> OrderResult<(Vec<CartLine>, ApplyPath)> {
        let line_key = line_key_for(&item.id, &[]);
        let before_qty = self
            .carts
            .list(key)
            .iter()
            .find(|l| l.line_key() == line_key)
            .map_or(0, |l| l.quantity);
        let expected_qty = before_qty + quantity;

        run_verified(
            &self.carts,
            key,
            "add item",
            VerifiedMutation {
                intended: Box::new(|before: &[CartLine]| merged_lines(before, item, quantity)),
                apply: Box::new(|carts: &CartStore| {
                    carts
                        .add_line(key, item, quantity, vec![], MutationMode::Forced)
                        .map(|_| ())
                }),
                verify: Box::new(|after: &[CartLine]| {
                    after
                        .iter()
                        .any(|l| l.line_key() == line_key && l.quantity >= expected_qty)
                }),
            },
        )
    }

    /// Submit the cart once pending additions are confirmed present
    pub async fn force_submit(&self, key: &CartKey, ctx: SubmitContext) -> AutomationResult<Order> {
        self.try_submit(key, ctx)
            .await
            .map_err(|e| self.fail("submit the order", e))
    }

    async fn try_submit(&self, key: &CartKey, ctx: SubmitContext) -> OrderResult<Order> {
        let pending = self.pending.lock().remove(key).unwrap_or_default();

        let result = self.submit_pending(key, &pending, ctx).await;
        if result.is_err() && !pending.is_empty() {
            // keep them ahead of anything added while the submit was in flight
            let mut map = self.pending.lock();
            let entry = map.entry(key.clone()).or_default();
            let later = std::mem::replace(entry, pending);
            entry.extend(later);
        }
        result
    }

    async fn submit_pending(
        &self,
        key: &CartKey,
        pending: &[PendingAddition],
        mut ctx: SubmitContext,
    ) -> OrderResult<Order> {
        for addition in pending {
            let present = self
                .carts
                .list(key)
                .iter()
                .any(|l| l.line_key() == addition.line_key);
            if !present {
                tracing::warn!(cart = %key, item = %addition.item.name, "Pending item missing before submit, re-adding");
                self.add_verified(key, &addition.item, addition.quantity)?;
            }
        }

        if self.carts.is_empty(key) {
            return Err(OrderError::NothingToSubmit);
        }

        if ctx.operator.is_none() {
            ctx.operator = Some(Operator::automation());
        }
        self.pipeline.submit(key, ctx).await
    }

    /// Move an order along a legal edge; payment is synthesized for `completed`
    pub async fn force_transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        payment_method: Option<&str>,
    ) -> AutomationResult<Order> {
        self.try_transition(order_id, target, payment_method)
            .await
            .map_err(|e| self.fail(&format!("mark order {} as {}", order_id, target), e))
    }

    async fn try_transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        payment_method: Option<&str>,
    ) -> OrderResult<Order> {
        let order = self.lifecycle.load(order_id).await?;
        if !can_transition(order.status, target) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        let mut ctx = TransitionContext::new(Operator::automation(), now_millis());
        if target == OrderStatus::Completed {
            let method = payment_method.unwrap_or("cash");
            ctx = ctx.with_payment(PaymentInput::new(method, order.total));
        }
        self.lifecycle.transition(order_id, target, &ctx).await
    }

    fn fail(&self, action: &str, error: OrderError) -> AutomationFailure {
        let manual_fallback = format!("Could not {}: {}. Please complete manually.", action, error);
        tracing::warn!(error = %error, "Automation fell back to manual: {}", action);
        self.notifier.notify(Notification::ManualActionRequired {
            message: manual_fallback.clone(),
        });
        AutomationFailure {
            error,
            manual_fallback,
        }
    }
}

/// `before` with `quantity` of a variant-free `item` merged in
fn merged_lines(before: &[CartLine], item: &MenuItem, quantity: i32) -> Vec<CartLine> {
    let mut lines = before.to_vec();
    let key = line_key_for(&item.id, &[]);
    match lines.iter_mut().find(|l| l.line_key() == key) {
        Some(line) => {
            line.quantity += quantity;
            money::recalculate_line(line);
        }
        None => {
            let mut line = CartLine {
                item_id: item.id.clone(),
                name: item.name.clone(),
                unit_price: item.price,
                quantity,
                total: 0.0,
                variant_selections: vec![],
                note: None,
            };
            money::recalculate_line(&mut line);
            lines.push(line);
        }
    }
    lines
}
