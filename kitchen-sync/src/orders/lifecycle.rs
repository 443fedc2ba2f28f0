//! Order status transitions against the store
//!
//! Load -> `state_machine::apply` -> `update_status`. The persisted write
//! appends the history entry; a receipt prints after payment.

use super::error::{OrderError, OrderResult};
use super::state_machine::{self, ForcedCompletion, TransitionContext};
use super::traits::{
    Notification, Notifier, Operator, OrderStore, StatusUpdate, TicketKind, TicketPrinter,
};
use shared::order::{Order, OrderStatus};
use std::sync::Arc;

pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    printer: Arc<dyn TicketPrinter>,
    notifier: Arc<dyn Notifier>,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn OrderStore>,
        printer: Arc<dyn TicketPrinter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            printer,
            notifier,
        }
    }

    pub async fn load(&self, order_id: &str) -> OrderResult<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Move an order along a legal edge and persist it
    pub async fn transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        ctx: &TransitionContext,
    ) -> OrderResult<Order> {
        let result = self.try_transition(order_id, target, ctx).await;
        match &result {
            Ok(order) => {
                tracing::info!(order_id, from = ?order.history.last().map(|h| h.from), to = %target, "Order transitioned");
                self.notifier.notify(Notification::TransitionApplied {
                    order_id: order_id.to_string(),
                    status: order.status,
                });
            }
            Err(e) => {
                tracing::warn!(order_id, to = %target, error = %e, "Order transition failed");
                self.notifier.notify(Notification::TransitionFailed {
                    order_id: order_id.to_string(),
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn try_transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        ctx: &TransitionContext,
    ) -> OrderResult<Order> {
        let current = self.load(order_id).await?;
        let next = state_machine::apply(&current, target, ctx)?;
        let saved = self.persist(next).await?;

        if saved.status == OrderStatus::Completed {
            self.spawn_receipt(&saved);
        }
        Ok(saved)
    }

    /// Forced completion for dismissal / reaping; no notification, no receipt
    ///
    /// Decided on the stored order, not on a pushed copy: it may have been
    /// cancelled or completed elsewhere since the last push.
    pub async fn force_complete(
        &self,
        order_id: &str,
        reason: ForcedCompletion,
        operator: &Operator,
        now: i64,
    ) -> OrderResult<Order> {
        let current = self.load(order_id).await?;
        let next = state_machine::force_complete(&current, reason, operator, now)?;
        self.persist(next).await
    }

    async fn persist(&self, next: Order) -> OrderResult<Order> {
        let Some(change) = next.history.last().cloned() else {
            return Err(OrderError::validation("transition produced no history entry"));
        };
        self.store
            .update_status(StatusUpdate {
                order_id: next.id.clone(),
                expected: change.from,
                status: next.status,
                change,
                payment: next.payment.clone(),
                cancel_reason: next.cancel_reason.clone(),
            })
            .await
    }

    fn spawn_receipt(&self, order: &Order) {
        let printer = self.printer.clone();
        let order = order.clone();
        tokio::spawn(async move {
            if let Err(e) = printer.print_ticket(&order, TicketKind::Receipt).await {
                tracing::warn!(order_id = %order.id, error = %e, "Receipt print failed");
            }
        });
    }
}
