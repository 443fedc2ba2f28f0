//! Order status state machine
//!
//! ```text
//! placed ──► confirmed ──► preparing ──► ready ──► completed
//!    │           │             │           │
//!    └───────────┴─────────────┴───────────┴──────► cancelled
//! ```
//!
//! `apply` is pure: it validates the edge and returns the advanced order.
//! Persisting the result is the caller's job (see `OrderLifecycle`).

use super::error::{OrderError, OrderResult, ValidationError};
use super::money;
use super::traits::Operator;
use crate::utils::time::format_age;
use shared::order::{Order, OrderStatus, PaymentInfo, StatusChange};

/// Payment supplied with a transition to `completed`
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInput {
    pub method: String,
    pub amount_received: f64,
}

impl PaymentInput {
    pub fn new(method: impl Into<String>, amount_received: f64) -> Self {
        Self {
            method: method.into(),
            amount_received,
        }
    }
}

/// Caller context for one transition
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub operator: Operator,
    pub payment: Option<PaymentInput>,
    /// Cancel reason
    pub reason: Option<String>,
    pub note: Option<String>,
    pub now: i64,
}

impl TransitionContext {
    pub fn new(operator: Operator, now: i64) -> Self {
        Self {
            operator,
            payment: None,
            reason: None,
            note: None,
            now,
        }
    }

    pub fn with_payment(mut self, payment: PaymentInput) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Why an order is completed outside the normal edge rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedCompletion {
    /// Operator dismissed it from the kitchen view
    Dismissed,
    /// Older than the staleness threshold
    Stale { age_millis: i64 },
}

/// Legal edges only
pub fn can_transition(current: OrderStatus, target: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (current, target),
        (Placed, Confirmed)
            | (Confirmed, Preparing)
            | (Preparing, Ready)
            | (Ready, Completed)
            | (Placed | Confirmed | Preparing | Ready, Cancelled)
    )
}

/// Next status along the happy path, if any
pub fn next_status(current: OrderStatus) -> Option<OrderStatus> {
    use OrderStatus::*;
    match current {
        Placed => Some(Confirmed),
        Confirmed => Some(Preparing),
        Preparing => Some(Ready),
        Ready => Some(Completed),
        Completed | Cancelled => None,
    }
}

/// Advance `order` to `target`
pub fn apply(order: &Order, target: OrderStatus, ctx: &TransitionContext) -> OrderResult<Order> {
    if !can_transition(order.status, target) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: target,
        });
    }

    let mut next = order.clone();
    let mut note = ctx.note.clone();

    match target {
        OrderStatus::Completed => {
            let payment = ctx
                .payment
                .as_ref()
                .ok_or(ValidationError::PaymentRequired)?;
            money::require_finite(payment.amount_received, "amount_received")?;
            if order.total > 0.0 {
                money::validate_payment_amount(payment.amount_received)?;
            }
            if !money::covers(payment.amount_received, order.total) {
                return Err(ValidationError::PaymentInsufficient {
                    received: payment.amount_received,
                    total: order.total,
                }
                .into());
            }
            next.payment = Some(PaymentInfo {
                method: payment.method.clone(),
                amount_received: payment.amount_received,
                final_total: order.total,
                change: money::change_due(payment.amount_received, order.total),
                paid_at: ctx.now,
            });
        }
        OrderStatus::Cancelled => {
            next.cancel_reason = ctx.reason.clone();
            if note.is_none() {
                note = ctx.reason.clone();
            }
        }
        _ => {}
    }

    push_history(&mut next, target, &ctx.operator, note, ctx.now);
    Ok(next)
}

/// Complete an order without the edge check or a payment record
///
/// Only for kitchen-view dismissal and stale-order reaping. Terminal
/// orders are still refused.
pub fn force_complete(
    order: &Order,
    reason: ForcedCompletion,
    operator: &Operator,
    now: i64,
) -> OrderResult<Order> {
    if order.is_terminal() {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Completed,
        });
    }

    let note = match reason {
        ForcedCompletion::Dismissed => "dismissed from kitchen view".to_string(),
        ForcedCompletion::Stale { age_millis } => {
            format!("auto-completed stale order (age {})", format_age(age_millis))
        }
    };

    let mut next = order.clone();
    push_history(&mut next, OrderStatus::Completed, operator, Some(note), now);
    Ok(next)
}

fn push_history(
    order: &mut Order,
    target: OrderStatus,
    operator: &Operator,
    note: Option<String>,
    now: i64,
) {
    order.history.push(StatusChange {
        from: order.status,
        to: target,
        at: now,
        operator_id: operator.id.clone(),
        operator_name: operator.name.clone(),
        note,
    });
    order.status = target;
    order.updated_at = now;
}
