//! 超时订单清理
//!
//! Orders whose age reaches the staleness threshold are never displayed.
//! Each one gets a fire-and-forget forced `completed` write annotated with
//! its age; the view excludes it whether or not that write lands.

use super::lifecycle::OrderLifecycle;
use super::state_machine::ForcedCompletion;
use super::traits::Operator;
use futures::future::join_all;
use parking_lot::Mutex;
use shared::order::Order;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::utils::time::format_age;

/// `age >= threshold`
pub fn is_stale(order: &Order, now_millis: i64, stale_after: Duration) -> bool {
    let threshold = i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX);
    order.age_millis(now_millis) >= threshold
}

/// Split a push into (fresh, stale), keeping push order
pub fn partition(orders: Vec<Order>, now_millis: i64, stale_after: Duration) -> (Vec<Order>, Vec<Order>) {
    orders
        .into_iter()
        .partition(|o| !is_stale(o, now_millis, stale_after))
}

pub struct StaleOrderReaper {
    lifecycle: Arc<OrderLifecycle>,
    stale_after: Duration,
    /// When false, stale orders are only hidden locally
    remote_reap: bool,
    /// Ids with a write in flight or done; a failed write is retried on the next pass
    reaped: Arc<Mutex<HashSet<String>>>,
}

impl StaleOrderReaper {
    pub fn new(lifecycle: Arc<OrderLifecycle>, stale_after: Duration, remote_reap: bool) -> Self {
        Self {
            lifecycle,
            stale_after,
            remote_reap,
            reaped: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    pub fn partition(&self, orders: Vec<Order>, now_millis: i64) -> (Vec<Order>, Vec<Order>) {
        partition(orders, now_millis, self.stale_after)
    }

    /// Fire forced completions for `stale`; returns None when nothing new was scheduled
    ///
    /// The handle resolves to the number of successful writes.
    pub fn reap(&self, stale: Vec<Order>, now_millis: i64) -> Option<JoinHandle<usize>> {
        let pending: Vec<Order> = {
            let mut reaped = self.reaped.lock();
            stale
                .into_iter()
                .filter(|o| reaped.insert(o.id.clone()))
                .collect()
        };
        if pending.is_empty() {
            return None;
        }

        for order in &pending {
            tracing::warn!(
                order_id = %order.id,
                seq = order.sequence_number,
                status = %order.status,
                age = %format_age(order.age_millis(now_millis)),
                "Stale order excluded from kitchen view"
            );
        }

        if !self.remote_reap {
            return None;
        }

        let lifecycle = self.lifecycle.clone();
        let reaped = self.reaped.clone();
        let operator = Operator::automation();
        Some(tokio::spawn(async move {
            let writes = pending.iter().map(|order| {
                let reason = ForcedCompletion::Stale {
                    age_millis: order.age_millis(now_millis),
                };
                lifecycle.force_complete(&order.id, reason, &operator, now_millis)
            });
            let results = join_all(writes).await;

            let mut ok = 0;
            for (order, result) in pending.iter().zip(results) {
                match result {
                    Ok(_) => ok += 1,
                    Err(e) => {
                        tracing::warn!(order_id = %order.id, error = %e, "Stale order write failed");
                        reaped.lock().remove(&order.id);
                    }
                }
            }
            ok
        }))
    }

    /// Drop ids the feed no longer carries; they cannot come back stale
    pub fn retain_pushed(&self, pushed: &HashSet<&str>) {
        self.reaped.lock().retain(|id| pushed.contains(id.as_str()));
    }

    pub fn reaped_count(&self) -> usize {
        self.reaped.lock().len()
    }
}
