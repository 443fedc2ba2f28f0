//! Active-Order Event Stream Client
//!
//! One subscription per session. A single task consumes the push channel
//! and the reaper tick, so pushes are handled strictly in arrival order.
//!
//! ```text
//! transport ──FeedMessage──► feed task ──partition──► fresh ──► Reconciler ──► KitchenView
//!                               │                       │
//!                               │ tick                  └─ delta > 0 ──► Notifier
//!                               └──► evict stale ──► StaleOrderReaper
//! ```

use super::error::{OrderError, OrderResult};
use super::reaper::StaleOrderReaper;
use super::reconcile::{Reconciler, UpdateCallback};
use super::traits::{ActiveOrderTransport, FeedMessage, Notification, Notifier};
use super::view::{ConnectionState, KitchenView};
use crate::utils::time::now_millis;
use parking_lot::Mutex;
use shared::order::Order;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct ActiveOrderStream {
    transport: Arc<dyn ActiveOrderTransport>,
    reconciler: Arc<Reconciler>,
    reaper: Arc<StaleOrderReaper>,
    notifier: Arc<dyn Notifier>,
    reaper_interval: Duration,
    notify_on_first_push: bool,
    connection_tx: watch::Sender<ConnectionState>,
    /// (shutdown, done) of the running feed task
    current: Mutex<Option<(CancellationToken, CancellationToken)>>,
}

impl ActiveOrderStream {
    pub fn new(
        transport: Arc<dyn ActiveOrderTransport>,
        reconciler: Arc<Reconciler>,
        reaper: Arc<StaleOrderReaper>,
        notifier: Arc<dyn Notifier>,
        reaper_interval: Duration,
    ) -> Self {
        let (connection_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            reconciler,
            reaper,
            notifier,
            reaper_interval,
            notify_on_first_push: false,
            connection_tx,
            current: Mutex::new(None),
        }
    }

    pub fn with_first_push_notification(mut self, enabled: bool) -> Self {
        self.notify_on_first_push = enabled;
        self
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_tx.subscribe()
    }

    /// Start receiving pushes for a tenant
    ///
    /// Replaces any previous subscription of this stream.
    pub async fn subscribe(
        &self,
        tenant_id: &str,
        on_update: UpdateCallback,
    ) -> OrderResult<Subscription> {
        let previous = self.current.lock().take();
        if let Some((shutdown, done)) = previous {
            shutdown.cancel();
            done.cancelled().await;
        }

        self.reconciler.reset_feed();
        self.reconciler.set_on_update(Some(on_update));
        self.set_connection(ConnectionState::Connecting);

        let rx = match self.transport.open(tenant_id).await {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!(tenant_id, error = %e, "Failed to open order feed");
                self.set_connection(ConnectionState::Disconnected);
                return Err(match e {
                    OrderError::Transport(_) => e,
                    other => OrderError::transport(other),
                });
            }
        };

        let token = CancellationToken::new();
        let done = CancellationToken::new();
        *self.current.lock() = Some((token.clone(), done.clone()));
        tracing::info!(tenant_id, "Subscribed to active orders");

        let task = FeedTask {
            tenant_id: tenant_id.to_string(),
            reconciler: self.reconciler.clone(),
            reaper: self.reaper.clone(),
            notifier: self.notifier.clone(),
            connection_tx: self.connection_tx.clone(),
            notify_on_first_push: self.notify_on_first_push,
            push_count: 0,
        };
        tokio::spawn(task.run(rx, token.clone(), done.clone(), self.reaper_interval));

        Ok(Subscription {
            tenant_id: tenant_id.to_string(),
            token,
            done,
            views: self.reconciler.watch(),
            connection: self.connection_tx.subscribe(),
        })
    }

    fn set_connection(&self, state: ConnectionState) {
        self.connection_tx.send_replace(state);
        self.reconciler.set_connection(state);
    }
}

/// Handle returned by `subscribe`; dropping it unsubscribes
pub struct Subscription {
    tenant_id: String,
    token: CancellationToken,
    done: CancellationToken,
    views: watch::Receiver<KitchenView>,
    connection: watch::Receiver<ConnectionState>,
}

impl Subscription {
    /// Stop the feed and the reaper tick; safe to call more than once
    pub fn unsubscribe(&self) {
        if !self.token.is_cancelled() {
            tracing::info!(tenant_id = %self.tenant_id, "Unsubscribed from active orders");
            self.token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Unsubscribe and wait for the feed task to finish
    pub async fn shutdown(&self) {
        self.unsubscribe();
        self.done.cancelled().await;
    }

    pub fn views(&self) -> watch::Receiver<KitchenView> {
        self.views.clone()
    }

    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct FeedTask {
    tenant_id: String,
    reconciler: Arc<Reconciler>,
    reaper: Arc<StaleOrderReaper>,
    notifier: Arc<dyn Notifier>,
    connection_tx: watch::Sender<ConnectionState>,
    notify_on_first_push: bool,
    push_count: u64,
}

impl FeedTask {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<FeedMessage>,
        shutdown: CancellationToken,
        done: CancellationToken,
        reaper_interval: Duration,
    ) {
        let _done = done.drop_guard();
        let mut ticker = tokio::time::interval(reaper_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // 第一次 tick 立即完成，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(FeedMessage::Connected) => {
                        tracing::info!(tenant_id = %self.tenant_id, "Order feed connected");
                        self.set_connection(ConnectionState::Connected);
                    }
                    Some(FeedMessage::Snapshot(orders)) => self.handle_push(orders),
                    Some(FeedMessage::Disconnected(reason)) => {
                        // keep the last known orders on screen
                        tracing::warn!(tenant_id = %self.tenant_id, reason = %reason, "Order feed disconnected");
                        self.set_connection(ConnectionState::Disconnected);
                    }
                    None => {
                        tracing::warn!(tenant_id = %self.tenant_id, "Order feed closed by transport");
                        break;
                    }
                },
                _ = ticker.tick() => self.sweep(),
            }
        }

        self.set_connection(ConnectionState::Disconnected);
        tracing::debug!(tenant_id = %self.tenant_id, "Order feed task stopped");
    }

    fn set_connection(&self, state: ConnectionState) {
        self.connection_tx.send_replace(state);
        self.reconciler.set_connection(state);
    }

    fn handle_push(&mut self, orders: Vec<Order>) {
        let now = now_millis();
        let first_push = self.push_count == 0;
        self.push_count += 1;

        if *self.connection_tx.borrow() != ConnectionState::Connected {
            self.set_connection(ConnectionState::Connected);
        }

        // terminal orders never belong in the active set
        let active: Vec<Order> = orders.into_iter().filter(|o| o.is_active()).collect();
        self.reaper
            .retain_pushed(&active.iter().map(|o| o.id.as_str()).collect::<HashSet<_>>());
        let (fresh, stale) = self.reaper.partition(active, now);
        if !stale.is_empty() {
            self.reaper.reap(stale, now);
        }

        let previous = self.reconciler.fresh_ids();
        let delta = fresh.len() as i64 - previous.len() as i64;
        let arrived: Vec<String> = fresh
            .iter()
            .filter(|o| !previous.contains(&o.id))
            .map(|o| o.id.clone())
            .collect();

        let view = self.reconciler.replace_fresh(fresh);
        tracing::debug!(
            tenant_id = %self.tenant_id,
            push = self.push_count,
            visible = view.visible.len(),
            delta,
            "Active orders push"
        );

        if delta > 0 && (!first_push || self.notify_on_first_push) {
            self.notifier.notify(Notification::NewOrders {
                tenant_id: self.tenant_id.clone(),
                delta: delta as usize,
                order_ids: arrived,
            });
        }
    }

    /// Periodic pass: orders that aged past the threshold since the last push
    fn sweep(&self) {
        let now = now_millis();
        let stale = self
            .reconciler
            .evict_stale(now, self.reaper.stale_after());
        if !stale.is_empty() {
            self.reaper.reap(stale, now);
        }
    }
}
