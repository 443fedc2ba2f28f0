//! Reconciliation Layer
//!
//! `visible = fresh pushed orders - suppressed ids`
//!
//! Suppression is local and immediate: the order leaves the view in the
//! same call, before any network round-trip. A best-effort `completed`
//! write is spawned alongside; if it fails the suppression stays and the
//! failure is only logged. No push can bring a suppressed id back. Only
//! `unsuppress` / `unsuppress_all` or the TTL do.
//!
//! The suppressed set lives for the session. A restarted session starts
//! empty, so an order whose write never committed shows up again.

use super::error::OrderError;
use super::lifecycle::OrderLifecycle;
use super::reaper;
use super::state_machine::ForcedCompletion;
use super::traits::Operator;
use super::view::{ConnectionState, KitchenView};
use crate::utils::time::now_millis;
use parking_lot::Mutex;
use shared::order::Order;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Called with every rebuilt view
///
/// Runs while the reconciler lock is held; must not call back into the
/// reconciler.
pub type UpdateCallback = Arc<dyn Fn(&KitchenView) + Send + Sync>;

/// Session cache of dismissed order ids
#[derive(Debug, Clone, Default)]
pub struct SuppressedIdSet {
    entries: HashMap<String, Instant>,
    ttl: Option<Duration>,
}

impl SuppressedIdSet {
    /// `ttl = None`: entries live until the session ends
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Returns false if the id was already suppressed
    pub fn insert(&mut self, order_id: impl Into<String>, now: Instant) -> bool {
        self.entries.insert(order_id.into(), now).is_none()
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.entries.contains_key(order_id)
    }

    pub fn remove(&mut self, order_id: &str) -> bool {
        self.entries.remove(order_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries older than the TTL; returns how many were dropped
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.entries.len();
        self.entries
            .retain(|_, inserted| now.saturating_duration_since(*inserted) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pure filter: pushed orders minus suppressed ids, push order kept
pub fn visible_orders(pushed: &[Order], suppressed: &SuppressedIdSet) -> Vec<Order> {
    pushed
        .iter()
        .filter(|o| !suppressed.contains(&o.id))
        .cloned()
        .collect()
}

struct ReconcileState {
    suppressed: SuppressedIdSet,
    /// Last fresh list from the push channel (replaced, never merged)
    fresh: Vec<Order>,
    connection: ConnectionState,
    push_count: u64,
    view: KitchenView,
}

/// Per-session reconciliation state
///
/// Every rebuild happens under one lock and publishes before releasing it,
/// so a push handled after a suppression always renders after it.
pub struct Reconciler {
    state: Mutex<ReconcileState>,
    lifecycle: Arc<OrderLifecycle>,
    on_update: Mutex<Option<UpdateCallback>>,
    view_tx: watch::Sender<KitchenView>,
}

impl Reconciler {
    pub fn new(lifecycle: Arc<OrderLifecycle>, suppression_ttl: Option<Duration>) -> Self {
        let (view_tx, _) = watch::channel(KitchenView::default());
        Self {
            state: Mutex::new(ReconcileState {
                suppressed: SuppressedIdSet::new(suppression_ttl),
                fresh: Vec::new(),
                connection: ConnectionState::Disconnected,
                push_count: 0,
                view: KitchenView::default(),
            }),
            lifecycle,
            on_update: Mutex::new(None),
            view_tx,
        }
    }

    /// Register the UI callback (replaces any previous one)
    pub fn set_on_update(&self, callback: Option<UpdateCallback>) {
        *self.on_update.lock() = callback;
    }

    /// Watch channel carrying the latest view
    pub fn watch(&self) -> watch::Receiver<KitchenView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> KitchenView {
        self.state.lock().view.clone()
    }

    pub fn visible(&self) -> Vec<Order> {
        self.state.lock().view.visible.clone()
    }

    pub fn is_suppressed(&self, order_id: &str) -> bool {
        self.state.lock().suppressed.contains(order_id)
    }

    /// Hide an order now and persist `completed` in the background
    ///
    /// The returned handle resolves when the background write settles; the
    /// view has already changed by the time this returns.
    pub fn suppress(&self, order_id: &str, operator: Operator) -> JoinHandle<()> {
        {
            let mut state = self.state.lock();
            if state.suppressed.insert(order_id, Instant::now()) {
                tracing::info!(order_id, operator = %operator.name, "Order dismissed from kitchen view");
            }
            self.rebuild(&mut state);
        }

        let lifecycle = self.lifecycle.clone();
        let order_id = order_id.to_string();
        tokio::spawn(async move {
            match lifecycle
                .force_complete(&order_id, ForcedCompletion::Dismissed, &operator, now_millis())
                .await
            {
                Ok(_) => tracing::debug!(order_id = %order_id, "Dismissal persisted"),
                Err(OrderError::InvalidTransition { from, .. }) => {
                    tracing::debug!(order_id = %order_id, status = %from, "Dismissed order already terminal");
                }
                Err(e) => log_stale_write(&order_id, &e),
            }
        })
    }

    /// Undo a single dismissal
    pub fn unsuppress(&self, order_id: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.suppressed.remove(order_id);
        if removed {
            tracing::info!(order_id, "Dismissal undone");
            self.rebuild(&mut state);
        }
        removed
    }

    /// Session reset
    pub fn unsuppress_all(&self) {
        let mut state = self.state.lock();
        state.suppressed.clear();
        self.rebuild(&mut state);
    }

    /// Replace the fresh list with a push (authoritative, never merged)
    pub(crate) fn replace_fresh(&self, fresh: Vec<Order>) -> KitchenView {
        let mut state = self.state.lock();
        state.fresh = fresh;
        state.push_count += 1;
        self.rebuild(&mut state);
        state.view.clone()
    }

    /// Move orders that aged past the threshold out of the fresh list
    pub(crate) fn evict_stale(&self, now_millis: i64, stale_after: Duration) -> Vec<Order> {
        let mut state = self.state.lock();
        let current = std::mem::take(&mut state.fresh);
        let (fresh, stale) = reaper::partition(current, now_millis, stale_after);
        state.fresh = fresh;
        if !stale.is_empty() {
            self.rebuild(&mut state);
        }
        stale
    }

    /// Ids in the current fresh list
    pub(crate) fn fresh_ids(&self) -> HashSet<String> {
        self.state.lock().fresh.iter().map(|o| o.id.clone()).collect()
    }

    pub(crate) fn set_connection(&self, connection: ConnectionState) {
        let mut state = self.state.lock();
        if state.connection != connection {
            state.connection = connection;
            self.rebuild(&mut state);
        }
    }

    /// Forget the previous subscription's push history
    pub(crate) fn reset_feed(&self) {
        let mut state = self.state.lock();
        state.push_count = 0;
        state.fresh.clear();
        self.rebuild(&mut state);
    }

    fn rebuild(&self, state: &mut ReconcileState) {
        let purged = state.suppressed.purge_expired(Instant::now());
        if purged > 0 {
            tracing::debug!(purged, "Expired dismissals dropped");
        }

        let visible = visible_orders(&state.fresh, &state.suppressed);
        state.view = KitchenView::build(
            visible,
            state.connection,
            state.push_count,
            state.suppressed.len(),
            now_millis(),
        );

        self.view_tx.send_replace(state.view.clone());
        if let Some(callback) = self.on_update.lock().as_ref() {
            callback(&state.view);
        }
    }
}

fn log_stale_write(order_id: &str, cause: &OrderError) {
    let err = OrderError::StaleWriteFailed {
        order_id: order_id.to_string(),
        reason: cause.to_string(),
    };
    tracing::warn!(error = %err, "Dismissal kept locally, status write failed");
}
