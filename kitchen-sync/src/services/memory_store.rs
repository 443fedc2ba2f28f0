//! In-memory order store with a live active-order push
//!
//! Every change re-sends the tenant's full active set to each open
//! subscription, the same shape a real-time backend delivers.

use crate::orders::error::{OrderError, OrderResult};
use crate::orders::traits::{
    ActiveOrderTransport, FeedMessage, OrderDraft, OrderStore, StatusUpdate, TableLink,
};
use crate::utils::time::now_millis;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared::order::Order;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<String, Order>,
    /// tenant -> last issued sequence number
    sequences: DashMap<String, u64>,
    subscribers: DashMap<String, Vec<mpsc::UnboundedSender<FeedMessage>>>,
    /// (tenant, table) -> order ids, oldest first
    table_orders: DashMap<(String, String), Vec<String>>,
    create_delay: Mutex<Option<Duration>>,
    fail_creates: AtomicBool,
    fail_status_updates: AtomicBool,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `create_order` (simulates a slow backend)
    pub fn set_create_delay(&self, delay: Option<Duration>) {
        *self.create_delay.lock() = delay;
    }

    /// Make every `create_order` fail with a transport error
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make every `update_status` fail with a transport error
    pub fn set_fail_status_updates(&self, fail: bool) {
        self.fail_status_updates.store(fail, Ordering::SeqCst);
    }

    /// Insert an order as-is and push the new active set
    pub fn insert_order(&self, order: Order) {
        let tenant_id = order.tenant_id.clone();
        self.orders.insert(order.id.clone(), order);
        self.broadcast(&tenant_id);
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|o| o.clone())
    }

    /// Order ids linked to a table, oldest first
    pub fn table_orders(&self, tenant_id: &str, table_id: &str) -> Vec<String> {
        self.table_orders
            .get(&(tenant_id.to_string(), table_id.to_string()))
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, tenant_id: &str) -> usize {
        self.subscribers.get(tenant_id).map_or(0, |s| s.len())
    }

    /// Drop every subscription of a tenant after a `Disconnected` message
    pub fn disconnect(&self, tenant_id: &str, reason: &str) {
        if let Some((_, senders)) = self.subscribers.remove(tenant_id) {
            tracing::debug!(tenant_id, count = senders.len(), "Disconnecting subscribers");
            for tx in senders {
                let _ = tx.send(FeedMessage::Disconnected(reason.to_string()));
            }
        }
    }

    fn next_sequence(&self, tenant_id: &str) -> u64 {
        let mut entry = self.sequences.entry(tenant_id.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn active_snapshot(&self, tenant_id: &str) -> Vec<Order> {
        let mut active: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.tenant_id == tenant_id && o.is_active())
            .map(|o| o.clone())
            .collect();
        active.sort_by_key(|o| o.sequence_number);
        active
    }

    fn broadcast(&self, tenant_id: &str) {
        let snapshot = self.active_snapshot(tenant_id);
        if let Some(mut senders) = self.subscribers.get_mut(tenant_id) {
            senders.retain(|tx| tx.send(FeedMessage::Snapshot(snapshot.clone())).is_ok());
        }
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_order(&self, draft: OrderDraft) -> OrderResult<Order> {
        let delay = *self.create_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(OrderError::transport("order backend unavailable"));
        }

        let now = now_millis();
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            sequence_number: self.next_sequence(&draft.tenant_id),
            tenant_id: draft.tenant_id,
            table_id: draft.table_id,
            origin: draft.origin,
            status: Default::default(),
            lines: draft.lines,
            subtotal: draft.subtotal,
            tax: draft.tax,
            discount: draft.discount,
            total: draft.total,
            payment: None,
            notes: draft.notes,
            cancel_reason: None,
            is_amendment: draft.is_amendment,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(order_id = %order.id, seq = order.sequence_number, by = %draft.created_by.name, "Order stored");

        self.insert_order(order.clone());
        Ok(order)
    }

    async fn update_status(&self, update: StatusUpdate) -> OrderResult<Order> {
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(OrderError::transport(format!(
                "status update for {} rejected by backend",
                update.order_id
            )));
        }

        let saved = {
            let mut order = self
                .orders
                .get_mut(&update.order_id)
                .ok_or_else(|| OrderError::OrderNotFound(update.order_id.clone()))?;
            if order.status != update.expected {
                return Err(OrderError::InvalidTransition {
                    from: order.status,
                    to: update.status,
                });
            }
            let at = update.change.at;
            order.status = update.status;
            order.history.push(update.change);
            if update.payment.is_some() {
                order.payment = update.payment;
            }
            if update.cancel_reason.is_some() {
                order.cancel_reason = update.cancel_reason;
            }
            order.updated_at = at;
            order.clone()
        };

        self.broadcast(&saved.tenant_id);
        Ok(saved)
    }

    async fn get_order(&self, order_id: &str) -> OrderResult<Option<Order>> {
        Ok(self.order(order_id))
    }

    async fn active_orders(&self, tenant_id: &str) -> OrderResult<Vec<Order>> {
        Ok(self.active_snapshot(tenant_id))
    }

    async fn link_table_order(
        &self,
        tenant_id: &str,
        table_id: &str,
        order_id: &str,
        link: TableLink,
    ) -> OrderResult<()> {
        let mut ids = self
            .table_orders
            .entry((tenant_id.to_string(), table_id.to_string()))
            .or_default();
        if link == TableLink::Occupy {
            ids.clear();
        }
        ids.push(order_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl ActiveOrderTransport for MemoryOrderStore {
    async fn open(&self, tenant_id: &str) -> OrderResult<mpsc::UnboundedReceiver<FeedMessage>> {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(FeedMessage::Connected).map_err(OrderError::transport)?;
        // register before taking the snapshot so no change falls in between
        self.subscribers
            .entry(tenant_id.to_string())
            .or_default()
            .push(tx.clone());
        tx.send(FeedMessage::Snapshot(self.active_snapshot(tenant_id)))
            .map_err(OrderError::transport)?;
        tracing::debug!(tenant_id, "Active order subscription opened");
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::traits::Operator;
    use shared::order::{OrderOrigin, OrderStatus, StatusChange};

    fn draft(tenant: &str) -> OrderDraft {
        OrderDraft {
            tenant_id: tenant.into(),
            table_id: Some("T1".into()),
            origin: OrderOrigin::Staff,
            lines: vec![],
            subtotal: 10.0,
            tax: 0.0,
            discount: 0.0,
            total: 10.0,
            notes: None,
            is_amendment: false,
            created_by: Operator::new("u-1", "Asha"),
        }
    }

    fn change(from: OrderStatus, to: OrderStatus) -> StatusChange {
        StatusChange {
            from,
            to,
            at: 42,
            operator_id: "u-1".into(),
            operator_name: "Asha".into(),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_sequence_per_tenant() {
        let store = MemoryOrderStore::new();
        let a1 = store.create_order(draft("a")).await.unwrap();
        let a2 = store.create_order(draft("a")).await.unwrap();
        let b1 = store.create_order(draft("b")).await.unwrap();
        assert_eq!((a1.sequence_number, a2.sequence_number), (1, 2));
        assert_eq!(b1.sequence_number, 1);
        assert_eq!(a1.status, OrderStatus::Placed);
    }

    #[tokio::test]
    async fn test_update_status_appends_history() {
        let store = MemoryOrderStore::new();
        let order = store.create_order(draft("a")).await.unwrap();
        let saved = store
            .update_status(StatusUpdate {
                order_id: order.id.clone(),
                expected: OrderStatus::Placed,
                status: OrderStatus::Confirmed,
                change: change(OrderStatus::Placed, OrderStatus::Confirmed),
                payment: None,
                cancel_reason: None,
            })
            .await
            .unwrap();
        assert_eq!(saved.status, OrderStatus::Confirmed);
        assert_eq!(saved.history.len(), 1);
        assert_eq!(saved.updated_at, 42);

        store.set_fail_status_updates(true);
        let err = store
            .update_status(StatusUpdate {
                order_id: order.id,
                expected: OrderStatus::Confirmed,
                status: OrderStatus::Preparing,
                change: change(OrderStatus::Confirmed, OrderStatus::Preparing),
                payment: None,
                cancel_reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Transport(_)));
    }

    #[tokio::test]
    async fn test_update_status_rejects_moved_order() {
        let store = MemoryOrderStore::new();
        let order = store.create_order(draft("a")).await.unwrap();
        store
            .update_status(StatusUpdate {
                order_id: order.id.clone(),
                expected: OrderStatus::Placed,
                status: OrderStatus::Cancelled,
                change: change(OrderStatus::Placed, OrderStatus::Cancelled),
                payment: None,
                cancel_reason: Some("guest left".into()),
            })
            .await
            .unwrap();

        // computed from the stale `Placed` copy
        let err = store
            .update_status(StatusUpdate {
                order_id: order.id.clone(),
                expected: OrderStatus::Placed,
                status: OrderStatus::Completed,
                change: change(OrderStatus::Placed, OrderStatus::Completed),
                payment: None,
                cancel_reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Completed
            }
        ));
        let stored = store.order(&order.id).unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(stored.history.len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_receives_pushes() {
        let store = MemoryOrderStore::new();
        let mut rx = store.open("a").await.unwrap();
        assert!(matches!(rx.recv().await, Some(FeedMessage::Connected)));
        assert!(matches!(rx.recv().await, Some(FeedMessage::Snapshot(v)) if v.is_empty()));

        store.create_order(draft("a")).await.unwrap();
        store.create_order(draft("b")).await.unwrap();
        match rx.recv().await {
            Some(FeedMessage::Snapshot(orders)) => assert_eq!(orders.len(), 1),
            other => panic!("expected snapshot, got {:?}", other),
        }

        store.disconnect("a", "maintenance");
        assert!(matches!(rx.recv().await, Some(FeedMessage::Disconnected(_))));
        assert!(rx.recv().await.is_none());
        assert_eq!(store.subscriber_count("a"), 0);
    }

    #[tokio::test]
    async fn test_table_links() {
        let store = MemoryOrderStore::new();
        store.link_table_order("a", "T1", "o1", TableLink::Occupy).await.unwrap();
        store.link_table_order("a", "T1", "o2", TableLink::Append).await.unwrap();
        assert_eq!(store.table_orders("a", "T1"), vec!["o1", "o2"]);
        store.link_table_order("a", "T1", "o3", TableLink::Occupy).await.unwrap();
        assert_eq!(store.table_orders("a", "T1"), vec!["o3"]);
    }
}
