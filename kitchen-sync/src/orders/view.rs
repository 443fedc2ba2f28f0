//! Kitchen display view model
//!
//! Everything here is derived from the visible order list; nothing feeds
//! back into the state machine.

use serde::Serialize;
use shared::order::{Order, OrderOrigin, OrderStatus};
use std::collections::BTreeMap;

/// Push channel connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Visible orders split by where they were entered
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KitchenLanes {
    pub staff: Vec<Order>,
    pub portal: Vec<Order>,
}

impl KitchenLanes {
    pub fn partition(orders: &[Order]) -> Self {
        let (portal, staff) = orders
            .iter()
            .cloned()
            .partition(|o| o.origin == OrderOrigin::Portal);
        Self { staff, portal }
    }
}

/// Aggregate counters for the header bar
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderStats {
    pub total_active: usize,
    pub count_by_status: BTreeMap<OrderStatus, usize>,
    pub oldest_order_age_ms: Option<i64>,
}

impl OrderStats {
    pub fn compute(orders: &[Order], now_millis: i64) -> Self {
        let mut count_by_status = BTreeMap::new();
        for order in orders {
            *count_by_status.entry(order.status).or_insert(0) += 1;
        }
        Self {
            total_active: orders.len(),
            count_by_status,
            oldest_order_age_ms: orders.iter().map(|o| o.age_millis(now_millis)).max(),
        }
    }

    pub fn count(&self, status: OrderStatus) -> usize {
        self.count_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// What the kitchen display renders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KitchenView {
    pub visible: Vec<Order>,
    pub lanes: KitchenLanes,
    pub stats: OrderStats,
    pub connection: ConnectionState,
    /// Pushes processed since subscribing
    pub push_count: u64,
    pub suppressed_count: usize,
}

impl KitchenView {
    pub fn build(
        visible: Vec<Order>,
        connection: ConnectionState,
        push_count: u64,
        suppressed_count: usize,
        now_millis: i64,
    ) -> Self {
        Self {
            lanes: KitchenLanes::partition(&visible),
            stats: OrderStats::compute(&visible, now_millis),
            visible,
            connection,
            push_count,
            suppressed_count,
        }
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.visible.iter().any(|o| o.id == order_id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.visible.iter().map(|o| o.id.as_str()).collect()
    }
}
