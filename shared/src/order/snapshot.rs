//! Order - the persisted result of a cart submission
//!
//! Line contents never change after creation (amendments are new orders
//! against the same table). Status is the only field advanced afterwards,
//! and every advance appends to `history`.

use super::cart::CartLine;
use super::types::{OrderOrigin, PaymentInfo, StatusChange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status
///
/// Declaration order is the lifecycle order of the active subset:
/// `Placed < Confirmed < Preparing < Ready < Completed`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Placed,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Non-terminal statuses, in lifecycle order
    pub const ACTIVE: [OrderStatus; 4] = [
        OrderStatus::Placed,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ];

    /// `Completed` and `Cancelled` are never re-activated
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Order ID (assigned by the store)
    pub id: String,
    pub tenant_id: String,
    /// Per-tenant sequence number generated atomically on create
    pub sequence_number: u64,
    /// Table ID (None for portal orders without a table)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    #[serde(default)]
    pub origin: OrderOrigin,
    pub status: OrderStatus,
    pub lines: Vec<CartLine>,
    pub subtotal: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub discount: f64,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    /// "Adding more" order placed against an already occupied table
    #[serde(default)]
    pub is_amendment: bool,
    /// Status history (append-only)
    #[serde(default)]
    pub history: Vec<StatusChange>,
    /// Creation timestamp (Unix millis)
    pub created_at: i64,
    /// Last update timestamp (Unix millis)
    pub updated_at: i64,
}

impl Order {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Age relative to `now_millis`, never negative
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        (now_millis - self.created_at).max(0)
    }

    /// Total quantity across all lines
    pub fn item_count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}
