//! Supporting types for orders and cart lines

use super::snapshot::OrderStatus;
use serde::{Deserialize, Serialize};

// ============================================================================
// Variant Selection
// ============================================================================

/// A chosen option for one of a menu item's variant groups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantSelection {
    pub group_id: String,
    pub group_name: String,
    pub option_name: String,
    /// Additive per-unit price modifier
    #[serde(default)]
    pub price_modifier: f64,
}

// ============================================================================
// Origin
// ============================================================================

/// Where an order was entered
///
/// Used only to split the kitchen view into display lanes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderOrigin {
    /// Entered by staff at a table
    #[default]
    Staff,
    /// Placed by a guest through the self-service portal
    Portal,
}

// ============================================================================
// Payment
// ============================================================================

/// Payment record attached when an order completes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInfo {
    /// "cash", "card", "upi", ...
    pub method: String,
    pub amount_received: f64,
    /// Order total at the moment of payment
    pub final_total: f64,
    /// amount_received - final_total (never negative)
    pub change: f64,
    pub paid_at: i64,
}

// ============================================================================
// Status History
// ============================================================================

/// One entry of an order's status history (append-only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Unix millis
    pub at: i64,
    pub operator_id: String,
    pub operator_name: String,
    /// Free-form annotation (cancel reason, computed age of a reaped order, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
