//! 外部协作者抽象
//!
//! The engine never talks to a database, printer or push channel directly.
//! Every side effect goes through one of these traits so sessions can be
//! wired against the real backend or the in-memory services.
//!
//! ```text
//!   SubmissionPipeline ──► OrderStore ──► ActiveOrderTransport ──► ActiveOrderStream
//!          │                                                          │
//!          └──► TicketPrinter                        Notifier ◄───────┘
//! ```

use super::error::OrderResult;
use async_trait::async_trait;
use shared::models::MenuItem;
use shared::order::{CartLine, Order, OrderOrigin, OrderStatus, PaymentInfo, StatusChange};
use tokio::sync::mpsc;

// ============================================================================
// Order store
// ============================================================================

/// Everything the store needs to persist a new order
///
/// Sequence number, id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub tenant_id: String,
    pub table_id: Option<String>,
    pub origin: OrderOrigin,
    pub lines: Vec<CartLine>,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
    pub notes: Option<String>,
    pub is_amendment: bool,
    pub created_by: Operator,
}

/// Authenticated operator performing a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub id: String,
    pub name: String,
}

impl Operator {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Identity used by automation and background writes
    pub fn automation() -> Self {
        Self::new("system:automation", "Automation")
    }
}

/// A status write: new status + history entry (+ payment for completion)
///
/// Compare-and-set: applied only while the stored status is still `expected`.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order_id: String,
    /// Status the write was computed from
    pub expected: OrderStatus,
    pub status: OrderStatus,
    pub change: StatusChange,
    pub payment: Option<PaymentInfo>,
    pub cancel_reason: Option<String>,
}

/// How an order attaches to its table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLink {
    /// First order on the table: mark it occupied
    Occupy,
    /// "Adding more" to an occupied table
    Append,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order; sequence number generated atomically per tenant
    async fn create_order(&self, draft: OrderDraft) -> OrderResult<Order>;

    /// Update status and append the history entry in one write
    ///
    /// Fails with `InvalidTransition` when the stored status no longer
    /// equals `update.expected`; nothing is written in that case.
    async fn update_status(&self, update: StatusUpdate) -> OrderResult<Order>;

    async fn get_order(&self, order_id: &str) -> OrderResult<Option<Order>>;

    /// Non-terminal orders of a tenant
    async fn active_orders(&self, tenant_id: &str) -> OrderResult<Vec<Order>>;

    /// Record the table <-> order association
    async fn link_table_order(
        &self,
        tenant_id: &str,
        table_id: &str,
        order_id: &str,
        link: TableLink,
    ) -> OrderResult<()>;
}

// ============================================================================
// Active order push channel
// ============================================================================

/// Messages delivered by the push channel, in delivery order
#[derive(Debug, Clone)]
pub enum FeedMessage {
    Connected,
    /// Full current set of non-terminal orders for the tenant
    Snapshot(Vec<Order>),
    Disconnected(String),
}

#[async_trait]
pub trait ActiveOrderTransport: Send + Sync {
    /// Open a subscription; the channel closes when the transport goes away
    async fn open(&self, tenant_id: &str) -> OrderResult<mpsc::UnboundedReceiver<FeedMessage>>;
}

// ============================================================================
// Printing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketKind {
    /// Kitchen ticket after submission
    Kitchen,
    /// Customer receipt after payment
    Receipt,
}

#[async_trait]
pub trait TicketPrinter: Send + Sync {
    async fn print_ticket(&self, order: &Order, kind: TicketKind) -> OrderResult<()>;
}

// ============================================================================
// Notifications
// ============================================================================

/// Operator-facing notifications
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// New fresh orders arrived after the first push
    NewOrders {
        tenant_id: String,
        delta: usize,
        order_ids: Vec<String>,
    },
    TransitionApplied {
        order_id: String,
        status: OrderStatus,
    },
    TransitionFailed {
        order_id: String,
        message: String,
    },
    /// Automation gave up; a human has to finish the action
    ManualActionRequired { message: String },
}

/// Fire-and-forget; implementations must not block
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

// ============================================================================
// Payments / coupons
// ============================================================================

/// What a validated coupon grants
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouponGrant {
    /// Amount off the order total
    pub discount: f64,
    /// Items added at zero price
    pub free_items: Vec<MenuItem>,
}

#[async_trait]
pub trait CouponService: Send + Sync {
    /// Validate and consume a coupon; `Err(CouponRejected)` leaves it unused
    async fn validate_and_consume(
        &self,
        tenant_id: &str,
        code: &str,
        subtotal: f64,
    ) -> OrderResult<CouponGrant>;

    /// Return a use taken by `validate_and_consume` when the order it was
    /// meant for was never created
    async fn release(&self, tenant_id: &str, code: &str) -> OrderResult<()>;
}

// ============================================================================
// Menu
// ============================================================================

#[async_trait]
pub trait MenuCatalog: Send + Sync {
    async fn menu_items(&self, tenant_id: &str) -> OrderResult<Vec<MenuItem>>;
}
