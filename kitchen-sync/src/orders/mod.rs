//! Order lifecycle and kitchen sync
//!
//! - **cart**: per-table draft carts with phase guard and redb-backed slots
//! - **state_machine**: legal status edges, payment and cancel rules
//! - **submission**: cart -> persisted order, single-flight per table
//! - **lifecycle**: status transitions against the order store
//! - **stream / reconcile / reaper**: live kitchen view over pushed snapshots
//! - **automation**: forced mutations with verify-then-correct
//!
//! # Data Flow
//!
//! ```text
//! CartStore ──► SubmissionPipeline ──► OrderStore
//!                                         │ push
//!                                         ▼
//!            Reconciler ◄── ActiveOrderStream ──► StaleOrderReaper
//!                │
//!                ▼
//!           KitchenView (watch)
//! ```

pub mod automation;
pub mod cart;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod reaper;
pub mod reconcile;
pub mod state_machine;
pub mod stream;
pub mod submission;
pub mod traits;
pub mod view;

// Re-exports
pub use automation::{AddedItem, AutomationChannel, AutomationFailure, AutomationResult};
pub use cart::{CartKey, CartOutcome, CartPhase, CartStore, MutationMode};
pub use error::{OrderError, OrderResult, ValidationError};
pub use lifecycle::OrderLifecycle;
pub use reaper::StaleOrderReaper;
pub use reconcile::{Reconciler, SuppressedIdSet, UpdateCallback};
pub use state_machine::{PaymentInput, TransitionContext, can_transition, next_status};
pub use stream::{ActiveOrderStream, Subscription};
pub use submission::{SubmissionPipeline, SubmitContext};
pub use traits::{
    ActiveOrderTransport, CouponGrant, CouponService, FeedMessage, MenuCatalog, Notification,
    Notifier, Operator, OrderDraft, OrderStore, StatusUpdate, TableLink, TicketKind, TicketPrinter,
};
pub use view::{ConnectionState, KitchenLanes, KitchenView, OrderStats};

// Re-export shared types for convenience
pub use shared::order::{CartLine, Order, OrderOrigin, OrderStatus};
