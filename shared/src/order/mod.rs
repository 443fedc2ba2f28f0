//! Order lifecycle types
//!
//! - Cart lines: draft line items owned by a table's cart
//! - Orders: persisted, immutable line contents, status-only mutation
//! - Status history and payment records attached to an order

pub mod cart;
pub mod snapshot;
pub mod types;

// Re-exports
pub use cart::CartLine;
pub use snapshot::{Order, OrderStatus};
pub use types::*;
