//! Shared types for the kitchen sync engine
//!
//! Domain and wire types used by every client session: orders, cart lines,
//! menu items, plus the unified error-code system.

pub mod error;
pub mod models;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{MenuItem, VariantGroup, VariantOption};
pub use order::{CartLine, Order, OrderOrigin, OrderStatus, PaymentInfo, StatusChange, VariantSelection};
