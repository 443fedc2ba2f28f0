//! Data models
//!
//! Catalog entities the engine reads but never writes. Persistence and
//! querying of these live with the backend collaborator.

pub mod menu_item;

// Re-exports
pub use menu_item::*;
