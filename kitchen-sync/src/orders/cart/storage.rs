//! redb-based durable cart slots
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `cart_slots` | `"{tenant_id}/{table_id}"` | `CartSlot` (JSON) | 每桌购物车草稿 |
//!
//! A slot is written after every successful cart mutation and removed when
//! the cart empties, so a restarted client can pick up where it left off.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::order::CartLine;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = "tenant/table", value = JSON-serialized CartSlot
const CART_SLOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cart_slots");

/// Persisted cart for one table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartSlot {
    pub tenant_id: String,
    pub table_id: String,
    pub lines: Vec<CartLine>,
    pub updated_at: i64,
}

/// Storage errors
#[derive(Debug, Error)]
pub enum CartStorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CartStorageResult<T> = Result<T, CartStorageError>;

fn slot_key(tenant_id: &str, table_id: &str) -> String {
    format!("{}/{}", tenant_id, table_id)
}

/// Cart slot storage backed by redb
#[derive(Clone)]
pub struct CartStorage {
    db: Arc<Database>,
}

impl CartStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> CartStorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, ephemeral sessions)
    pub fn open_in_memory() -> CartStorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> CartStorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CART_SLOTS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Write (or replace) a slot
    pub fn save_slot(&self, slot: &CartSlot) -> CartStorageResult<()> {
        let key = slot_key(&slot.tenant_id, &slot.table_id);
        let value = serde_json::to_vec(slot)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CART_SLOTS_TABLE)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn load_slot(&self, tenant_id: &str, table_id: &str) -> CartStorageResult<Option<CartSlot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CART_SLOTS_TABLE)?;
        match table.get(slot_key(tenant_id, table_id).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove_slot(&self, tenant_id: &str, table_id: &str) -> CartStorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CART_SLOTS_TABLE)?;
            table.remove(slot_key(tenant_id, table_id).as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// All slots belonging to a tenant (tables with an unsent draft)
    pub fn list_slots(&self, tenant_id: &str) -> CartStorageResult<Vec<CartSlot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CART_SLOTS_TABLE)?;
        let prefix = format!("{}/", tenant_id);

        let mut slots = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            if !key.value().starts_with(&prefix) {
                continue;
            }
            let slot: CartSlot = serde_json::from_slice(value.value())?;
            slots.push(slot);
        }
        slots.sort_by(|a, b| a.table_id.cmp(&b.table_id));
        Ok(slots)
    }
}
