//! In-memory menu catalog, one menu per tenant

use crate::orders::error::OrderResult;
use crate::orders::traits::MenuCatalog;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::MenuItem;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    menus: RwLock<HashMap<String, Vec<MenuItem>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_menu(self, tenant_id: impl Into<String>, items: Vec<MenuItem>) -> Self {
        self.set_menu(tenant_id, items);
        self
    }

    /// Replace a tenant's menu
    pub fn set_menu(&self, tenant_id: impl Into<String>, items: Vec<MenuItem>) {
        self.menus.write().insert(tenant_id.into(), items);
    }

    /// Toggle availability; returns false if the item is unknown
    pub fn set_available(&self, tenant_id: &str, item_id: &str, available: bool) -> bool {
        let mut menus = self.menus.write();
        let Some(item) = menus
            .get_mut(tenant_id)
            .and_then(|items| items.iter_mut().find(|i| i.id == item_id))
        else {
            return false;
        };
        item.is_available = available;
        true
    }

    pub fn get(&self, tenant_id: &str, item_id: &str) -> Option<MenuItem> {
        self.menus
            .read()
            .get(tenant_id)?
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
    }
}

#[async_trait]
impl MenuCatalog for MemoryCatalog {
    async fn menu_items(&self, tenant_id: &str) -> OrderResult<Vec<MenuItem>> {
        Ok(self.menus.read().get(tenant_id).cloned().unwrap_or_default())
    }
}
