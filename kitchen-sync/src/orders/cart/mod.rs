//! Cart Store - per (tenant, table) draft carts
//!
//! Single serialization point for cart mutations: both the UI and the
//! automation channel go through the same entry points, and each call is
//! atomic with respect to the in-memory cart (one lock, held for the whole
//! call including the durable write).
//!
//! # Mutation modes
//!
//! - [`MutationMode::Guarded`]: the caller supplies its current [`CartPhase`];
//!   the call is a no-op unless the phase accepts input.
//! - [`MutationMode::Forced`]: skips the phase guard and the variant
//!   selection check. Automation only.

pub mod storage;

use super::error::{OrderError, OrderResult, ValidationError};
use super::money;
use crate::utils::time::now_millis;
use parking_lot::Mutex;
use shared::models::MenuItem;
use shared::order::cart::line_key_for;
use shared::order::{CartLine, VariantSelection};
use std::collections::HashMap;
use storage::{CartSlot, CartStorage};

/// Identifies one cart
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub tenant_id: String,
    pub table_id: String,
}

impl CartKey {
    pub fn new(tenant_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl std::fmt::Display for CartKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.table_id)
    }
}

/// UI phase of a table's ordering flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CartPhase {
    /// No ordering in progress
    #[default]
    Idle,
    /// Building the first order of a table
    NewOrder,
    /// Building an amendment for an occupied table
    AddingMore,
    /// Review / checkout screens; the cart is read-only
    Locked,
}

impl CartPhase {
    pub fn accepts_input(&self) -> bool {
        matches!(self, CartPhase::NewOrder | CartPhase::AddingMore)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMode {
    Guarded(CartPhase),
    Forced,
}

impl MutationMode {
    fn is_forced(&self) -> bool {
        matches!(self, MutationMode::Forced)
    }

    /// Some(phase) when the guard rejects the call
    fn rejected_phase(&self) -> Option<CartPhase> {
        match self {
            MutationMode::Guarded(phase) if !phase.accepts_input() => Some(*phase),
            _ => None,
        }
    }
}

/// Result of a cart mutation
#[derive(Debug, Clone, PartialEq)]
pub enum CartOutcome {
    /// Mutation applied; current lines
    Applied(Vec<CartLine>),
    /// Guard rejected the call; cart unchanged
    Rejected { phase: CartPhase, lines: Vec<CartLine> },
    /// Item needs variant selections; re-invoke with them
    SelectionRequired { item_id: String, groups: Vec<String> },
}

impl CartOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CartOutcome::Applied(_))
    }

    /// Lines after the call; a missing selection becomes a validation error
    pub fn into_lines(self) -> OrderResult<Vec<CartLine>> {
        match self {
            CartOutcome::Applied(lines) | CartOutcome::Rejected { lines, .. } => Ok(lines),
            CartOutcome::SelectionRequired { item_id, groups } => {
                Err(ValidationError::SelectionRequired { item_id, groups }.into())
            }
        }
    }
}

/// Draft carts for every table of this session
pub struct CartStore {
    carts: Mutex<HashMap<CartKey, Vec<CartLine>>>,
    storage: CartStorage,
}

impl CartStore {
    pub fn new(storage: CartStorage) -> Self {
        Self {
            carts: Mutex::new(HashMap::new()),
            storage,
        }
    }

    /// Add `quantity` of `item`, merging into an existing line with the same key
    pub fn add_line(
        &self,
        key: &CartKey,
        item: &MenuItem,
        quantity: i32,
        selections: Vec<VariantSelection>,
        mode: MutationMode,
    ) -> OrderResult<CartOutcome> {
        money::validate_quantity(quantity)?;
        money::validate_price(item.price, selections.iter().map(|s| s.price_modifier))?;

        let mut carts = self.carts.lock();
        let current = carts.get(key).cloned().unwrap_or_default();

        if let Some(phase) = mode.rejected_phase() {
            tracing::debug!(cart = %key, ?phase, item_id = %item.id, "Cart guard rejected add");
            return Ok(CartOutcome::Rejected {
                phase,
                lines: current,
            });
        }

        if !mode.is_forced() {
            let missing: Vec<String> = item
                .required_groups()
                .filter(|g| !selections.iter().any(|s| s.group_id == g.id))
                .map(|g| g.name.clone())
                .collect();
            if !missing.is_empty() {
                return Ok(CartOutcome::SelectionRequired {
                    item_id: item.id.clone(),
                    groups: missing,
                });
            }
        }

        let mut lines = current;
        let line_key = line_key_for(&item.id, &selections);
        match lines.iter_mut().find(|l| l.line_key() == line_key) {
            Some(line) => {
                let merged = line.quantity.saturating_add(quantity);
                money::validate_quantity(merged)?;
                line.quantity = merged;
                money::recalculate_line(line);
            }
            None => {
                let mut line = CartLine {
                    item_id: item.id.clone(),
                    name: item.name.clone(),
                    unit_price: item.price,
                    quantity,
                    total: 0.0,
                    variant_selections: selections,
                    note: None,
                };
                money::recalculate_line(&mut line);
                lines.push(line);
            }
        }

        self.commit(&mut carts, key, lines)
    }

    /// Set a line's quantity; `quantity <= 0` removes the line
    pub fn update_quantity(
        &self,
        key: &CartKey,
        line_key: &str,
        quantity: i32,
        mode: MutationMode,
    ) -> OrderResult<CartOutcome> {
        if quantity > money::MAX_QUANTITY {
            return Err(ValidationError::InvalidQuantity(quantity).into());
        }

        let mut carts = self.carts.lock();
        let mut lines = carts.get(key).cloned().unwrap_or_default();

        if let Some(phase) = mode.rejected_phase() {
            return Ok(CartOutcome::Rejected { phase, lines });
        }

        let Some(pos) = lines.iter().position(|l| l.line_key() == line_key) else {
            return Err(OrderError::validation(format!("line {} is not in the cart", line_key)));
        };

        if quantity <= 0 {
            lines.remove(pos);
        } else {
            let line = &mut lines[pos];
            line.quantity = quantity;
            money::recalculate_line(line);
        }

        self.commit(&mut carts, key, lines)
    }

    pub fn remove_line(
        &self,
        key: &CartKey,
        line_key: &str,
        mode: MutationMode,
    ) -> OrderResult<CartOutcome> {
        let mut carts = self.carts.lock();
        let mut lines = carts.get(key).cloned().unwrap_or_default();

        if let Some(phase) = mode.rejected_phase() {
            return Ok(CartOutcome::Rejected { phase, lines });
        }

        lines.retain(|l| l.line_key() != line_key);
        self.commit(&mut carts, key, lines)
    }

    /// Explicit cancel of the draft
    pub fn clear(&self, key: &CartKey, mode: MutationMode) -> OrderResult<CartOutcome> {
        let mut carts = self.carts.lock();
        if let Some(phase) = mode.rejected_phase() {
            let lines = carts.get(key).cloned().unwrap_or_default();
            return Ok(CartOutcome::Rejected { phase, lines });
        }
        self.commit(&mut carts, key, Vec::new())
    }

    pub fn list(&self, key: &CartKey) -> Vec<CartLine> {
        self.carts.lock().get(key).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self, key: &CartKey) -> bool {
        self.carts.lock().get(key).is_none_or(|lines| lines.is_empty())
    }

    pub fn subtotal(&self, key: &CartKey) -> f64 {
        money::subtotal(&self.list(key))
    }

    /// Reload a table's draft from its durable slot (after a restart)
    pub fn restore(&self, key: &CartKey) -> OrderResult<Vec<CartLine>> {
        let lines = self
            .storage
            .load_slot(&key.tenant_id, &key.table_id)?
            .map(|slot| slot.lines)
            .unwrap_or_default();

        let mut carts = self.carts.lock();
        if lines.is_empty() {
            carts.remove(key);
        } else {
            tracing::info!(cart = %key, lines = lines.len(), "Restored cart draft");
            carts.insert(key.clone(), lines.clone());
        }
        Ok(lines)
    }

    /// Tables of a tenant that have an unsent draft on disk
    pub fn drafts(&self, tenant_id: &str) -> OrderResult<Vec<CartSlot>> {
        Ok(self.storage.list_slots(tenant_id)?)
    }

    /// Direct write bypassing guard and merge logic (automation correction)
    pub(crate) fn overwrite(&self, key: &CartKey, lines: Vec<CartLine>) -> OrderResult<Vec<CartLine>> {
        let mut carts = self.carts.lock();
        tracing::warn!(cart = %key, lines = lines.len(), "Direct cart overwrite");
        self.commit(&mut carts, key, lines)?.into_lines()
    }

    /// Subtract a submitted snapshot from the cart
    ///
    /// Lines added (or quantities raised) while the submission was in flight
    /// stay in the cart.
    pub(crate) fn remove_submitted(&self, key: &CartKey, submitted: &[CartLine]) -> OrderResult<Vec<CartLine>> {
        let mut carts = self.carts.lock();
        let mut lines = carts.get(key).cloned().unwrap_or_default();

        for sent in submitted {
            let sent_key = sent.line_key();
            if let Some(pos) = lines.iter().position(|l| l.line_key() == sent_key) {
                let remaining = lines[pos].quantity - sent.quantity;
                if remaining <= 0 {
                    lines.remove(pos);
                } else {
                    lines[pos].quantity = remaining;
                    money::recalculate_line(&mut lines[pos]);
                }
            }
        }

        self.commit(&mut carts, key, lines)?.into_lines()
    }

    /// Persist then publish; on a storage failure the in-memory cart is untouched
    fn commit(
        &self,
        carts: &mut HashMap<CartKey, Vec<CartLine>>,
        key: &CartKey,
        lines: Vec<CartLine>,
    ) -> OrderResult<CartOutcome> {
        if lines.is_empty() {
            self.storage.remove_slot(&key.tenant_id, &key.table_id)?;
            carts.remove(key);
        } else {
            self.storage.save_slot(&CartSlot {
                tenant_id: key.tenant_id.clone(),
                table_id: key.table_id.clone(),
                lines: lines.clone(),
                updated_at: now_millis(),
            })?;
            carts.insert(key.clone(), lines.clone());
        }
        Ok(CartOutcome::Applied(lines))
    }
}
