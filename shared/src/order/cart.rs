//! Cart line - a draft line item before submission

use super::types::VariantSelection;
use serde::{Deserialize, Serialize};

/// Draft line item held by a table's cart
///
/// `total` is always `(unit_price + Σ price_modifier) × quantity`; the engine
/// recomputes it on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub item_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variant_selections: Vec<VariantSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CartLine {
    /// Key identifying this line within one cart
    ///
    /// Lines without variants are keyed by `item_id` alone, so adding the
    /// same item again merges quantities. Lines with variants append a
    /// content hash of the selections, so "Lassi (Large)" and
    /// "Lassi (Small)" stay separate lines.
    pub fn line_key(&self) -> String {
        line_key_for(&self.item_id, &self.variant_selections)
    }

    /// Sum of per-unit variant modifiers
    pub fn modifier_per_unit(&self) -> f64 {
        self.variant_selections.iter().map(|v| v.price_modifier).sum()
    }

    pub fn has_variants(&self) -> bool {
        !self.variant_selections.is_empty()
    }
}

/// Compute the line key for an item and its selections
pub fn line_key_for(item_id: &str, selections: &[VariantSelection]) -> String {
    if selections.is_empty() {
        return item_id.to_string();
    }
    format!("{}#{}", item_id, variant_signature(selections))
}

/// Content-addressed signature of a set of variant selections
///
/// Order-independent: selections are sorted by group before hashing.
fn variant_signature(selections: &[VariantSelection]) -> String {
    use sha2::{Digest, Sha256};

    let mut parts: Vec<(&str, &str)> = selections
        .iter()
        .map(|s| (s.group_id.as_str(), s.option_name.as_str()))
        .collect();
    parts.sort_unstable();

    let mut hasher = Sha256::new();
    for (group, option) in parts {
        hasher.update(group.as_bytes());
        hasher.update([0u8]);
        hasher.update(option.as_bytes());
        hasher.update([0xffu8]);
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
