//! Menu Item Model

use serde::{Deserialize, Serialize};

/// Menu item entity (what a cart line is created from)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    /// Base unit price
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Variant groups (size, spice level, ...)
    #[serde(default)]
    pub variant_groups: Vec<VariantGroup>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

/// A group of mutually exclusive options, e.g. "Size"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantGroup {
    pub id: String,
    pub name: String,
    /// Caller must pick one option before the item can enter a cart
    #[serde(default)]
    pub required: bool,
    pub options: Vec<VariantOption>,
}

/// One option within a [`VariantGroup`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantOption {
    pub name: String,
    /// Additive per-unit price modifier
    #[serde(default)]
    pub price_modifier: f64,
}

impl MenuItem {
    /// Create a plain item without variants
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            category: None,
            variant_groups: Vec::new(),
            is_available: true,
        }
    }

    /// Builder-style helper to attach a variant group
    pub fn with_variant_group(mut self, group: VariantGroup) -> Self {
        self.variant_groups.push(group);
        self
    }

    /// Groups the caller must choose from
    pub fn required_groups(&self) -> impl Iterator<Item = &VariantGroup> {
        self.variant_groups.iter().filter(|g| g.required)
    }
}
