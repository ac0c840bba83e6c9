//! Item-id lookups built from the catalog snapshot.

use crate::types::{Item, UNKNOWN_CATEGORY};
use std::collections::HashMap;

/// Lookup from item barcode to category and shelf price.
///
/// Total over all keys: unknown ids resolve to [`UNKNOWN_CATEGORY`].
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    entries: HashMap<String, CatalogEntry>,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    category: String,
    price: f64,
}

impl CategoryIndex {
    /// Build the index in one pass. A repeated id keeps the last record.
    pub fn build(items: &[Item]) -> Self {
        let mut entries = HashMap::with_capacity(items.len());
        for item in items {
            entries.insert(
                item.id.clone(),
                CatalogEntry {
                    category: item.category().to_string(),
                    price: item.price,
                },
            );
        }
        Self { entries }
    }

    /// Category for an item id, or the sentinel when unmapped.
    pub fn category(&self, item_id: &str) -> &str {
        self.entries
            .get(item_id)
            .map(|entry| entry.category.as_str())
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    /// Catalog price for a known item id.
    pub fn price(&self, item_id: &str) -> Option<f64> {
        self.entries
            .get(item_id)
            .map(|entry| entry.price)
            .filter(|price| price.is_finite())
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.entries.contains_key(item_id)
    }
}
