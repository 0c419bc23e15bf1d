//! Permanently owned assets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::AssetId;

/// Asset id → owned quantity. Entries with quantity zero are never stored.
///
/// Backed by a `BTreeMap` so iteration order is stable for hashing and
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Inventory {
    owned: BTreeMap<AssetId, u32>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned quantity of an asset.
    #[must_use]
    pub fn quantity(&self, asset: AssetId) -> u32 {
        self.owned.get(&asset).copied().unwrap_or(0)
    }

    /// Add owned units, saturating at `u32::MAX`.
    pub fn add(&mut self, asset: AssetId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let entry = self.owned.entry(asset).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Remove up to `quantity` units and return how many were removed.
    pub fn remove(&mut self, asset: AssetId, quantity: u32) -> u32 {
        let Some(owned) = self.owned.get_mut(&asset) else {
            return 0;
        };
        let removed = quantity.min(*owned);
        *owned -= removed;
        if *owned == 0 {
            self.owned.remove(&asset);
        }
        removed
    }

    /// All owned entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetId, u32)> + '_ {
        self.owned.iter().map(|(id, qty)| (*id, *qty))
    }

    /// Whether nothing is owned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}

impl FromIterator<(AssetId, u32)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (AssetId, u32)>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for (asset, quantity) in iter {
            inventory.add(asset, quantity);
        }
        inventory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove() {
        let mut inventory = Inventory::new();
        inventory.add(AssetId(3), 4);
        inventory.add(AssetId(3), 2);
        inventory.add(AssetId(5), 0);

        assert_eq!(inventory.quantity(AssetId(3)), 6);
        assert_eq!(inventory.quantity(AssetId(5)), 0);

        assert_eq!(inventory.remove(AssetId(3), 10), 6);
        assert!(inventory.is_empty());
        assert_eq!(inventory.remove(AssetId(9), 1), 0);
    }

    #[test]
    fn test_iteration_is_sorted() {
        let inventory: Inventory = [(AssetId(9), 1), (AssetId(2), 3), (AssetId(5), 2)]
            .into_iter()
            .collect();
        let ids: Vec<AssetId> = inventory.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![AssetId(2), AssetId(5), AssetId(9)]);
    }
}
