//! Prerequisite-ownership rules that gate production.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::AssetId;
use crate::inventory::Inventory;
use crate::realm::OwnerId;

/// Answers whether an owner may start producing an asset.
///
/// `holdings` is the owner's inventory including ready-but-unsettled
/// production, so implementations never need to look at queues.
pub trait RequirementGraph {
    /// Check the asset's prerequisites against the owner's holdings.
    fn is_satisfied(&self, owner: OwnerId, asset: AssetId, holdings: &Inventory) -> bool;
}

/// One prerequisite: at least `quantity` units across any of the listed
/// assets. Listing a whole upgrade chain lets upgraded buildings keep
/// satisfying the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    /// Assets that count towards the rule.
    pub any_of: Vec<AssetId>,
    /// Minimum combined quantity.
    pub quantity: u32,
}

impl Prerequisite {
    /// Require at least one unit of a single asset.
    #[must_use]
    pub fn owns(asset: AssetId) -> Self {
        Self {
            any_of: vec![asset],
            quantity: 1,
        }
    }

    /// Require a combined quantity across several assets.
    #[must_use]
    pub fn any_of(assets: Vec<AssetId>, quantity: u32) -> Self {
        Self {
            any_of: assets,
            quantity,
        }
    }

    fn is_met(&self, holdings: &Inventory) -> bool {
        let held: u64 = self
            .any_of
            .iter()
            .map(|asset| u64::from(holdings.quantity(*asset)))
            .sum();
        held >= u64::from(self.quantity)
    }
}

/// Static prerequisite table. Assets without an entry are always allowed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrerequisiteGraph {
    rules: HashMap<AssetId, Vec<Prerequisite>>,
}

impl PrerequisiteGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prerequisite to an asset.
    pub fn require(&mut self, asset: AssetId, prerequisite: Prerequisite) {
        self.rules.entry(asset).or_default().push(prerequisite);
    }

    /// Prerequisites of an asset.
    #[must_use]
    pub fn prerequisites(&self, asset: AssetId) -> &[Prerequisite] {
        self.rules.get(&asset).map_or(&[], Vec::as_slice)
    }
}

impl RequirementGraph for PrerequisiteGraph {
    fn is_satisfied(&self, _owner: OwnerId, asset: AssetId, holdings: &Inventory) -> bool {
        self.prerequisites(asset)
            .iter()
            .all(|prerequisite| prerequisite.is_met(holdings))
    }
}
