//! A whole catalog file.

use serde::{Deserialize, Serialize};

use crate::catalog::{AssetCategory, AssetId, AssetRegistry};
use crate::error::{GameError, Result};
use crate::requirements::PrerequisiteGraph;

use super::{AssetData, RequirementData};

/// Every asset and prerequisite of a realm.
///
/// # Example RON
///
/// ```ron
/// CatalogData(
///     assets: [
///         AssetData(id: 1, name: "Barracks", category: Building, price: 100, production_time: 60),
///         AssetData(
///             id: 20, name: "Swordsman", category: Unit, price: 60, production_time: 30,
///             combat: Some(CombatStats(health: 12, defense: 3, attack: 8)),
///         ),
///     ],
///     requirements: [
///         RequirementData(asset: 20, any_of: [1]),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogData {
    /// Asset definitions.
    pub assets: Vec<AssetData>,

    /// Production prerequisites.
    #[serde(default)]
    pub requirements: Vec<RequirementData>,
}

impl CatalogData {
    /// Parse a catalog from RON and validate it.
    ///
    /// `path` is only used in error messages.
    pub fn from_ron_str(path: &str, source: &str) -> Result<Self> {
        let data: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let errors = data.validate();
        if !errors.is_empty() {
            return Err(GameError::DataParseError {
                path: path.to_string(),
                message: errors.join("; "),
            });
        }
        Ok(data)
    }

    /// Get an asset by id.
    #[must_use]
    pub fn get_asset(&self, id: u32) -> Option<&AssetData> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Validate ids and references.
    ///
    /// Checks that:
    /// - Asset ids are non-zero and unique
    /// - Units have combat stats with non-zero health
    /// - Upgrades point at an existing asset of the same category
    /// - Prerequisites reference existing assets
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut seen = std::collections::BTreeSet::new();
        for asset in &self.assets {
            if asset.id == 0 {
                errors.push(format!("Asset '{}' uses the null id 0", asset.name));
            }
            if !seen.insert(asset.id) {
                errors.push(format!("Duplicate asset id {}", asset.id));
            }

            match (asset.category, asset.combat) {
                (AssetCategory::Unit, None) => {
                    errors.push(format!("Unit '{}' has no combat stats", asset.name));
                }
                (AssetCategory::Unit, Some(stats)) if stats.health == 0 => {
                    errors.push(format!("Unit '{}' has zero health", asset.name));
                }
                _ => {}
            }

            if let Some(previous) = asset.upgrade_of {
                match self.get_asset(previous) {
                    None => errors.push(format!(
                        "Asset '{}' upgrades unknown asset {}",
                        asset.name, previous
                    )),
                    Some(prev) if prev.category != asset.category => errors.push(format!(
                        "Asset '{}' upgrades '{}' of a different category",
                        asset.name, prev.name
                    )),
                    Some(_) if previous == asset.id => {
                        errors.push(format!("Asset '{}' upgrades itself", asset.name));
                    }
                    Some(_) => {}
                }
            }
        }

        for requirement in &self.requirements {
            if self.get_asset(requirement.asset).is_none() {
                errors.push(format!(
                    "Requirement for unknown asset {}",
                    requirement.asset
                ));
            }
            for id in &requirement.any_of {
                if self.get_asset(*id).is_none() {
                    errors.push(format!(
                        "Asset {} requires unknown asset {}",
                        requirement.asset, id
                    ));
                }
            }
        }

        errors
    }

    /// Build the in-memory catalog.
    #[must_use]
    pub fn to_registry(&self) -> AssetRegistry {
        let mut registry = AssetRegistry::new();
        for asset in &self.assets {
            registry.register(asset.to_spec());
        }
        registry
    }

    /// Build the prerequisite graph.
    #[must_use]
    pub fn to_graph(&self) -> PrerequisiteGraph {
        let mut graph = PrerequisiteGraph::new();
        for requirement in &self.requirements {
            graph.require(AssetId(requirement.asset), requirement.to_prerequisite());
        }
        graph
    }
}
