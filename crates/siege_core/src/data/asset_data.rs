//! Asset and prerequisite entries of a catalog file.

use serde::{Deserialize, Serialize};

use crate::catalog::{AssetCategory, AssetId, AssetSpec, CombatStats, TypeClass};
use crate::requirements::Prerequisite;
use crate::resources::{ResourceKind, ResourcePair};

/// Data-driven asset definition.
///
/// # Example RON
///
/// ```ron
/// AssetData(
///     id: 20,
///     name: "Swordsman",
///     category: Unit,
///     price: 60,
///     resource: Gold,
///     production_time: 30,
///     combat: Some(CombatStats(health: 12, defense: 3, attack: 8)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetData {
    /// Numeric asset id, never 0.
    pub id: u32,

    /// Display name.
    pub name: String,

    /// Building or unit.
    pub category: AssetCategory,

    /// Price of one unit.
    pub price: u64,

    /// Resource the price is paid in.
    #[serde(default = "default_resource")]
    pub resource: ResourceKind,

    /// Ticks to produce one unit.
    pub production_time: u64,

    /// Combat stats, required for units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<CombatStats>,

    /// Storage added per unit owned.
    #[serde(default)]
    pub capacity: ResourcePair,

    /// Income per tick added per unit owned.
    #[serde(default)]
    pub rate: ResourcePair,

    /// Id of the asset this one upgrades.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_of: Option<u32>,

    /// Single-instance class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_class: Option<u32>,
}

const fn default_resource() -> ResourceKind {
    ResourceKind::Gold
}

impl AssetData {
    /// Build the runtime spec.
    #[must_use]
    pub fn to_spec(&self) -> AssetSpec {
        let id = AssetId(self.id);
        let mut spec = match self.category {
            AssetCategory::Building => {
                AssetSpec::building(id, &self.name, self.price, self.resource, self.production_time)
            }
            AssetCategory::Unit => AssetSpec::unit(
                id,
                &self.name,
                self.price,
                self.resource,
                self.production_time,
                self.combat.unwrap_or_default(),
            ),
        }
        .with_capacity(self.capacity)
        .with_rate(self.rate);
        spec.upgrade_of = self.upgrade_of.map(AssetId);
        spec.type_class = self.type_class.map(TypeClass);
        spec
    }
}

/// Prerequisite entry: `asset` needs `quantity` units across `any_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementData {
    /// Gated asset id.
    pub asset: u32,

    /// Ids that count towards the rule.
    pub any_of: Vec<u32>,

    /// Minimum combined quantity.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

impl RequirementData {
    /// Build the runtime prerequisite.
    #[must_use]
    pub fn to_prerequisite(&self) -> Prerequisite {
        Prerequisite::any_of(self.any_of.iter().copied().map(AssetId).collect(), self.quantity)
    }
}
