//! Static asset definitions: buildings and units.
//!
//! The catalog is read-only game data. The core only ever asks it for an
//! [`AssetSpec`] by id through the [`AssetCatalog`] trait, so a host may back
//! it with anything; [`AssetRegistry`] is the in-memory implementation.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resources::{ResourceKind, ResourcePair};

/// Unique identifier for asset types. Id 0 is the null sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u32);

impl AssetId {
    /// Create a new asset ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Whether this is the reserved null id.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Uniqueness class: at most one member of a class may be owned or queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeClass(pub u32);

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.0)
    }
}

/// Which production queue an asset goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetCategory {
    /// Constructed in the construction queue.
    Building,
    /// Trained in the training queue; can fight.
    Unit,
}

/// Combat stats of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CombatStats {
    /// Damage absorbed before one unit dies.
    pub health: u32,
    /// Damage the unit's side soaks up, and its priority as a damage target.
    pub defense: u32,
    /// Damage contributed to its side.
    pub attack: u32,
}

impl CombatStats {
    /// Create combat stats.
    #[must_use]
    pub const fn new(health: u32, defense: u32, attack: u32) -> Self {
        Self {
            health,
            defense,
            attack,
        }
    }
}

/// Static definition of a building or unit type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Unique identifier for this asset type.
    pub id: AssetId,
    /// Display name.
    pub name: String,
    /// Which queue produces it.
    pub category: AssetCategory,
    /// Ticks to produce one unit.
    pub production_time: u64,
    /// Price of one unit.
    pub price: u64,
    /// Resource the price is paid in.
    pub resource_kind: ResourceKind,
    /// Combat stats (all zero for buildings).
    pub combat: CombatStats,
    /// Storage added per owned unit.
    pub capacity_contribution: ResourcePair,
    /// Production rate (per tick) added per owned unit.
    pub rate_contribution: ResourcePair,
    /// Asset this one replaces when promoted.
    pub upgrade_of: Option<AssetId>,
    /// Uniqueness class, if single-instance.
    pub type_class: Option<TypeClass>,
}

impl AssetSpec {
    /// Create a building spec.
    #[must_use]
    pub fn building(
        id: AssetId,
        name: impl Into<String>,
        price: u64,
        resource_kind: ResourceKind,
        production_time: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: AssetCategory::Building,
            production_time,
            price,
            resource_kind,
            combat: CombatStats::default(),
            capacity_contribution: ResourcePair::ZERO,
            rate_contribution: ResourcePair::ZERO,
            upgrade_of: None,
            type_class: None,
        }
    }

    /// Create a unit spec with combat stats.
    #[must_use]
    pub fn unit(
        id: AssetId,
        name: impl Into<String>,
        price: u64,
        resource_kind: ResourceKind,
        production_time: u64,
        combat: CombatStats,
    ) -> Self {
        Self {
            category: AssetCategory::Unit,
            combat,
            ..Self::building(id, name, price, resource_kind, production_time)
        }
    }

    /// Set storage contribution.
    #[must_use]
    pub fn with_capacity(mut self, capacity: ResourcePair) -> Self {
        self.capacity_contribution = capacity;
        self
    }

    /// Set production rate contribution.
    #[must_use]
    pub fn with_rate(mut self, rate: ResourcePair) -> Self {
        self.rate_contribution = rate;
        self
    }

    /// Mark this asset as an upgrade of another.
    #[must_use]
    pub fn with_upgrade_of(mut self, previous: AssetId) -> Self {
        self.upgrade_of = Some(previous);
        self
    }

    /// Make this asset single-instance within a class.
    #[must_use]
    pub fn with_type_class(mut self, class: TypeClass) -> Self {
        self.type_class = Some(class);
        self
    }

    /// Whether this asset can take part in combat.
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.category == AssetCategory::Unit
    }

    /// Whether owning or producing this asset changes an owner's income.
    #[must_use]
    pub fn affects_rate(&self) -> bool {
        !self.rate_contribution.is_zero()
    }
}

/// Read-only lookup of asset specs.
pub trait AssetCatalog {
    /// Get the spec for an asset, or `None` if it does not exist.
    fn get_spec(&self, id: AssetId) -> Option<&AssetSpec>;
}

/// In-memory catalog keyed by asset id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetRegistry {
    assets: HashMap<AssetId, AssetSpec>,
}

impl AssetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
        }
    }

    /// Register an asset spec, replacing any previous spec with the same id.
    pub fn register(&mut self, spec: AssetSpec) {
        self.assets.insert(spec.id, spec);
    }

    /// Number of registered assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether no assets are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// All registered specs, in id order.
    pub fn all(&self) -> impl Iterator<Item = &AssetSpec> {
        let mut specs: Vec<&AssetSpec> = self.assets.values().collect();
        specs.sort_by_key(|spec| spec.id);
        specs.into_iter()
    }
}

impl AssetCatalog for AssetRegistry {
    fn get_spec(&self, id: AssetId) -> Option<&AssetSpec> {
        self.assets.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id() {
        assert!(AssetId::new(0).is_null());
        assert!(!AssetId::new(4).is_null());
        assert_eq!(AssetId(4).to_string(), "#4");
    }

    #[test]
    fn test_unit_spec_builder() {
        let spec = AssetSpec::unit(
            AssetId(10),
            "Pikeman",
            40,
            ResourceKind::Gold,
            15,
            CombatStats::new(8, 3, 4),
        )
        .with_type_class(TypeClass(2));

        assert!(spec.is_unit());
        assert_eq!(spec.combat.defense, 3);
        assert_eq!(spec.type_class, Some(TypeClass(2)));
        assert!(!spec.affects_rate());
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = AssetRegistry::new();
        registry.register(
            AssetSpec::building(AssetId(2), "Mine", 100, ResourceKind::Gold, 30)
                .with_rate(ResourcePair::new(2, 0)),
        );
        registry.register(AssetSpec::building(
            AssetId(1),
            "Hall",
            0,
            ResourceKind::Gold,
            1,
        ));

        assert_eq!(registry.len(), 2);
        assert!(registry.get_spec(AssetId(2)).is_some_and(AssetSpec::affects_rate));
        assert!(registry.get_spec(AssetId(99)).is_none());
        let ids: Vec<AssetId> = registry.all().map(|spec| spec.id).collect();
        assert_eq!(ids, vec![AssetId(1), AssetId(2)]);
    }
}
