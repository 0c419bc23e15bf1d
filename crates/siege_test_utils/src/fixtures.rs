//! Test fixtures and helpers.
//!
//! A small standard catalog and pre-built realms for consistent testing.

use siege_core::prelude::*;

/// Asset ids of the standard catalog.
pub mod ids {
    use siege_core::catalog::AssetId;

    /// Cheap building, no effect.
    pub const HUT: AssetId = AssetId(1);
    /// Produces 2 gold per tick.
    pub const GOLD_MINE: AssetId = AssetId(2);
    /// Produces 1 crystal per tick.
    pub const CRYSTAL_MINE: AssetId = AssetId(3);
    /// Adds 1 000 storage of each resource. Single instance.
    pub const WAREHOUSE: AssetId = AssetId(4);
    /// Upgrade of the warehouse, adds 4 000 storage.
    pub const WAREHOUSE_II: AssetId = AssetId(5);
    /// Unlocks unit training.
    pub const BARRACKS: AssetId = AssetId(6);
    /// Basic infantry.
    pub const SWORDSMAN: AssetId = AssetId(20);
    /// Fragile ranged unit.
    pub const ARCHER: AssetId = AssetId(21);
    /// Sturdy unit paid in crystal.
    pub const KNIGHT: AssetId = AssetId(22);
}

/// Default owners used by multi-owner fixtures.
pub const ALICE: OwnerId = OwnerId(1);
/// Second default owner.
pub const BOB: OwnerId = OwnerId(2);

/// Standard catalog used across tests and benches.
#[must_use]
pub fn standard_catalog() -> AssetRegistry {
    let mut catalog = AssetRegistry::new();
    catalog.register(AssetSpec::building(ids::HUT, "Hut", 10, ResourceKind::Gold, 5));
    catalog.register(
        AssetSpec::building(ids::GOLD_MINE, "Gold Mine", 60, ResourceKind::Gold, 20)
            .with_rate(ResourcePair::new(2, 0)),
    );
    catalog.register(
        AssetSpec::building(ids::CRYSTAL_MINE, "Crystal Mine", 80, ResourceKind::Gold, 25)
            .with_rate(ResourcePair::new(0, 1)),
    );
    catalog.register(
        AssetSpec::building(ids::WAREHOUSE, "Warehouse", 150, ResourceKind::Gold, 40)
            .with_capacity(ResourcePair::new(1_000, 1_000))
            .with_type_class(TypeClass(1)),
    );
    catalog.register(
        AssetSpec::building(ids::WAREHOUSE_II, "Warehouse II", 300, ResourceKind::Crystal, 80)
            .with_capacity(ResourcePair::new(4_000, 4_000))
            .with_upgrade_of(ids::WAREHOUSE)
            .with_type_class(TypeClass(1)),
    );
    catalog.register(AssetSpec::building(
        ids::BARRACKS,
        "Barracks",
        100,
        ResourceKind::Gold,
        30,
    ));
    catalog.register(AssetSpec::unit(
        ids::SWORDSMAN,
        "Swordsman",
        20,
        ResourceKind::Gold,
        10,
        CombatStats::new(10, 3, 6),
    ));
    catalog.register(AssetSpec::unit(
        ids::ARCHER,
        "Archer",
        25,
        ResourceKind::Gold,
        12,
        CombatStats::new(6, 1, 8),
    ));
    catalog.register(AssetSpec::unit(
        ids::KNIGHT,
        "Knight",
        40,
        ResourceKind::Crystal,
        30,
        CombatStats::new(30, 8, 12),
    ));
    catalog
}

/// Prerequisites of the standard catalog: every unit needs barracks.
#[must_use]
pub fn standard_requirements() -> PrerequisiteGraph {
    let mut graph = PrerequisiteGraph::new();
    for unit in [ids::SWORDSMAN, ids::ARCHER, ids::KNIGHT] {
        graph.require(unit, Prerequisite::owns(ids::BARRACKS));
    }
    graph
}

/// Builder for test realms.
#[derive(Debug, Clone)]
pub struct RealmBuilder {
    config: RealmConfig,
    owners: Vec<(OwnerId, Balances, u64)>,
}

impl Default for RealmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RealmBuilder {
    /// Start from the default config with no owners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RealmConfig::default(),
            owners: Vec::new(),
        }
    }

    /// Use a specific config.
    #[must_use]
    pub fn with_config(mut self, config: RealmConfig) -> Self {
        self.config = config;
        self
    }

    /// Add an owner with starting balances and points.
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerId, balances: Balances, points: u64) -> Self {
        self.owners.push((owner, balances, points));
        self
    }

    /// Build the realm over the standard catalog.
    ///
    /// # Panics
    ///
    /// Panics if the config is invalid or an owner is registered twice.
    #[must_use]
    pub fn build(self) -> Realm {
        let mut points = PointsTable::new();
        for (owner, _, score) in &self.owners {
            points.set_points(*owner, *score);
        }
        let mut realm = Realm::new(
            standard_catalog(),
            standard_requirements(),
            points,
            self.config,
        )
        .expect("fixture config is valid");
        for (owner, balances, _) in self.owners {
            realm
                .register_owner(owner, balances)
                .expect("fixture owners are unique");
        }
        realm
    }
}

/// Realm with [`ALICE`] and [`BOB`], 1 000 gold and crystal each and equal points.
#[must_use]
pub fn two_owner_realm() -> Realm {
    RealmBuilder::new()
        .with_owner(ALICE, Balances::new(1_000, 1_000, 0), 100)
        .with_owner(BOB, Balances::new(1_000, 1_000, 0), 100)
        .build()
}

/// Give `owner` settled units by building barracks and training them.
///
/// Advances the clock until everything is settled.
///
/// # Panics
///
/// Panics if the owner cannot afford the order.
pub fn train_army(realm: &mut Realm, owner: OwnerId, units: &[(AssetId, u32)]) {
    if realm.holdings(owner).expect("owner exists").quantity(ids::BARRACKS) == 0 {
        realm.enqueue(owner, ids::BARRACKS, 1).expect("barracks affordable");
    }
    let mut done = realm.now();
    if let Some(state) = realm.owner(owner) {
        done = done.max(state.construction.next_start(done));
    }
    realm.advance_to(done).expect("time moves forward");

    for &(unit, quantity) in units {
        let receipt = realm.enqueue(owner, unit, quantity).expect("units affordable");
        done = done.max(receipt.end);
    }
    realm.advance_to(done).expect("time moves forward");
    realm.settle(owner).expect("owner exists");
}
