//! Property-based testing strategies.
//!
//! Generators for armies and realm command scripts over the standard
//! catalog in [`crate::fixtures`].

use proptest::prelude::*;
use siege_core::prelude::*;

use crate::determinism::Command;
use crate::fixtures::{ids, ALICE, BOB};

/// Every asset of the standard catalog.
pub const ALL_ASSETS: [AssetId; 9] = [
    ids::HUT,
    ids::GOLD_MINE,
    ids::CRYSTAL_MINE,
    ids::WAREHOUSE,
    ids::WAREHOUSE_II,
    ids::BARRACKS,
    ids::SWORDSMAN,
    ids::ARCHER,
    ids::KNIGHT,
];

/// Units of the standard catalog.
pub const UNITS: [AssetId; 3] = [ids::SWORDSMAN, ids::ARCHER, ids::KNIGHT];

/// A single combatant with arbitrary stats.
pub fn arb_combatant(id: u32) -> impl Strategy<Value = Combatant> {
    (0u32..50, 1u32..40, 0u32..15, 0u32..20, 0u64..200, any::<bool>()).prop_map(
        move |(quantity, health, defense, attack, price, crystal)| Combatant {
            unit: AssetId(id),
            quantity,
            stats: CombatStats::new(health, defense, attack),
            price,
            resource_kind: if crystal {
                ResourceKind::Crystal
            } else {
                ResourceKind::Gold
            },
        },
    )
}

/// An army of up to `max_types` distinct unit types.
pub fn arb_army(max_types: usize) -> impl Strategy<Value = Vec<Combatant>> {
    (1..=max_types).prop_flat_map(|types| {
        (0..types)
            .map(|i| arb_combatant(u32::try_from(i).unwrap_or(0) + 1))
            .collect::<Vec<_>>()
    })
}

fn arb_owner() -> impl Strategy<Value = OwnerId> {
    prop_oneof![Just(ALICE), Just(BOB)]
}

fn arb_asset() -> impl Strategy<Value = AssetId> {
    proptest::sample::select(ALL_ASSETS.to_vec())
}

/// One command against the two-owner fixture realm.
pub fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => (0u64..60).prop_map(Command::Advance),
        4 => (arb_owner(), arb_asset(), 1u32..5).prop_map(|(owner, asset, quantity)| Command::Enqueue {
            owner,
            asset,
            quantity
        }),
        1 => (arb_owner(), arb_asset(), 0usize..4).prop_map(|(owner, asset, index)| Command::Cancel {
            owner,
            asset,
            index
        }),
        1 => arb_owner().prop_map(Command::Settle),
        1 => arb_owner().prop_map(Command::Payout),
        1 => (any::<bool>(), proptest::sample::select(UNITS.to_vec()), 1u32..6).prop_map(
            |(flip, unit, quantity)| {
                let (attacker, defender) = if flip { (ALICE, BOB) } else { (BOB, ALICE) };
                Command::Attack {
                    attacker,
                    defender,
                    units: vec![unit],
                    quantities: vec![quantity],
                }
            }
        ),
    ]
}

/// A script of up to `max_len` commands.
pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
    proptest::collection::vec(arb_command(), 0..=max_len)
}
