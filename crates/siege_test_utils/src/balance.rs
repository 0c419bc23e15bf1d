//! Balance testing utilities.
//!
//! Runs the pure battle calculation over many army sizes to compare how unit
//! types fare against each other.

use siege_core::catalog::{AssetCatalog, AssetId};
use siege_core::combat::{resolve_combat, BattleModifiers, Combatant};
use siege_core::resources::ResourcePair;

/// Aggregate of a batch of battles between two unit types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchupStats {
    /// Battles run.
    pub battles: u32,
    /// Battles where the defender lost every unit and the attacker lost none.
    pub attacker_wins: u32,
    /// Battles where the attacker lost every unit.
    pub defender_wins: u32,
    /// Total value of attacker casualties.
    pub attacker_losses_value: u64,
    /// Total value of defender casualties.
    pub defender_losses_value: u64,
}

impl MatchupStats {
    /// Attacker win rate in percent.
    #[must_use]
    pub fn attacker_win_percent(&self) -> u32 {
        if self.battles == 0 {
            return 50;
        }
        self.attacker_wins * 100 / self.battles
    }

    /// Check if the matchup's win rate is within `[min, max]` percent.
    #[must_use]
    pub fn is_balanced(&self, min: u32, max: u32) -> bool {
        (min..=max).contains(&self.attacker_win_percent())
    }
}

/// Fight `attacker` against `defender` with equal spend for every budget in
/// `budgets`.
///
/// Returns `None` if either asset is missing from the catalog.
pub fn equal_cost_matchup<C: AssetCatalog>(
    catalog: &C,
    attacker: AssetId,
    defender: AssetId,
    budgets: impl IntoIterator<Item = u64>,
    modifiers: BattleModifiers,
) -> Option<MatchupStats> {
    let att_spec = catalog.get_spec(attacker)?;
    let def_spec = catalog.get_spec(defender)?;
    let mut stats = MatchupStats::default();

    for budget in budgets {
        let att_qty = u32::try_from(budget / att_spec.price.max(1)).unwrap_or(u32::MAX);
        let def_qty = u32::try_from(budget / def_spec.price.max(1)).unwrap_or(u32::MAX);
        if att_qty == 0 {
            continue;
        }
        let att = [Combatant::from_spec(att_spec, att_qty)];
        let def = [Combatant::from_spec(def_spec, def_qty)];
        let Ok(outcome) = resolve_combat(&att, &def, ResourcePair::ZERO, modifiers) else {
            continue;
        };

        stats.battles += 1;
        let att_dead = outcome.attacker_casualties();
        let def_dead = outcome.defender_casualties();
        if def_dead == u64::from(def_qty) && att_dead == 0 {
            stats.attacker_wins += 1;
        }
        if att_dead == u64::from(att_qty) {
            stats.defender_wins += 1;
        }
        stats.attacker_losses_value += att_dead * att_spec.price;
        stats.defender_losses_value += def_dead * def_spec.price;
    }
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ids, standard_catalog};

    const MODS: BattleModifiers = BattleModifiers {
        attacker_reward_modifier: 50,
        defender_reward_modifier: 10,
    };

    #[test]
    fn test_mirror_matchup_never_wipes_attacker_for_free() {
        let catalog = standard_catalog();
        let stats =
            equal_cost_matchup(&catalog, ids::SWORDSMAN, ids::SWORDSMAN, (1..=20).map(|n| n * 100), MODS)
                .unwrap();
        assert_eq!(stats.battles, 20);
        // Mirror armies deal attack − defense to each other symmetrically.
        assert_eq!(stats.attacker_losses_value, stats.defender_losses_value);
    }

    #[test]
    fn test_unknown_asset() {
        let catalog = standard_catalog();
        assert!(equal_cost_matchup(&catalog, AssetId(99), ids::ARCHER, [100], MODS).is_none());
    }
}
