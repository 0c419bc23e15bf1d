//! Deterministic battle resolution.
//!
//! A battle is one closed-form calculation over two army compositions:
//!
//! 1. Each side's total attack is reduced by the other side's total defense.
//! 2. The remaining damage is allocated greedily over the receiving army,
//!    highest-defense unit type first, killing whole units only.
//! 3. If the attacker overwhelms the defense without being hurt back, it
//!    steals a share of the defender's gold and crystal.
//! 4. The defender salvages a share of the price of every casualty.
//!
//! No randomness, no iteration over time, and no state: the same inputs
//! always produce the same [`BattleOutcome`].

use serde::{Deserialize, Serialize};

use crate::catalog::{AssetId, AssetSpec, CombatStats};
use crate::error::{GameError, Result};
use crate::resources::{ResourceKind, ResourcePair};

/// One unit type taking part in a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Unit asset.
    pub unit: AssetId,
    /// Units fielded.
    pub quantity: u32,
    /// Per-unit stats.
    pub stats: CombatStats,
    /// Per-unit price, used for salvage.
    pub price: u64,
    /// Resource the price is paid in.
    pub resource_kind: ResourceKind,
}

impl Combatant {
    /// Field `quantity` units of a catalog asset.
    #[must_use]
    pub fn from_spec(spec: &AssetSpec, quantity: u32) -> Self {
        Self {
            unit: spec.id,
            quantity,
            stats: spec.combat,
            price: spec.price,
            resource_kind: spec.resource_kind,
        }
    }
}

/// Percentages applied to theft and salvage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleModifiers {
    /// Share of the defender's balance an unhurt attacker can carry off.
    pub attacker_reward_modifier: u64,
    /// Share of casualty value the defender salvages.
    pub defender_reward_modifier: u64,
}

/// Which stat a unit spends to absorb one unit's worth of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStat {
    /// Casualties: damage kills `floor(damage / health)` units.
    Health,
    /// Knock-outs: damage disables `floor(damage / defense)` units.
    Defense,
}

impl AllocationStat {
    const fn per_unit(self, stats: &CombatStats) -> u32 {
        let value = match self {
            Self::Health => stats.health,
            Self::Defense => stats.defense,
        };
        // A zero stat still absorbs one point, so allocation always terminates.
        if value == 0 {
            1
        } else {
            value
        }
    }
}

/// Units removed from one entry of an army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loss {
    /// Unit asset.
    pub unit: AssetId,
    /// Units removed.
    pub quantity: u32,
}

/// Full result of one battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutcome {
    /// Damage that got through the defender's defense.
    pub damage_to_defender: u128,
    /// Damage that got through the attacker's defense.
    pub damage_to_attacker: u128,
    /// Attacker casualties, parallel to the attacker army.
    pub attacker_losses: Vec<Loss>,
    /// Defender casualties, parallel to the defender army.
    pub defender_losses: Vec<Loss>,
    /// Attacker units knocked out of looting, parallel to the attacker army.
    pub knocked: Vec<Loss>,
    /// Whether the attacker was allowed to steal.
    pub theft_eligible: bool,
    /// Percentage of the defender's balances stolen.
    pub stolen_percent: u64,
    /// Resources moved from defender to attacker.
    pub stolen: ResourcePair,
    /// Salvage credited to the defender.
    pub reward: ResourcePair,
}

impl BattleOutcome {
    /// Total attacker units killed.
    #[must_use]
    pub fn attacker_casualties(&self) -> u64 {
        self.attacker_losses.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Total defender units killed.
    #[must_use]
    pub fn defender_casualties(&self) -> u64 {
        self.defender_losses.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

/// Σ quantity · attack.
#[must_use]
pub fn total_attack(army: &[Combatant]) -> u128 {
    army.iter()
        .map(|c| u128::from(c.quantity) * u128::from(c.stats.attack))
        .sum()
}

/// Σ quantity · defense.
#[must_use]
pub fn total_defense(army: &[Combatant]) -> u128 {
    army.iter()
        .map(|c| u128::from(c.quantity) * u128::from(c.stats.defense))
        .sum()
}

/// Spread `damage` over `army`, highest defense first.
///
/// Each unit type is visited once, in descending defense order with ties
/// kept in input order. It loses `floor(damage / stat)` units, capped at its
/// quantity, and the damage spent on them is subtracted before moving on.
/// Returns the removed count per army entry.
#[must_use]
pub fn allocate(damage: u128, army: &[Combatant], stat: AllocationStat) -> Vec<u32> {
    let mut removed = vec![0u32; army.len()];
    let mut order: Vec<usize> = (0..army.len()).collect();
    order.sort_by(|a, b| army[*b].stats.defense.cmp(&army[*a].stats.defense));

    let mut remaining = damage;
    for index in order {
        if remaining == 0 {
            break;
        }
        let entry = &army[index];
        let per_unit = u128::from(stat.per_unit(&entry.stats));
        let count = (remaining / per_unit).min(u128::from(entry.quantity));
        // `count` is capped by a u32 quantity.
        let count_u32 = u32::try_from(count).unwrap_or(entry.quantity);
        removed[index] = count_u32;
        remaining -= count * per_unit;
    }
    removed
}

fn losses(army: &[Combatant], removed: &[u32]) -> Vec<Loss> {
    army.iter()
        .zip(removed)
        .map(|(c, qty)| Loss {
            unit: c.unit,
            quantity: *qty,
        })
        .collect()
}

fn salvage(army: &[Combatant], removed: &[u32], value: &mut [u128; 2]) {
    for (c, qty) in army.iter().zip(removed) {
        let worth = u128::from(c.price) * u128::from(*qty);
        match c.resource_kind {
            ResourceKind::Gold => value[0] = value[0].saturating_add(worth),
            ResourceKind::Crystal => value[1] = value[1].saturating_add(worth),
            ResourceKind::Scarce => {}
        }
    }
}

fn percent_of(amount: u128, percent: u128) -> u64 {
    u64::try_from(amount.saturating_mul(percent) / 100).unwrap_or(u64::MAX)
}

/// Resolve one battle.
///
/// `attacker` and `defender` are the fielded armies; `defender_balance` is
/// the defender's gold and crystal at the moment of the attack.
///
/// # Errors
///
/// Returns [`GameError::EmptyArmy`] if the attacker fields no units.
pub fn resolve_combat(
    attacker: &[Combatant],
    defender: &[Combatant],
    defender_balance: ResourcePair,
    modifiers: BattleModifiers,
) -> Result<BattleOutcome> {
    if attacker.iter().all(|c| c.quantity == 0) {
        return Err(GameError::EmptyArmy);
    }

    let attack_att = total_attack(attacker);
    let defense_att = total_defense(attacker);
    let attack_def = total_attack(defender);
    let defense_def = total_defense(defender);

    let damage_to_defender = attack_att.saturating_sub(defense_def);
    let damage_to_attacker = attack_def.saturating_sub(defense_att);

    let defender_killed = allocate(damage_to_defender, defender, AllocationStat::Health);
    let attacker_killed = allocate(damage_to_attacker, attacker, AllocationStat::Health);

    let theft_eligible =
        defense_def < attack_att && (attack_def < defense_att || attack_def == 0);

    let mut knocked = vec![0u32; attacker.len()];
    let mut stolen_percent = 0u64;
    let mut stolen = ResourcePair::ZERO;
    if theft_eligible {
        // Knock-outs are counted over the pre-battle army, not the survivors.
        knocked = allocate(damage_to_attacker, attacker, AllocationStat::Defense);
        let capable: u128 = attacker
            .iter()
            .zip(&knocked)
            .map(|(c, k)| u128::from(c.quantity - k) * u128::from(c.stats.attack))
            .sum();
        let percent = (capable.saturating_mul(u128::from(modifiers.attacker_reward_modifier))
            / attack_att)
            .min(100);
        stolen_percent = u64::try_from(percent).unwrap_or(100);
        stolen = ResourcePair::new(
            percent_of(u128::from(defender_balance.gold), percent),
            percent_of(u128::from(defender_balance.crystal), percent),
        );
    }

    let mut value = [0u128; 2];
    salvage(attacker, &attacker_killed, &mut value);
    salvage(defender, &defender_killed, &mut value);
    let modifier = u128::from(modifiers.defender_reward_modifier);
    let reward = ResourcePair::new(percent_of(value[0], modifier), percent_of(value[1], modifier));

    Ok(BattleOutcome {
        damage_to_defender,
        damage_to_attacker,
        attacker_losses: losses(attacker, &attacker_killed),
        defender_losses: losses(defender, &defender_killed),
        knocked: losses(attacker, &knocked),
        theft_eligible,
        stolen_percent,
        stolen,
        reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODS: BattleModifiers = BattleModifiers {
        attacker_reward_modifier: 50,
        defender_reward_modifier: 10,
    };

    fn unit(id: u32, qty: u32, health: u32, defense: u32, attack: u32) -> Combatant {
        Combatant {
            unit: AssetId(id),
            quantity: qty,
            stats: CombatStats::new(health, defense, attack),
            price: 100,
            resource_kind: ResourceKind::Gold,
        }
    }

    #[test]
    fn test_totals() {
        let army = [unit(1, 10, 5, 2, 10), unit(2, 3, 4, 1, 7)];
        assert_eq!(total_attack(&army), 121);
        assert_eq!(total_defense(&army), 23);
    }

    #[test]
    fn test_overwhelming_attack_wipes_defender() {
        let attacker = [unit(1, 10, 5, 2, 10)];
        let defender = [unit(2, 5, 3, 1, 0)];

        let outcome =
            resolve_combat(&attacker, &defender, ResourcePair::ZERO, MODS).unwrap();

        assert_eq!(outcome.damage_to_defender, 95);
        assert_eq!(outcome.damage_to_attacker, 0);
        assert_eq!(outcome.defender_losses[0].quantity, 5);
        assert_eq!(outcome.attacker_casualties(), 0);
    }

    #[test]
    fn test_allocate_highest_defense_first() {
        let army = [unit(1, 4, 10, 1, 0), unit(2, 2, 10, 5, 0), unit(3, 3, 10, 5, 0)];
        // 35 damage: unit 2 first (tie with 3, earlier input), then unit 3
        let removed = allocate(35, &army, AllocationStat::Health);
        assert_eq!(removed, vec![0, 2, 1]);
    }

    #[test]
    fn test_allocate_spills_past_sturdy_units() {
        let army = [unit(1, 4, 3, 1, 0), unit(2, 2, 50, 9, 0)];
        // Not enough to kill one heavy unit; damage moves on to the light one.
        let removed = allocate(10, &army, AllocationStat::Health);
        assert_eq!(removed, vec![3, 0]);
    }

    #[test]
    fn test_allocate_caps_at_quantity() {
        let army = [unit(1, 2, 1, 0, 0)];
        assert_eq!(allocate(1_000, &army, AllocationStat::Health), vec![2]);
        assert_eq!(allocate(0, &army, AllocationStat::Health), vec![0]);
    }

    #[test]
    fn test_theft_when_unopposed() {
        let attacker = [unit(1, 10, 5, 2, 10)];
        let defender = [unit(2, 5, 3, 1, 0)];

        let outcome =
            resolve_combat(&attacker, &defender, ResourcePair::new(1_000, 333), MODS).unwrap();

        assert!(outcome.theft_eligible);
        assert_eq!(outcome.stolen_percent, 50);
        assert_eq!(outcome.stolen, ResourcePair::new(500, 166));
        assert!(outcome.knocked.iter().all(|k| k.quantity == 0));
    }

    #[test]
    fn test_no_theft_when_defender_hits_back() {
        let attacker = [unit(1, 10, 5, 2, 10)];
        let defender = [unit(2, 5, 3, 1, 8)];

        let outcome =
            resolve_combat(&attacker, &defender, ResourcePair::new(1_000, 1_000), MODS).unwrap();

        // Defender attack 40 ≥ attacker defense 20
        assert!(!outcome.theft_eligible);
        assert_eq!(outcome.stolen, ResourcePair::ZERO);
        assert_eq!(outcome.damage_to_attacker, 20);
        assert_eq!(outcome.attacker_losses[0].quantity, 4);
    }

    #[test]
    fn test_no_theft_when_defense_holds() {
        let attacker = [unit(1, 2, 5, 0, 3)];
        let defender = [unit(2, 5, 3, 4, 0)];

        let outcome =
            resolve_combat(&attacker, &defender, ResourcePair::new(1_000, 1_000), MODS).unwrap();
        assert_eq!(outcome.damage_to_defender, 0);
        assert!(!outcome.theft_eligible);
        assert_eq!(outcome.defender_casualties(), 0);
    }

    #[test]
    fn test_salvage_reward_counts_both_sides() {
        let mut attacker = [unit(1, 10, 5, 2, 10)];
        attacker[0].price = 50;
        let mut defender = [unit(2, 5, 3, 1, 8)];
        defender[0].resource_kind = ResourceKind::Crystal;

        let outcome =
            resolve_combat(&attacker, &defender, ResourcePair::ZERO, MODS).unwrap();
        // Attacker loses 4 × 50 gold, defender loses 5 × 100 crystal; 10% salvage
        assert_eq!(outcome.reward, ResourcePair::new(20, 50));
    }

    #[test]
    fn test_empty_attacker_rejected() {
        let attacker = [unit(1, 0, 5, 2, 10)];
        assert_eq!(
            resolve_combat(&attacker, &[], ResourcePair::ZERO, MODS),
            Err(GameError::EmptyArmy)
        );
        assert_eq!(
            resolve_combat(&[], &[], ResourcePair::ZERO, MODS),
            Err(GameError::EmptyArmy)
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let attacker = [unit(1, 7, 6, 3, 9), unit(4, 2, 20, 8, 1)];
        let defender = [unit(2, 9, 4, 2, 5), unit(3, 1, 30, 10, 12)];
        let first = resolve_combat(&attacker, &defender, ResourcePair::new(77, 88), MODS);
        let second = resolve_combat(&attacker, &defender, ResourcePair::new(77, 88), MODS);
        assert_eq!(first, second);
    }
}
