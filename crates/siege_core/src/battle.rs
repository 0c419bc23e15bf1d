//! Attacks between owners.
//!
//! Glue between the matchmaking gate, owner holdings and the pure combat
//! calculation. Everything is validated before either side is touched.

use serde::{Deserialize, Serialize};

use crate::catalog::{AssetCatalog, AssetId};
use crate::combat::{resolve_combat, BattleOutcome, Combatant, Loss};
use crate::error::{GameError, Result};
use crate::matchmaking::AttackClearance;
use crate::points::PointsLedger;
use crate::realm::{
    capacity_of, holdings_view, refresh_rates, refreshed_account, settle_state, OwnerId, OwnerState,
    Realm,
};
use crate::requirements::RequirementGraph;
use crate::resources::{ResourceKind, ResourcePair};
use crate::Tick;

/// Everything that happened in one attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Attacking owner.
    pub attacker: OwnerId,
    /// Defending owner.
    pub defender: OwnerId,
    /// Tick of the battle.
    pub tick: Tick,
    /// Why the attack was allowed.
    pub clearance: AttackClearance,
    /// Pure battle result.
    pub outcome: BattleOutcome,
    /// Stolen resources the attacker could actually store. The defender
    /// loses exactly this much to theft.
    pub loot_kept: ResourcePair,
    /// Salvage the defender could actually store.
    pub salvage_kept: ResourcePair,
    /// Defender gold and crystal after theft and salvage.
    pub defender_balance: ResourcePair,
}

impl<C: AssetCatalog, R: RequirementGraph, P: PointsLedger> Realm<C, R, P> {
    /// Check whether `attacker` may attack `defender` right now.
    ///
    /// # Errors
    ///
    /// Identity errors for null, unknown or identical owners, then
    /// [`GameError::OnCooldown`] or [`GameError::NotInPointsRange`].
    pub fn can_attack(&self, attacker: OwnerId, defender: OwnerId) -> Result<AttackClearance> {
        self.state(attacker)?;
        self.state(defender)?;
        if attacker == defender {
            return Err(GameError::SelfAttack(attacker));
        }
        let points = (
            self.points.get_points(attacker),
            self.points.get_points(defender),
        );
        self.matches.check(
            attacker,
            defender,
            self.now,
            points,
            &self.config.match_rules(),
        )
    }

    /// Send `quantities[i]` of `units[i]` against `defender`'s whole army.
    ///
    /// Both owners are settled first. Casualties leave inventory, stolen
    /// resources move from defender to attacker and the defender receives
    /// salvage, all clamped to post-battle capacity. Loot that does not fit
    /// the attacker's storage is never taken from the defender.
    pub fn attack(
        &mut self,
        attacker: OwnerId,
        defender: OwnerId,
        units: &[AssetId],
        quantities: &[u32],
    ) -> Result<BattleReport> {
        let clearance = self.can_attack(attacker, defender)?;
        let attacker_army = self.muster(attacker, units, quantities)?;

        let defender_state = self.state(defender)?;
        let defender_army = self.garrison(defender_state);
        let (defender_account, _) =
            refreshed_account(&self.catalog, &self.config, defender_state, self.now);

        let outcome = resolve_combat(
            &attacker_army,
            &defender_army,
            defender_account.balances.renewable(),
            self.config.battle_modifiers(),
        )?;

        // Nothing below can fail.
        let now = self.now;
        let mut loot_kept = ResourcePair::ZERO;
        if let Some(state) = self.owners.get_mut(&attacker) {
            settle_state(&self.catalog, &self.config, state, now);
            apply_losses(state, &outcome.attacker_losses);
            refresh_rates(&self.catalog, &self.config, state);
            let capacity = capacity_of(&self.catalog, self.config.base_capacity, &state.inventory);
            loot_kept = ResourcePair::new(
                state
                    .account
                    .credit(ResourceKind::Gold, outcome.stolen.gold, capacity),
                state
                    .account
                    .credit(ResourceKind::Crystal, outcome.stolen.crystal, capacity),
            );
        }

        let mut salvage_kept = ResourcePair::ZERO;
        let mut defender_balance = ResourcePair::ZERO;
        if let Some(state) = self.owners.get_mut(&defender) {
            settle_state(&self.catalog, &self.config, state, now);
            apply_losses(state, &outcome.defender_losses);
            refresh_rates(&self.catalog, &self.config, state);
            let capacity = capacity_of(&self.catalog, self.config.base_capacity, &state.inventory);
            let balances = &mut state.account.balances;
            // Loot the attacker had no room for stays with the defender.
            balances.gold = balances.gold.saturating_sub(loot_kept.gold);
            balances.crystal = balances.crystal.saturating_sub(loot_kept.crystal);
            salvage_kept = ResourcePair::new(
                state
                    .account
                    .credit(ResourceKind::Gold, outcome.reward.gold, capacity),
                state
                    .account
                    .credit(ResourceKind::Crystal, outcome.reward.crystal, capacity),
            );
            state.account.clamp_to(capacity);
            defender_balance = state.account.balances.renewable();
        }

        self.matches.record_attack(
            attacker,
            defender,
            now,
            clearance,
            &self.config.match_rules(),
        );

        tracing::info!(
            attacker = %attacker,
            defender = %defender,
            tick = now,
            ?clearance,
            attacker_casualties = outcome.attacker_casualties(),
            defender_casualties = outcome.defender_casualties(),
            stolen_gold = outcome.stolen.gold,
            stolen_crystal = outcome.stolen.crystal,
            "Battle resolved"
        );

        Ok(BattleReport {
            attacker,
            defender,
            tick: now,
            clearance,
            outcome,
            loot_kept,
            salvage_kept,
            defender_balance,
        })
    }

    /// Validate an attack order against the attacker's holdings.
    fn muster(&self, owner: OwnerId, units: &[AssetId], quantities: &[u32]) -> Result<Vec<Combatant>> {
        if units.len() != quantities.len() || quantities.iter().all(|&q| q == 0) {
            return Err(GameError::EmptyArmy);
        }
        let holdings = holdings_view(&self.catalog, self.state(owner)?, self.now);

        let mut army: Vec<Combatant> = Vec::with_capacity(units.len());
        for (&unit, &quantity) in units.iter().zip(quantities) {
            let spec = self.spec(unit)?;
            if !spec.is_unit() {
                return Err(GameError::NotAUnit(unit));
            }
            if quantity == 0 {
                continue;
            }
            match army.iter_mut().find(|c| c.unit == unit) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(quantity);
                }
                None => army.push(Combatant::from_spec(spec, quantity)),
            }
        }

        for combatant in &army {
            let available = holdings.quantity(combatant.unit);
            if combatant.quantity > available {
                return Err(GameError::InsufficientUnits {
                    unit: combatant.unit,
                    requested: combatant.quantity,
                    available,
                });
            }
        }
        Ok(army)
    }

    /// Every unit the defender holds, in asset id order.
    fn garrison(&self, state: &OwnerState) -> Vec<Combatant> {
        holdings_view(&self.catalog, state, self.now)
            .iter()
            .filter_map(|(asset, quantity)| {
                self.catalog
                    .get_spec(asset)
                    .filter(|spec| spec.is_unit())
                    .map(|spec| Combatant::from_spec(spec, quantity))
            })
            .collect()
    }
}

fn apply_losses(state: &mut OwnerState, losses: &[Loss]) {
    for loss in losses.iter().filter(|l| l.quantity > 0) {
        state.inventory.remove(loss.unit, loss.quantity);
    }
}
