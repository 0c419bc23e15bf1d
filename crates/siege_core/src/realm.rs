//! The realm: every owner's queues, inventory and ledger under one clock.
//!
//! # Atomicity
//!
//! Every mutating operation first validates against a refreshed *copy* of the
//! owner's state (payout applied, ready quantities counted) and only writes
//! back once nothing can fail. A returned error therefore always leaves the
//! realm untouched.
//!
//! # Example
//!
//! ```
//! use siege_core::catalog::{AssetId, AssetRegistry, AssetSpec};
//! use siege_core::config::RealmConfig;
//! use siege_core::points::PointsTable;
//! use siege_core::realm::{OwnerId, Realm};
//! use siege_core::requirements::PrerequisiteGraph;
//! use siege_core::resources::{Balances, ResourceKind};
//!
//! let mut catalog = AssetRegistry::new();
//! catalog.register(AssetSpec::building(AssetId(1), "Farm", 50, ResourceKind::Gold, 10));
//!
//! let mut realm = Realm::new(
//!     catalog,
//!     PrerequisiteGraph::new(),
//!     PointsTable::new(),
//!     RealmConfig::default(),
//! )
//! .unwrap();
//! realm.register_owner(OwnerId(1), Balances::new(500, 0, 0)).unwrap();
//!
//! let receipt = realm.enqueue(OwnerId(1), AssetId(1), 3).unwrap();
//! assert_eq!((receipt.start, receipt.end), (0, 30));
//!
//! realm.advance_to(25).unwrap();
//! assert_eq!(realm.get_ready_quantity(OwnerId(1), AssetId(1)).unwrap(), 2);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::catalog::{AssetCatalog, AssetCategory, AssetId, AssetRegistry, AssetSpec};
use crate::config::RealmConfig;
use crate::error::{GameError, Result};
use crate::inventory::Inventory;
use crate::ledger::{Payout, QueueBonus, ResourceAccount};
use crate::matchmaking::MatchState;
use crate::points::{PointsLedger, PointsTable};
use crate::production::{ProductionQueue, Promotion};
use crate::requirements::{PrerequisiteGraph, RequirementGraph};
use crate::resources::{Balances, ResourceKind, ResourcePair};
use crate::Tick;

/// Opaque owner identifier. Id 0 is the null sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

impl OwnerId {
    /// Whether this is the reserved null id.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything one owner has.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerState {
    /// Building queue.
    pub construction: ProductionQueue,
    /// Unit queue.
    pub training: ProductionQueue,
    /// Settled assets.
    pub inventory: Inventory,
    /// Balances and accrual bookkeeping.
    pub account: ResourceAccount,
}

impl OwnerState {
    fn new(account: ResourceAccount) -> Self {
        Self {
            construction: ProductionQueue::new(),
            training: ProductionQueue::new(),
            inventory: Inventory::new(),
            account,
        }
    }

    /// Queue that produces a category.
    #[must_use]
    pub const fn queue(&self, category: AssetCategory) -> &ProductionQueue {
        match category {
            AssetCategory::Building => &self.construction,
            AssetCategory::Unit => &self.training,
        }
    }

    fn queue_mut(&mut self, category: AssetCategory) -> &mut ProductionQueue {
        match category {
            AssetCategory::Building => &mut self.construction,
            AssetCategory::Unit => &mut self.training,
        }
    }

    fn all_batches(&self) -> impl Iterator<Item = &crate::production::Batch> {
        self.construction.iter().chain(self.training.iter())
    }
}

/// Result of a successful [`Realm::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueReceipt {
    /// Asset ordered.
    pub asset: AssetId,
    /// Queue the batch went into.
    pub category: AssetCategory,
    /// Queue index of the new batch.
    pub index: usize,
    /// Units ordered.
    pub quantity: u32,
    /// Scheduled start tick.
    pub start: Tick,
    /// Scheduled end tick.
    pub end: Tick,
    /// Amount debited.
    pub cost: u64,
    /// Resource debited.
    pub resource_kind: ResourceKind,
}

/// Result of a successful [`Realm::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReceipt {
    /// Asset of the cancelled batch.
    pub asset: AssetId,
    /// Finished units moved to inventory.
    pub promoted: u32,
    /// Units that will never be produced.
    pub refunded_quantity: u32,
    /// Refund owed for those units.
    pub refund: u64,
    /// Refund actually kept after the capacity clamp.
    pub refund_kept: u64,
    /// Ticks every later batch moved earlier.
    pub shift: Tick,
}

/// Snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct RealmSnapshot {
    version: u32,
    now: Tick,
    owners: BTreeMap<OwnerId, OwnerState>,
    matches: MatchState,
}

/// Owner arena, clock and external collaborators.
#[derive(Debug, Clone)]
pub struct Realm<C = AssetRegistry, R = PrerequisiteGraph, P = PointsTable> {
    pub(crate) catalog: C,
    pub(crate) requirements: R,
    pub(crate) points: P,
    pub(crate) config: RealmConfig,
    pub(crate) now: Tick,
    pub(crate) owners: BTreeMap<OwnerId, OwnerState>,
    pub(crate) matches: MatchState,
}

impl<C: AssetCatalog, R: RequirementGraph, P: PointsLedger> Realm<C, R, P> {
    /// Create an empty realm at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the config fails validation.
    pub fn new(catalog: C, requirements: R, points: P, config: RealmConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog,
            requirements,
            points,
            config,
            now: 0,
            owners: BTreeMap::new(),
            matches: MatchState::new(),
        })
    }

    /// Current tick.
    #[must_use]
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RealmConfig {
        &self.config
    }

    /// The asset catalog.
    #[must_use]
    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The points component.
    #[must_use]
    pub const fn points(&self) -> &P {
        &self.points
    }

    /// Mutable points component, for the host's ranking logic.
    pub fn points_mut(&mut self) -> &mut P {
        &mut self.points
    }

    /// Attack history.
    #[must_use]
    pub const fn matches(&self) -> &MatchState {
        &self.matches
    }

    /// Raw state of an owner.
    #[must_use]
    pub fn owner(&self, owner: OwnerId) -> Option<&OwnerState> {
        self.owners.get(&owner)
    }

    /// All registered owners in id order.
    pub fn owner_ids(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.owners.keys().copied()
    }

    /// Whether the owner has a village.
    #[must_use]
    pub fn has_village(&self, owner: OwnerId) -> bool {
        self.owners.contains_key(&owner)
    }

    /// Move the clock forward.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TimeWentBackwards`] if `tick` is before now.
    pub fn advance_to(&mut self, tick: Tick) -> Result<()> {
        if tick < self.now {
            return Err(GameError::TimeWentBackwards {
                now: self.now,
                requested: tick,
            });
        }
        self.now = tick;
        self.matches.prune_expired(tick);
        Ok(())
    }

    /// Record a new village with starting balances.
    ///
    /// Balances above the base capacity are clamped.
    pub fn register_owner(&mut self, owner: OwnerId, starting: Balances) -> Result<()> {
        if owner.is_null() {
            return Err(GameError::NullIdentifier("owner"));
        }
        if self.has_village(owner) {
            return Err(GameError::OwnerExists(owner));
        }
        let mut account = ResourceAccount::new(starting, self.now, self.config.base_rate);
        account.clamp_to(self.config.base_capacity);
        self.owners.insert(owner, OwnerState::new(account));
        tracing::debug!(owner = %owner, tick = self.now, "Owner registered");
        Ok(())
    }

    pub(crate) fn state(&self, owner: OwnerId) -> Result<&OwnerState> {
        if owner.is_null() {
            return Err(GameError::NullIdentifier("owner"));
        }
        self.owners
            .get(&owner)
            .ok_or(GameError::UnknownOwner(owner))
    }

    pub(crate) fn spec(&self, asset: AssetId) -> Result<&AssetSpec> {
        if asset.is_null() {
            return Err(GameError::NullIdentifier("asset"));
        }
        self.catalog
            .get_spec(asset)
            .ok_or(GameError::UnknownAsset(asset))
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    /// Owned plus ready-but-unsettled quantities, upgrades replacing their
    /// predecessors.
    pub fn holdings(&self, owner: OwnerId) -> Result<Inventory> {
        let state = self.state(owner)?;
        Ok(holdings_view(&self.catalog, state, self.now))
    }

    /// Finished-but-unsettled units of an asset.
    pub fn get_ready_quantity(&self, owner: OwnerId, asset: AssetId) -> Result<u32> {
        let category = self.spec(asset)?.category;
        Ok(self.state(owner)?.queue(category).ready_quantity(asset, self.now))
    }

    /// Units of an asset still in the queue, finished or not.
    pub fn get_unsettled_quantity(&self, owner: OwnerId, asset: AssetId) -> Result<u32> {
        let category = self.spec(asset)?.category;
        Ok(self.state(owner)?.queue(category).unsettled_quantity(asset))
    }

    /// Storage limit for gold and crystal.
    pub fn calculate_capacity(&self, owner: OwnerId) -> Result<ResourcePair> {
        let state = self.state(owner)?;
        let holdings = holdings_view(&self.catalog, state, self.now);
        Ok(capacity_of(&self.catalog, self.config.base_capacity, &holdings))
    }

    /// Balances as they would be after a payout now, without committing it.
    pub fn balances(&self, owner: OwnerId) -> Result<Balances> {
        let state = self.state(owner)?;
        let (account, _) = refreshed_account(&self.catalog, &self.config, state, self.now);
        Ok(account.balances)
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Bring an owner's balances up to now.
    pub fn payout(&mut self, owner: OwnerId) -> Result<Payout> {
        let state = self.state(owner)?;
        let (account, payout) = refreshed_account(&self.catalog, &self.config, state, self.now);
        self.commit_account(owner, account);
        tracing::debug!(
            owner = %owner,
            tick = self.now,
            elapsed = payout.elapsed,
            gold = payout.gained.gold,
            crystal = payout.gained.crystal,
            "Payout"
        );
        Ok(payout)
    }

    /// Debit an owner after a payout.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientResources`] if the refreshed balance is
    /// short; no payout is committed in that case.
    pub fn consume(&mut self, owner: OwnerId, kind: ResourceKind, amount: u64) -> Result<()> {
        let state = self.state(owner)?;
        let (mut account, _) = refreshed_account(&self.catalog, &self.config, state, self.now);
        account.consume(kind, amount)?;
        self.commit_account(owner, account);
        Ok(())
    }

    /// Credit an owner after a payout, discarding overflow above capacity.
    ///
    /// Returns the amount kept.
    pub fn credit(&mut self, owner: OwnerId, kind: ResourceKind, amount: u64) -> Result<u64> {
        let state = self.state(owner)?;
        let capacity = capacity_of(
            &self.catalog,
            self.config.base_capacity,
            &holdings_view(&self.catalog, state, self.now),
        );
        let (mut account, _) = refreshed_account(&self.catalog, &self.config, state, self.now);
        let kept = account.credit(kind, amount, capacity);
        self.commit_account(owner, account);
        Ok(kept)
    }

    fn commit_account(&mut self, owner: OwnerId, account: ResourceAccount) {
        if let Some(state) = self.owners.get_mut(&owner) {
            state.account = account;
        }
    }

    // ------------------------------------------------------------------
    // Production
    // ------------------------------------------------------------------

    /// Order `quantity` units of an asset, paying up front.
    pub fn enqueue(
        &mut self,
        owner: OwnerId,
        asset: AssetId,
        quantity: u32,
    ) -> Result<EnqueueReceipt> {
        if quantity == 0 {
            return Err(GameError::ZeroQuantity);
        }
        let spec = self.spec(asset)?;
        let state = self.state(owner)?;
        let holdings = holdings_view(&self.catalog, state, self.now);

        if !self.requirements.is_satisfied(owner, asset, &holdings) {
            return Err(GameError::RequirementNotMet(asset));
        }
        if let Some(previous) = spec.upgrade_of {
            let claimed = pending_upgrades_of(&self.catalog, state, previous, self.now);
            let needed = u64::from(claimed) + u64::from(quantity);
            if u64::from(holdings.quantity(previous)) < needed {
                return Err(GameError::RequirementNotMet(asset));
            }
        }
        check_type_class(&self.catalog, state, spec, quantity, &holdings, self.now)?;

        let cost = spec
            .price
            .checked_mul(u64::from(quantity))
            .ok_or(GameError::ArithmeticOverflow("order cost"))?;
        let (mut account, _) = refreshed_account(&self.catalog, &self.config, state, self.now);
        account.consume(spec.resource_kind, cost)?;

        let mut queue = state.queue(spec.category).clone();
        let index = queue.append(asset, quantity, spec.production_time, self.now)?;
        let (start, end) = queue
            .get(index)
            .map(|batch| (batch.start, batch.end))
            .unwrap_or_default();

        let receipt = EnqueueReceipt {
            asset,
            category: spec.category,
            index,
            quantity,
            start,
            end,
            cost,
            resource_kind: spec.resource_kind,
        };

        if let Some(state) = self.owners.get_mut(&owner) {
            state.account = account;
            *state.queue_mut(receipt.category) = queue;
        }
        tracing::debug!(
            owner = %owner,
            asset = %asset,
            quantity,
            index,
            start,
            end,
            cost,
            "Batch enqueued"
        );
        Ok(receipt)
    }

    /// Cancel the batch at `queue_index`, which must be producing `asset`.
    ///
    /// Finished units are kept; the unfinished rest is refunded at the
    /// configured percentage.
    pub fn cancel(
        &mut self,
        owner: OwnerId,
        asset: AssetId,
        queue_index: usize,
    ) -> Result<CancelReceipt> {
        let spec = self.spec(asset)?;
        let state = self.state(owner)?;

        let mut queue = state.queue(spec.category).clone();
        let outcome = queue.cancel(queue_index, asset, self.now)?;
        // Batches ahead of the cancelled one are finished. Settle them first so
        // an upgrade kept from the cancelled batch finds its predecessor in
        // inventory.
        let mut promotions = queue.settle(self.now);
        promotions.push(Promotion {
            asset,
            quantity: outcome.produced,
        });
        // Pay out with the old queue so the finished units earn up to now.
        let (account, _) = refreshed_account(&self.catalog, &self.config, state, self.now);

        let refund_owed = u128::from(spec.price)
            .saturating_mul(u128::from(outcome.unproduced))
            .saturating_mul(u128::from(self.config.refund_percent))
            / 100;
        let refund = u64::try_from(refund_owed).unwrap_or(u64::MAX);
        let category = spec.category;
        let resource_kind = spec.resource_kind;

        let Some(state) = self.owners.get_mut(&owner) else {
            return Err(GameError::UnknownOwner(owner));
        };
        state.account = account;
        *state.queue_mut(category) = queue;
        promote(&self.catalog, &self.config, state, &promotions);
        let capacity = capacity_of(
            &self.catalog,
            self.config.base_capacity,
            &holdings_view(&self.catalog, state, self.now),
        );
        let refund_kept = state.account.credit(resource_kind, refund, capacity);

        tracing::debug!(
            owner = %owner,
            asset = %asset,
            index = queue_index,
            promoted = outcome.produced,
            refunded = outcome.unproduced,
            refund,
            "Batch cancelled"
        );
        Ok(CancelReceipt {
            asset,
            promoted: outcome.produced,
            refunded_quantity: outcome.unproduced,
            refund,
            refund_kept,
            shift: outcome.shift,
        })
    }

    /// Move every finished unit of both queues into inventory.
    ///
    /// Idempotent at a fixed tick and a no-op on empty queues.
    pub fn settle(&mut self, owner: OwnerId) -> Result<Vec<Promotion>> {
        self.state(owner)?;
        let now = self.now;
        let Some(state) = self.owners.get_mut(&owner) else {
            return Err(GameError::UnknownOwner(owner));
        };
        let promotions = settle_state(&self.catalog, &self.config, state, now);
        if !promotions.is_empty() {
            tracing::debug!(owner = %owner, tick = now, batches = promotions.len(), "Settled");
        }
        Ok(promotions)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Encode owners, attack history and clock.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = RealmSnapshot {
            version: SNAPSHOT_VERSION,
            now: self.now,
            owners: self.owners.clone(),
            matches: self.matches.clone(),
        };
        bincode::serialize(&snapshot)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize realm: {e}")))
    }

    /// Replace owners, attack history and clock with a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or the version does not match.
    pub fn restore(&mut self, data: &[u8]) -> Result<()> {
        let snapshot: RealmSnapshot = bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize realm: {e}")))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GameError::InvalidState(format!(
                "Snapshot version mismatch: expected {SNAPSHOT_VERSION}, got {}",
                snapshot.version
            )));
        }
        self.now = snapshot.now;
        self.owners = snapshot.owners;
        self.matches = snapshot.matches;
        Ok(())
    }

    /// Hash of the mutable state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.now.hash(&mut hasher);
        self.owners.hash(&mut hasher);
        self.matches.hash(&mut hasher);
        hasher.finish()
    }
}

// ----------------------------------------------------------------------
// State helpers shared with the battle module
// ----------------------------------------------------------------------

pub(crate) fn holdings_view<C: AssetCatalog>(
    catalog: &C,
    state: &OwnerState,
    now: Tick,
) -> Inventory {
    let mut holdings = state.inventory.clone();
    for batch in state.all_batches() {
        let ready = batch.ready_quantity(now);
        if ready == 0 {
            continue;
        }
        holdings.add(batch.asset, ready);
        if let Some(previous) = catalog.get_spec(batch.asset).and_then(|s| s.upgrade_of) {
            holdings.remove(previous, ready);
        }
    }
    holdings
}

pub(crate) fn capacity_of<C: AssetCatalog>(
    catalog: &C,
    base: ResourcePair,
    holdings: &Inventory,
) -> ResourcePair {
    holdings
        .iter()
        .fold(base, |capacity, (asset, qty)| match catalog.get_spec(asset) {
            Some(spec) => capacity.saturating_add_scaled(spec.capacity_contribution, u64::from(qty)),
            None => capacity,
        })
}

fn settled_rates<C: AssetCatalog>(catalog: &C, base: ResourcePair, inventory: &Inventory) -> ResourcePair {
    inventory
        .iter()
        .fold(base, |rates, (asset, qty)| match catalog.get_spec(asset) {
            Some(spec) => rates.saturating_add_scaled(spec.rate_contribution, u64::from(qty)),
            None => rates,
        })
}

fn queue_bonus<C: AssetCatalog>(catalog: &C, state: &OwnerState, now: Tick) -> QueueBonus {
    let since = state.account.last_payout;
    let mut bonus = QueueBonus::default();
    for batch in state.all_batches() {
        let Some(spec) = catalog.get_spec(batch.asset) else {
            continue;
        };
        let unit_ticks = batch.ready_unit_ticks(now, since);
        if unit_ticks == 0 {
            continue;
        }
        bonus.add(spec.rate_contribution, unit_ticks, false);
        if let Some(previous) = spec.upgrade_of.and_then(|id| catalog.get_spec(id)) {
            bonus.add(previous.rate_contribution, unit_ticks, true);
        }
    }
    bonus
}

pub(crate) fn refreshed_account<C: AssetCatalog>(
    catalog: &C,
    config: &RealmConfig,
    state: &OwnerState,
    now: Tick,
) -> (ResourceAccount, Payout) {
    let holdings = holdings_view(catalog, state, now);
    let capacity = capacity_of(catalog, config.base_capacity, &holdings);
    let mut account = state.account;
    let payout = account.accrue(now, queue_bonus(catalog, state, now), capacity);
    (account, payout)
}

/// Move promoted units into inventory and refresh the cached rates.
///
/// The caller must have paid out at the current tick first.
fn promote<C: AssetCatalog>(
    catalog: &C,
    config: &RealmConfig,
    state: &mut OwnerState,
    promotions: &[Promotion],
) {
    let mut rates_changed = false;
    for promotion in promotions.iter().filter(|p| p.quantity > 0) {
        state.inventory.add(promotion.asset, promotion.quantity);
        let Some(spec) = catalog.get_spec(promotion.asset) else {
            continue;
        };
        rates_changed |= spec.affects_rate();
        if let Some(previous) = spec.upgrade_of {
            state.inventory.remove(previous, promotion.quantity);
            rates_changed |= catalog.get_spec(previous).is_some_and(AssetSpec::affects_rate);
        }
    }
    if rates_changed {
        state.account.rates = settled_rates(catalog, config.base_rate, &state.inventory);
    }
}

pub(crate) fn settle_state<C: AssetCatalog>(
    catalog: &C,
    config: &RealmConfig,
    state: &mut OwnerState,
    now: Tick,
) -> Vec<Promotion> {
    let (account, _) = refreshed_account(catalog, config, state, now);
    state.account = account;
    let mut promotions = state.construction.settle(now);
    promotions.extend(state.training.settle(now));
    promote(catalog, config, state, &promotions);
    promotions
}

/// Refresh cached rates after an inventory change made outside settlement.
pub(crate) fn refresh_rates<C: AssetCatalog>(
    catalog: &C,
    config: &RealmConfig,
    state: &mut OwnerState,
) {
    state.account.rates = settled_rates(catalog, config.base_rate, &state.inventory);
}

fn pending_upgrades_of<C: AssetCatalog>(
    catalog: &C,
    state: &OwnerState,
    previous: AssetId,
    now: Tick,
) -> u32 {
    state
        .all_batches()
        .filter(|batch| {
            catalog
                .get_spec(batch.asset)
                .is_some_and(|spec| spec.upgrade_of == Some(previous))
        })
        .fold(0u32, |acc, batch| {
            acc.saturating_add(batch.quantity - batch.ready_quantity(now))
        })
}

fn check_type_class<C: AssetCatalog>(
    catalog: &C,
    state: &OwnerState,
    spec: &AssetSpec,
    quantity: u32,
    holdings: &Inventory,
    now: Tick,
) -> Result<()> {
    let Some(class) = spec.type_class else {
        return Ok(());
    };
    let conflict = GameError::DuplicateTypeClass {
        asset: spec.id,
        class,
    };
    if quantity > 1 {
        return Err(conflict);
    }
    let in_class = |asset: AssetId| {
        catalog
            .get_spec(asset)
            .is_some_and(|s| s.type_class == Some(class))
    };

    let mut members: u64 = holdings
        .iter()
        .filter(|(asset, _)| in_class(*asset))
        .map(|(_, qty)| u64::from(qty))
        .sum();
    members += state
        .all_batches()
        .filter(|batch| in_class(batch.asset))
        .map(|batch| u64::from(batch.quantity - batch.ready_quantity(now)))
        .sum::<u64>();

    // The member being upgraded is replaced, not duplicated.
    if let Some(previous) = spec.upgrade_of {
        if in_class(previous) && holdings.quantity(previous) > 0 {
            members -= 1;
        }
    }

    if members > 0 {
        return Err(conflict);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CombatStats, TypeClass};
    use crate::requirements::Prerequisite;

    const OWNER: OwnerId = OwnerId(1);

    const FARM: AssetId = AssetId(1);
    const STORAGE: AssetId = AssetId(2);
    const STORAGE_II: AssetId = AssetId(3);
    const MINE: AssetId = AssetId(4);
    const BARRACKS: AssetId = AssetId(5);
    const MINE_II: AssetId = AssetId(6);
    const SOLDIER: AssetId = AssetId(10);

    fn test_realm() -> Realm {
        let mut catalog = AssetRegistry::new();
        catalog.register(AssetSpec::building(FARM, "Farm", 20, ResourceKind::Gold, 10));
        catalog.register(
            AssetSpec::building(STORAGE, "Storage", 100, ResourceKind::Gold, 50)
                .with_capacity(ResourcePair::new(500, 500))
                .with_type_class(TypeClass(1)),
        );
        catalog.register(
            AssetSpec::building(STORAGE_II, "Storage II", 200, ResourceKind::Crystal, 100)
                .with_capacity(ResourcePair::new(2_000, 2_000))
                .with_upgrade_of(STORAGE)
                .with_type_class(TypeClass(1)),
        );
        catalog.register(
            AssetSpec::building(MINE, "Gold Mine", 50, ResourceKind::Gold, 20)
                .with_rate(ResourcePair::new(3, 0)),
        );
        catalog.register(
            AssetSpec::building(MINE_II, "Deep Mine", 50, ResourceKind::Crystal, 20)
                .with_rate(ResourcePair::new(5, 0))
                .with_upgrade_of(MINE),
        );
        catalog.register(AssetSpec::building(
            BARRACKS,
            "Barracks",
            80,
            ResourceKind::Gold,
            30,
        ));
        catalog.register(AssetSpec::unit(
            SOLDIER,
            "Soldier",
            10,
            ResourceKind::Gold,
            10,
            CombatStats::new(5, 2, 10),
        ));

        let mut graph = PrerequisiteGraph::new();
        graph.require(SOLDIER, Prerequisite::owns(BARRACKS));

        let config = RealmConfig {
            base_rate: ResourcePair::ZERO,
            ..RealmConfig::default()
        };
        let mut realm = Realm::new(catalog, graph, PointsTable::new(), config).unwrap();
        realm
            .register_owner(OWNER, Balances::new(1_000, 1_000, 0))
            .unwrap();
        realm
    }

    #[test]
    fn test_register_owner_validation() {
        let mut realm = test_realm();
        assert_eq!(
            realm.register_owner(OWNER, Balances::default()),
            Err(GameError::OwnerExists(OWNER))
        );
        assert_eq!(
            realm.register_owner(OwnerId(0), Balances::default()),
            Err(GameError::NullIdentifier("owner"))
        );
        assert_eq!(
            realm.payout(OwnerId(9)),
            Err(GameError::UnknownOwner(OwnerId(9)))
        );
    }

    #[test]
    fn test_advance_rejects_going_back() {
        let mut realm = test_realm();
        realm.advance_to(50).unwrap();
        assert_eq!(
            realm.advance_to(49),
            Err(GameError::TimeWentBackwards {
                now: 50,
                requested: 49
            })
        );
        assert_eq!(realm.now(), 50);
    }

    #[test]
    fn test_enqueue_debits_and_schedules() {
        let mut realm = test_realm();
        realm.advance_to(100).unwrap();

        let receipt = realm.enqueue(OWNER, FARM, 5).unwrap();
        assert_eq!((receipt.start, receipt.end), (100, 150));
        assert_eq!(receipt.cost, 100);
        assert_eq!(realm.balances(OWNER).unwrap().gold, 900);

        realm.advance_to(130).unwrap();
        assert_eq!(realm.get_ready_quantity(OWNER, FARM).unwrap(), 3);
        assert_eq!(realm.get_unsettled_quantity(OWNER, FARM).unwrap(), 5);
    }

    #[test]
    fn test_sequential_enqueues_do_not_overlap() {
        let mut realm = test_realm();
        let first = realm.enqueue(OWNER, FARM, 1).unwrap();
        let second = realm.enqueue(OWNER, FARM, 1).unwrap();
        assert_eq!((first.start, first.end), (0, 10));
        assert_eq!((second.start, second.end), (10, 20));
        assert_eq!(second.index, 1);
    }

    #[test]
    fn test_enqueue_validation_errors_leave_state_untouched() {
        let mut realm = test_realm();
        let before = realm.state_hash();

        assert_eq!(realm.enqueue(OWNER, FARM, 0), Err(GameError::ZeroQuantity));
        assert_eq!(
            realm.enqueue(OWNER, AssetId(0), 1),
            Err(GameError::NullIdentifier("asset"))
        );
        assert_eq!(
            realm.enqueue(OWNER, AssetId(99), 1),
            Err(GameError::UnknownAsset(AssetId(99)))
        );
        assert_eq!(
            realm.enqueue(OWNER, SOLDIER, 1),
            Err(GameError::RequirementNotMet(SOLDIER))
        );
        assert!(matches!(
            realm.enqueue(OWNER, FARM, 51),
            Err(GameError::InsufficientResources { .. })
        ));
        assert_eq!(realm.state_hash(), before);
    }

    #[test]
    fn test_requirement_satisfied_by_ready_building() {
        let mut realm = test_realm();
        realm.enqueue(OWNER, BARRACKS, 1).unwrap();
        realm.advance_to(30).unwrap();

        // Barracks is ready but not settled; training is already allowed.
        let receipt = realm.enqueue(OWNER, SOLDIER, 2).unwrap();
        assert_eq!(receipt.category, AssetCategory::Unit);
        assert_eq!((receipt.start, receipt.end), (30, 50));
    }

    #[test]
    fn test_construction_and_training_run_in_parallel() {
        let mut realm = test_realm();
        realm.enqueue(OWNER, BARRACKS, 1).unwrap();
        realm.advance_to(30).unwrap();
        realm.enqueue(OWNER, FARM, 1).unwrap();
        let soldiers = realm.enqueue(OWNER, SOLDIER, 1).unwrap();
        assert_eq!(soldiers.start, 30);
    }

    #[test]
    fn test_duplicate_type_class() {
        let mut realm = test_realm();
        realm.enqueue(OWNER, STORAGE, 1).unwrap();
        assert_eq!(
            realm.enqueue(OWNER, STORAGE, 1),
            Err(GameError::DuplicateTypeClass {
                asset: STORAGE,
                class: TypeClass(1)
            })
        );

        realm.advance_to(50).unwrap();
        // Upgrade replaces the ready storage rather than duplicating it.
        assert!(realm.enqueue(OWNER, STORAGE_II, 1).is_ok());
        assert!(matches!(
            realm.enqueue(OWNER, STORAGE_II, 1),
            Err(GameError::DuplicateTypeClass { .. } | GameError::RequirementNotMet(_))
        ));
    }

    #[test]
    fn test_upgrade_requires_predecessor() {
        let mut realm = test_realm();
        assert_eq!(
            realm.enqueue(OWNER, STORAGE_II, 1),
            Err(GameError::RequirementNotMet(STORAGE_II))
        );
    }

    #[test]
    fn test_capacity_counts_ready_storage_before_settle() {
        let mut realm = test_realm();
        assert_eq!(
            realm.calculate_capacity(OWNER).unwrap(),
            ResourcePair::new(1_000, 1_000)
        );

        realm.enqueue(OWNER, STORAGE, 1).unwrap();
        realm.advance_to(49).unwrap();
        assert_eq!(realm.calculate_capacity(OWNER).unwrap().gold, 1_000);
        realm.advance_to(50).unwrap();
        assert_eq!(realm.calculate_capacity(OWNER).unwrap().gold, 1_500);

        realm.enqueue(OWNER, STORAGE_II, 1).unwrap();
        realm.advance_to(150).unwrap();
        // Upgrade replaces the first storage's contribution.
        assert_eq!(realm.calculate_capacity(OWNER).unwrap().gold, 3_000);

        realm.settle(OWNER).unwrap();
        let state = realm.owner(OWNER).unwrap();
        assert_eq!(state.inventory.quantity(STORAGE), 0);
        assert_eq!(state.inventory.quantity(STORAGE_II), 1);
        assert_eq!(realm.calculate_capacity(OWNER).unwrap().gold, 3_000);
    }

    #[test]
    fn test_cancel_in_progress_promotes_and_refunds() {
        let mut realm = test_realm();
        realm.advance_to(100).unwrap();
        realm.enqueue(OWNER, FARM, 5).unwrap();
        realm.advance_to(130).unwrap();

        let receipt = realm.cancel(OWNER, FARM, 0).unwrap();
        assert_eq!(receipt.promoted, 3);
        assert_eq!(receipt.refunded_quantity, 2);
        // 2 × 20 × 60%
        assert_eq!(receipt.refund, 24);
        assert_eq!(receipt.refund_kept, 24);

        let state = realm.owner(OWNER).unwrap();
        assert_eq!(state.inventory.quantity(FARM), 3);
        assert!(state.construction.is_empty());
        assert_eq!(state.account.balances.gold, 924);
    }

    #[test]
    fn test_cancel_upgrade_behind_unsettled_predecessor() {
        let mut realm = test_realm();
        realm.enqueue(OWNER, MINE, 3).unwrap(); // [0, 60)
        realm.advance_to(60).unwrap();
        realm.enqueue(OWNER, MINE_II, 3).unwrap(); // [60, 120)
        realm.advance_to(100).unwrap();

        let holdings = realm.holdings(OWNER).unwrap();
        assert_eq!(holdings.quantity(MINE), 1);
        assert_eq!(holdings.quantity(MINE_II), 2);

        let receipt = realm.cancel(OWNER, MINE_II, 1).unwrap();
        assert_eq!(receipt.promoted, 2);
        realm.settle(OWNER).unwrap();

        let state = realm.owner(OWNER).unwrap();
        assert!(state.construction.is_empty());
        assert_eq!(state.inventory.quantity(MINE), 1);
        assert_eq!(state.inventory.quantity(MINE_II), 2);
        assert_eq!(state.account.rates.gold, 3 + 2 * 5);
        assert_eq!(realm.holdings(OWNER).unwrap(), state.inventory);
    }

    #[test]
    fn test_cancel_errors() {
        let mut realm = test_realm();
        realm.enqueue(OWNER, FARM, 1).unwrap();
        assert_eq!(
            realm.cancel(OWNER, MINE, 0),
            Err(GameError::BatchNotFound {
                asset: MINE,
                index: 0
            })
        );
        realm.advance_to(10).unwrap();
        assert_eq!(
            realm.cancel(OWNER, FARM, 0),
            Err(GameError::AlreadyCompleted { index: 0 })
        );
    }

    #[test]
    fn test_settle_idempotent() {
        let mut realm = test_realm();
        realm.enqueue(OWNER, FARM, 4).unwrap();
        realm.advance_to(25).unwrap();

        let promotions = realm.settle(OWNER).unwrap();
        assert_eq!(
            promotions,
            vec![Promotion {
                asset: FARM,
                quantity: 2
            }]
        );
        let hash = realm.state_hash();
        assert!(realm.settle(OWNER).unwrap().is_empty());
        assert_eq!(realm.state_hash(), hash);
    }

    #[test]
    fn test_ready_mine_earns_before_settle() {
        let mut realm = test_realm();
        realm.enqueue(OWNER, MINE, 1).unwrap(); // ready at 20, costs 50
        realm.advance_to(30).unwrap();

        // 950 after the order, plus 10 ticks × 3 gold from the ready mine
        assert_eq!(realm.balances(OWNER).unwrap().gold, 980);

        // Settling changes bookkeeping, not the balance.
        realm.settle(OWNER).unwrap();
        assert_eq!(realm.owner(OWNER).unwrap().account.balances.gold, 980);
        assert_eq!(realm.owner(OWNER).unwrap().account.rates.gold, 3);
        realm.advance_to(35).unwrap();
        assert_eq!(realm.balances(OWNER).unwrap().gold, 995);
    }

    #[test]
    fn test_payout_settle_order_does_not_matter() {
        let mut settled = test_realm();
        let mut lazy = test_realm();
        for realm in [&mut settled, &mut lazy] {
            realm.consume(OWNER, ResourceKind::Gold, 500).unwrap();
            realm.enqueue(OWNER, MINE, 3).unwrap(); // ready at 20, 40, 60
        }
        for tick in [15, 25, 45, 70, 90] {
            settled.advance_to(tick).unwrap();
            settled.settle(OWNER).unwrap();
            lazy.advance_to(tick).unwrap();
        }
        // 350 + 3 × (70 + 50 + 30)
        assert_eq!(lazy.balances(OWNER).unwrap().gold, 800);
        assert_eq!(
            settled.balances(OWNER).unwrap(),
            lazy.balances(OWNER).unwrap()
        );
    }

    #[test]
    fn test_consume_and_credit() {
        let mut realm = test_realm();
        realm.consume(OWNER, ResourceKind::Gold, 400).unwrap();
        assert_eq!(realm.balances(OWNER).unwrap().gold, 600);

        assert!(matches!(
            realm.consume(OWNER, ResourceKind::Gold, 601),
            Err(GameError::InsufficientResources { .. })
        ));

        let kept = realm.credit(OWNER, ResourceKind::Gold, 1_000).unwrap();
        assert_eq!(kept, 400);
        assert_eq!(realm.balances(OWNER).unwrap().gold, 1_000);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut realm = test_realm();
        realm.enqueue(OWNER, FARM, 3).unwrap();
        realm.advance_to(15).unwrap();
        let bytes = realm.snapshot().unwrap();
        let hash = realm.state_hash();

        let mut restored = test_realm();
        restored.restore(&bytes).unwrap();
        assert_eq!(restored.state_hash(), hash);
        assert_eq!(restored.get_ready_quantity(OWNER, FARM).unwrap(), 1);

        assert!(matches!(
            restored.restore(&[1, 2, 3]),
            Err(GameError::InvalidState(_))
        ));
    }
}
