//! Scripted realm scenarios.
//!
//! A scenario bundles a catalog, a config, starting owners and a list of
//! steps. Running it applies every step in order and records what each one
//! returned, rejected steps included, so a script doubles as a regression
//! fixture.

use std::path::Path;

use serde::{Deserialize, Serialize};
use siege_core::catalog::AssetId;
use siege_core::config::RealmConfig;
use siege_core::data::CatalogData;
use siege_core::error::ErrorKind;
use siege_core::points::PointsTable;
use siege_core::realm::{OwnerId, Realm};
use siege_core::resources::{Balances, ResourceKind, ResourcePair};
use siege_core::Tick;

use crate::error::{read_file, Result};

/// Starting state of one owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerSetup {
    /// Owner id, never 0.
    pub id: u64,
    /// Starting balances.
    #[serde(default)]
    pub balances: Balances,
    /// Starting ranking points.
    #[serde(default)]
    pub points: u64,
}

/// One scripted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Move the clock forward by a number of ticks.
    Advance(Tick),
    /// Move the clock to an absolute tick.
    AdvanceTo(Tick),
    /// Order units.
    Enqueue {
        /// Owner id.
        owner: u64,
        /// Asset id.
        asset: u32,
        /// Units ordered.
        quantity: u32,
    },
    /// Cancel a queued batch.
    Cancel {
        /// Owner id.
        owner: u64,
        /// Asset id.
        asset: u32,
        /// Queue index.
        index: usize,
    },
    /// Settle both queues.
    Settle(u64),
    /// Bring balances up to date.
    Payout(u64),
    /// Debit resources.
    Consume {
        /// Owner id.
        owner: u64,
        /// Resource debited.
        resource: ResourceKind,
        /// Amount debited.
        amount: u64,
    },
    /// Credit resources.
    Credit {
        /// Owner id.
        owner: u64,
        /// Resource credited.
        resource: ResourceKind,
        /// Amount credited.
        amount: u64,
    },
    /// Overwrite an owner's ranking points.
    SetPoints {
        /// Owner id.
        owner: u64,
        /// New points.
        points: u64,
    },
    /// Attack another owner with `(unit, quantity)` pairs.
    Attack {
        /// Attacking owner id.
        attacker: u64,
        /// Defending owner id.
        defender: u64,
        /// Units sent.
        units: Vec<(u32, u32)>,
    },
}

/// A complete scenario file.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     name: "Mine rush",
///     catalog: CatalogData(assets: [
///         AssetData(id: 1, name: "Mine", category: Building, price: 50,
///             production_time: 20, rate: (gold: 3)),
///     ]),
///     owners: [OwnerSetup(id: 1, balances: (gold: 500))],
///     steps: [
///         Enqueue(owner: 1, asset: 1, quantity: 2),
///         Advance(60),
///         Settle(1),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Realm tunables; defaults when omitted.
    #[serde(default)]
    pub config: RealmConfig,
    /// Assets and prerequisites.
    pub catalog: CatalogData,
    /// Starting owners.
    pub owners: Vec<OwnerSetup>,
    /// Operations to apply in order.
    pub steps: Vec<Step>,
}

/// What a step returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step succeeded; `value` is its receipt.
    Applied {
        /// Receipt encoded as JSON.
        value: serde_json::Value,
    },
    /// The realm refused the step.
    Rejected {
        /// Error classification.
        kind: ErrorKind,
        /// Error message.
        message: String,
    },
}

/// One line of the run log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Tick after the step.
    pub tick: Tick,
    /// The step itself.
    pub step: Step,
    /// What happened.
    pub outcome: StepOutcome,
}

/// Final state of one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerReport {
    /// Owner.
    pub owner: OwnerId,
    /// Balances as of the final tick.
    pub balances: Balances,
    /// Storage limit.
    pub capacity: ResourcePair,
    /// Owned and ready assets.
    pub holdings: Vec<(AssetId, u32)>,
    /// Units still queued, both queues.
    pub queued_units: u64,
}

/// Result of running a scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Per-step log.
    pub steps: Vec<StepReport>,
    /// Final owner states, in id order.
    pub owners: Vec<OwnerReport>,
    /// Hash of the final realm state.
    pub state_hash: u64,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = read_file(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let scenario: Self = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Build the starting realm.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or config is invalid or owners clash.
    pub fn build_realm(&self) -> Result<Realm> {
        let errors = self.catalog.validate();
        if !errors.is_empty() {
            return Err(siege_core::error::GameError::DataParseError {
                path: self.name.clone(),
                message: errors.join("; "),
            }
            .into());
        }
        let mut points = PointsTable::new();
        for owner in &self.owners {
            points.set_points(OwnerId(owner.id), owner.points);
        }
        let mut realm = Realm::new(
            self.catalog.to_registry(),
            self.catalog.to_graph(),
            points,
            self.config,
        )?;
        for owner in &self.owners {
            realm.register_owner(OwnerId(owner.id), owner.balances)?;
        }
        Ok(realm)
    }

    /// Run every step and report the outcome.
    ///
    /// Rejected steps are logged, not fatal.
    ///
    /// # Errors
    ///
    /// Returns an error only if the starting realm cannot be built.
    pub fn run(&self) -> Result<ScenarioReport> {
        let mut realm = self.build_realm()?;
        let mut steps = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let outcome = match apply_step(&mut realm, step) {
                Ok(value) => StepOutcome::Applied { value },
                Err(err) => {
                    tracing::debug!(?step, %err, "Step rejected");
                    StepOutcome::Rejected {
                        kind: err.kind(),
                        message: err.to_string(),
                    }
                }
            };
            steps.push(StepReport {
                tick: realm.now(),
                step: step.clone(),
                outcome,
            });
        }

        let owners = realm
            .owner_ids()
            .filter_map(|owner| owner_report(&realm, owner))
            .collect();

        tracing::info!(name = %self.name, steps = steps.len(), "Scenario finished");
        Ok(ScenarioReport {
            name: self.name.clone(),
            steps,
            owners,
            state_hash: realm.state_hash(),
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> siege_core::error::Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| {
        siege_core::error::GameError::InvalidState(format!("Failed to encode receipt: {e}"))
    })
}

fn apply_step(realm: &mut Realm, step: &Step) -> siege_core::error::Result<serde_json::Value> {
    match step {
        Step::Advance(delta) => {
            realm.advance_to(realm.now().saturating_add(*delta))?;
            to_json(&realm.now())
        }
        Step::AdvanceTo(tick) => {
            realm.advance_to(*tick)?;
            to_json(&realm.now())
        }
        Step::Enqueue {
            owner,
            asset,
            quantity,
        } => to_json(&realm.enqueue(OwnerId(*owner), AssetId(*asset), *quantity)?),
        Step::Cancel {
            owner,
            asset,
            index,
        } => to_json(&realm.cancel(OwnerId(*owner), AssetId(*asset), *index)?),
        Step::Settle(owner) => to_json(&realm.settle(OwnerId(*owner))?),
        Step::Payout(owner) => to_json(&realm.payout(OwnerId(*owner))?),
        Step::Consume {
            owner,
            resource,
            amount,
        } => {
            realm.consume(OwnerId(*owner), *resource, *amount)?;
            to_json(amount)
        }
        Step::Credit {
            owner,
            resource,
            amount,
        } => to_json(&realm.credit(OwnerId(*owner), *resource, *amount)?),
        Step::SetPoints { owner, points } => {
            realm.points_mut().set_points(OwnerId(*owner), *points);
            to_json(points)
        }
        Step::Attack {
            attacker,
            defender,
            units,
        } => {
            let (ids, quantities): (Vec<AssetId>, Vec<u32>) =
                units.iter().map(|&(id, qty)| (AssetId(id), qty)).unzip();
            to_json(&realm.attack(OwnerId(*attacker), OwnerId(*defender), &ids, &quantities)?)
        }
    }
}

fn owner_report(realm: &Realm, owner: OwnerId) -> Option<OwnerReport> {
    let state = realm.owner(owner)?;
    Some(OwnerReport {
        owner,
        balances: realm.balances(owner).ok()?,
        capacity: realm.calculate_capacity(owner).ok()?,
        holdings: realm.holdings(owner).ok()?.iter().collect(),
        queued_units: state.construction.total_quantity() + state.training.total_quantity(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINE_RUSH: &str = r#"
        Scenario(
            name: "Mine rush",
            config: (base_rate: (gold: 0, crystal: 0)),
            catalog: CatalogData(assets: [
                AssetData(id: 1, name: "Mine", category: Building, price: 50,
                    production_time: 20, rate: (gold: 3)),
            ]),
            owners: [OwnerSetup(id: 1, balances: (gold: 500))],
            steps: [
                Enqueue(owner: 1, asset: 1, quantity: 2),
                Advance(60),
                Settle(1),
                Enqueue(owner: 1, asset: 1, quantity: 0),
                Cancel(owner: 1, asset: 1, index: 0),
            ],
        )
    "#;

    #[test]
    fn test_run_mine_rush() {
        let scenario = Scenario::from_ron_str(MINE_RUSH).unwrap();
        let report = scenario.run().unwrap();

        assert_eq!(report.steps.len(), 5);
        assert!(matches!(report.steps[0].outcome, StepOutcome::Applied { .. }));
        assert_eq!(report.steps[1].tick, 60);
        assert!(matches!(
            report.steps[3].outcome,
            StepOutcome::Rejected {
                kind: ErrorKind::Validation,
                ..
            }
        ));
        assert!(matches!(
            report.steps[4].outcome,
            StepOutcome::Rejected {
                kind: ErrorKind::State,
                ..
            }
        ));

        let owner = &report.owners[0];
        // 400 after orders, mines ready at 20 and 40: 3 × (40 + 20)
        assert_eq!(owner.balances.gold, 580);
        assert_eq!(owner.holdings, vec![(AssetId(1), 2)]);
        assert_eq!(owner.queued_units, 0);
    }

    #[test]
    fn test_run_is_repeatable() {
        let scenario = Scenario::from_ron_str(MINE_RUSH).unwrap();
        let first = scenario.run().unwrap();
        let second = scenario.run().unwrap();
        assert_eq!(first.state_hash, second.state_hash);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = Scenario::from_ron_str(MINE_RUSH).unwrap().run().unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][3]["outcome"]["status"], "rejected");
        assert_eq!(json["steps"][0]["outcome"]["value"]["end"], 40);
    }
}
