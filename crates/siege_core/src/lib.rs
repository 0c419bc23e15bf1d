//! # Siege Core
//!
//! Deterministic backend for a persistent village-and-army strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (integers and widened intermediates only)
//!
//! Time is a caller-supplied tick. Nothing advances in the background: queue
//! progress and resource income are derived from stored timestamps whenever
//! an operation needs them.
//!
//! ## Crate Structure
//!
//! - [`production`] - Per-owner FIFO production queues
//! - [`ledger`] - Lazily accrued resource balances
//! - [`combat`] - Pure battle resolution
//! - [`matchmaking`] - Attack cooldowns, points range and revenge
//! - [`realm`] - Owner arena tying it all together
//! - [`data`] - RON catalog definitions

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod catalog;
pub mod combat;
pub mod config;
pub mod data;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod matchmaking;
pub mod points;
pub mod production;
pub mod realm;
pub mod requirements;
pub mod resources;

/// Simulation time. Monotonic, supplied by the host.
pub type Tick = u64;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::BattleReport;
    pub use crate::catalog::{
        AssetCatalog, AssetCategory, AssetId, AssetRegistry, AssetSpec, CombatStats, TypeClass,
    };
    pub use crate::combat::{resolve_combat, BattleModifiers, BattleOutcome, Combatant};
    pub use crate::config::RealmConfig;
    pub use crate::error::{ErrorKind, GameError, Result};
    pub use crate::inventory::Inventory;
    pub use crate::matchmaking::AttackClearance;
    pub use crate::points::{PointsLedger, PointsTable};
    pub use crate::production::Promotion;
    pub use crate::realm::{CancelReceipt, EnqueueReceipt, OwnerId, Realm};
    pub use crate::requirements::{Prerequisite, PrerequisiteGraph, RequirementGraph};
    pub use crate::resources::{Balances, ResourceKind, ResourcePair};
    pub use crate::Tick;
}
