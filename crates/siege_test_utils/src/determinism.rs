//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a realm produces identical state
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! The realm is replayed from a list of [`Command`]s. Sources of
//! non-determinism to guard against:
//!
//! - **HashMap iteration order**: the default hasher is randomized, so all
//!   owner-visible state lives in ordered maps.
//! - **Floating-point math**: every formula is integer-only.
//! - **Implicit time**: the clock only moves through [`Command::Advance`].

use std::thread;

use serde::{Deserialize, Serialize};
use siege_core::prelude::*;

/// One realm operation, as recorded in a test script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Move the clock forward by this many ticks.
    Advance(Tick),
    /// Order units.
    Enqueue {
        /// Ordering owner.
        owner: OwnerId,
        /// Asset ordered.
        asset: AssetId,
        /// Units ordered.
        quantity: u32,
    },
    /// Cancel a queued batch.
    Cancel {
        /// Owning owner.
        owner: OwnerId,
        /// Asset of the batch.
        asset: AssetId,
        /// Queue index of the batch.
        index: usize,
    },
    /// Settle both queues.
    Settle(OwnerId),
    /// Bring balances up to date.
    Payout(OwnerId),
    /// Attack another owner.
    Attack {
        /// Attacking owner.
        attacker: OwnerId,
        /// Defending owner.
        defender: OwnerId,
        /// Units sent.
        units: Vec<AssetId>,
        /// Quantities sent, parallel to `units`.
        quantities: Vec<u32>,
    },
}

/// Apply one command, returning whatever error the realm reported.
pub fn apply(realm: &mut Realm, command: &Command) -> Result<()> {
    match command {
        Command::Advance(delta) => realm.advance_to(realm.now().saturating_add(*delta)),
        Command::Enqueue {
            owner,
            asset,
            quantity,
        } => realm.enqueue(*owner, *asset, *quantity).map(drop),
        Command::Cancel {
            owner,
            asset,
            index,
        } => realm.cancel(*owner, *asset, *index).map(drop),
        Command::Settle(owner) => realm.settle(*owner).map(drop),
        Command::Payout(owner) => realm.payout(*owner).map(drop),
        Command::Attack {
            attacker,
            defender,
            units,
            quantities,
        } => realm.attack(*attacker, *defender, units, quantities).map(drop),
    }
}

/// Apply every command, ignoring rejected ones, and return the final hash.
pub fn replay(realm: &mut Realm, commands: &[Command]) -> u64 {
    for command in commands {
        if let Err(err) = apply(realm, command) {
            tracing::trace!(?command, %err, "Command rejected");
        }
    }
    realm.state_hash()
}

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic realm).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Realm is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Replay a script against fresh realms several times and compare hashes.
pub fn verify_determinism<Setup>(runs: usize, setup: Setup, commands: &[Command]) -> DeterminismResult
where
    Setup: Fn() -> Realm,
{
    let hashes: Vec<u64> = (0..runs)
        .map(|_| {
            let mut realm = setup();
            replay(&mut realm, commands)
        })
        .collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
    }
}

/// Replay a script on `threads` threads at once and compare hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn verify_parallel_determinism<Setup>(
    threads: usize,
    setup: Setup,
    commands: &[Command],
) -> DeterminismResult
where
    Setup: Fn() -> Realm + Sync,
{
    let hashes: Vec<u64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    let mut realm = setup();
                    replay(&mut realm, commands)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("replay thread panicked"))
            .collect()
    });
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
    }
}
