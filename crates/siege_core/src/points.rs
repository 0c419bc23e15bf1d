//! Owner points, kept by an external ranking component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::realm::OwnerId;

/// Read/write access to owner points.
///
/// The core reads points for matchmaking and never adjusts them itself;
/// `adjust_points` is part of the trait so hosts can drive one component.
pub trait PointsLedger {
    /// Current points of an owner (0 if unknown).
    fn get_points(&self, owner: OwnerId) -> u64;

    /// Apply a signed delta, clamping at zero.
    fn adjust_points(&mut self, owner: OwnerId, delta: i64);
}

/// Points kept in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsTable {
    points: BTreeMap<OwnerId, u64>,
}

impl PointsTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an owner's points directly.
    pub fn set_points(&mut self, owner: OwnerId, points: u64) {
        self.points.insert(owner, points);
    }
}

impl PointsLedger for PointsTable {
    fn get_points(&self, owner: OwnerId) -> u64 {
        self.points.get(&owner).copied().unwrap_or(0)
    }

    fn adjust_points(&mut self, owner: OwnerId, delta: i64) {
        let entry = self.points.entry(owner).or_insert(0);
        *entry = if delta >= 0 {
            entry.saturating_add(delta.unsigned_abs())
        } else {
            entry.saturating_sub(delta.unsigned_abs())
        };
    }
}
