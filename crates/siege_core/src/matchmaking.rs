//! Attack legality: cooldowns, points range and revenge.
//!
//! Per attacker the gate is a two-state machine:
//!
//! ```text
//! Idle --(successful attack at t)--> Cooldown(until t + cooldown_period) --(time)--> Idle
//! ```
//!
//! Independently, a successful attack between owners whose points are in
//! range hands the defender a one-shot revenge flag against that attacker,
//! letting the defender strike back later even after points drift apart.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::realm::OwnerId;
use crate::Tick;

/// Tunables for the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Ticks an attacker must wait between attacks.
    pub cooldown_period: Tick,
    /// Lowest defender points, as a percentage of the attacker's.
    pub lower_threshold: u64,
    /// Highest defender points, as a percentage of the attacker's.
    pub upper_threshold: u64,
    /// Ticks a revenge flag stays usable.
    pub revenge_time_threshold: Tick,
}

/// Why an attack was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackClearance {
    /// Points are within range.
    PointsRange,
    /// Points are out of range but the attacker holds a revenge flag.
    Revenge,
}

/// Whether `defender` points fall within `[lower%, upper%]` of `attacker` points.
#[must_use]
pub fn points_in_range(attacker: u64, defender: u64, lower: u64, upper: u64) -> bool {
    let scaled = u128::from(defender) * 100;
    let low = u128::from(attacker) * u128::from(lower);
    let high = u128::from(attacker) * u128::from(upper);
    low <= scaled && scaled <= high
}

/// Attack history shared by all owners.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MatchState {
    last_attack: BTreeMap<OwnerId, Tick>,
    /// (avenger, target) → tick at which the flag expires.
    revenge: BTreeMap<(OwnerId, OwnerId), Tick>,
}

impl MatchState {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick of the owner's last successful attack.
    #[must_use]
    pub fn last_attack(&self, owner: OwnerId) -> Option<Tick> {
        self.last_attack.get(&owner).copied()
    }

    /// First tick at which the owner may attack again, if cooling down at `now`.
    #[must_use]
    pub fn cooldown_until(&self, owner: OwnerId, now: Tick, rules: &MatchRules) -> Option<Tick> {
        let until = self
            .last_attack(owner)?
            .saturating_add(rules.cooldown_period);
        (now < until).then_some(until)
    }

    /// Whether `avenger` holds an unexpired revenge flag against `target`.
    #[must_use]
    pub fn has_revenge(&self, avenger: OwnerId, target: OwnerId, now: Tick) -> bool {
        self.revenge
            .get(&(avenger, target))
            .is_some_and(|expiry| now < *expiry)
    }

    /// Check cooldown and matchmaking for an attack.
    ///
    /// Identity checks (self-attack, registration) belong to the caller.
    pub fn check(
        &self,
        attacker: OwnerId,
        defender: OwnerId,
        now: Tick,
        points: (u64, u64),
        rules: &MatchRules,
    ) -> Result<AttackClearance> {
        if let Some(until) = self.cooldown_until(attacker, now, rules) {
            return Err(GameError::OnCooldown { until });
        }
        if points_in_range(points.0, points.1, rules.lower_threshold, rules.upper_threshold) {
            return Ok(AttackClearance::PointsRange);
        }
        if self.has_revenge(attacker, defender, now) {
            return Ok(AttackClearance::Revenge);
        }
        Err(GameError::NotInPointsRange)
    }

    /// Record a successful attack.
    ///
    /// Starts the attacker's cooldown, consumes a revenge flag if the attack
    /// relied on one, and grants the defender a flag when points were in range.
    pub fn record_attack(
        &mut self,
        attacker: OwnerId,
        defender: OwnerId,
        now: Tick,
        clearance: AttackClearance,
        rules: &MatchRules,
    ) {
        self.last_attack.insert(attacker, now);
        if clearance == AttackClearance::Revenge {
            self.revenge.remove(&(attacker, defender));
        } else {
            self.revenge.insert(
                (defender, attacker),
                now.saturating_add(rules.revenge_time_threshold),
            );
        }
    }

    /// Drop revenge flags that expired at or before `now`.
    pub fn prune_expired(&mut self, now: Tick) {
        self.revenge.retain(|_, expiry| now < *expiry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: OwnerId = OwnerId(1);
    const B: OwnerId = OwnerId(2);

    const RULES: MatchRules = MatchRules {
        cooldown_period: 100,
        lower_threshold: 50,
        upper_threshold: 200,
        revenge_time_threshold: 1_000,
    };

    #[test]
    fn test_points_in_range() {
        assert!(points_in_range(100, 100, 50, 200));
        assert!(points_in_range(100, 50, 50, 200));
        assert!(points_in_range(100, 200, 50, 200));
        assert!(!points_in_range(100, 49, 50, 200));
        assert!(!points_in_range(100, 201, 50, 200));
        assert!(points_in_range(0, 0, 50, 200));
        assert!(!points_in_range(0, 1, 50, 200));
    }

    #[test]
    fn test_cooldown_cycle() {
        let mut state = MatchState::new();
        assert_eq!(state.check(A, B, 0, (100, 100), &RULES), Ok(AttackClearance::PointsRange));

        state.record_attack(A, B, 10, AttackClearance::PointsRange, &RULES);
        assert_eq!(
            state.check(A, B, 50, (100, 100), &RULES),
            Err(GameError::OnCooldown { until: 110 })
        );
        assert!(state.check(A, B, 110, (100, 100), &RULES).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let state = MatchState::new();
        assert_eq!(
            state.check(A, B, 0, (1_000, 10), &RULES),
            Err(GameError::NotInPointsRange)
        );
    }

    #[test]
    fn test_revenge_flag_granted_and_consumed() {
        let mut state = MatchState::new();
        state.record_attack(A, B, 0, AttackClearance::PointsRange, &RULES);
        assert!(state.has_revenge(B, A, 5));
        assert!(!state.has_revenge(A, B, 5));

        // Points drifted apart, revenge still applies
        assert_eq!(
            state.check(B, A, 5, (10, 1_000), &RULES),
            Ok(AttackClearance::Revenge)
        );
        state.record_attack(B, A, 5, AttackClearance::Revenge, &RULES);
        assert!(!state.has_revenge(B, A, 6));
        // A revenge attack does not hand out a counter-flag
        assert!(!state.has_revenge(A, B, 6));
    }

    #[test]
    fn test_revenge_flag_expires() {
        let mut state = MatchState::new();
        state.record_attack(A, B, 0, AttackClearance::PointsRange, &RULES);
        assert!(state.has_revenge(B, A, 999));
        assert!(!state.has_revenge(B, A, 1_000));

        state.prune_expired(1_000);
        assert_eq!(state, {
            let mut expected = MatchState::new();
            expected.last_attack.insert(A, 0);
            expected
        });
    }
}
