//! Per-owner resource balances with lazy accrual.
//!
//! Nothing ticks in the background. An account stores the tick of its last
//! payout and a cached production rate; [`ResourceAccount::accrue`] brings the
//! balances up to date in one step whenever a decision depends on them.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::resources::{Balances, ResourceKind, ResourcePair};
use crate::Tick;

/// Extra income earned between payouts by producers that are finished but
/// still sitting in a queue. Signed because a ready upgrade replaces the
/// output of the asset it upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueBonus {
    /// Gold earned (or forgone) by ready queued assets.
    pub gold: i128,
    /// Crystal earned (or forgone) by ready queued assets.
    pub crystal: i128,
}

impl QueueBonus {
    /// Add `unit_ticks` worth of a rate contribution, negated when `replaced`.
    pub fn add(&mut self, rate: ResourcePair, unit_ticks: u128, replaced: bool) {
        let ticks = i128::try_from(unit_ticks).unwrap_or(i128::MAX);
        let gold = i128::from(rate.gold).saturating_mul(ticks);
        let crystal = i128::from(rate.crystal).saturating_mul(ticks);
        if replaced {
            self.gold = self.gold.saturating_sub(gold);
            self.crystal = self.crystal.saturating_sub(crystal);
        } else {
            self.gold = self.gold.saturating_add(gold);
            self.crystal = self.crystal.saturating_add(crystal);
        }
    }
}

/// Resources gained by one payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payout {
    /// Ticks covered by this payout.
    pub elapsed: Tick,
    /// Amount actually added (after the capacity clamp).
    pub gained: ResourcePair,
}

/// Balances, last payout tick and cached production rate of one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAccount {
    /// Current balances.
    pub balances: Balances,
    /// Tick of the most recent payout.
    pub last_payout: Tick,
    /// Per-tick production from settled inventory plus the base rate.
    pub rates: ResourcePair,
}

impl ResourceAccount {
    /// Create an account paid out up to `now`.
    #[must_use]
    pub const fn new(balances: Balances, now: Tick, rates: ResourcePair) -> Self {
        Self {
            balances,
            last_payout: now,
            rates,
        }
    }

    /// Accrue income up to `now`, clamped to `capacity`.
    ///
    /// `balance = min(capacity, balance + elapsed * rate + bonus)` for gold and
    /// crystal; the scarce balance never accrues.
    pub fn accrue(&mut self, now: Tick, bonus: QueueBonus, capacity: ResourcePair) -> Payout {
        let elapsed = now.saturating_sub(self.last_payout);
        let before = self.balances.renewable();

        self.balances.gold = accrued(
            self.balances.gold,
            self.rates.gold,
            elapsed,
            bonus.gold,
            capacity.gold,
        );
        self.balances.crystal = accrued(
            self.balances.crystal,
            self.rates.crystal,
            elapsed,
            bonus.crystal,
            capacity.crystal,
        );
        self.last_payout = self.last_payout.max(now);

        Payout {
            elapsed,
            gained: ResourcePair::new(
                self.balances.gold.saturating_sub(before.gold),
                self.balances.crystal.saturating_sub(before.crystal),
            ),
        }
    }

    /// Check if the account can pay `amount` of `kind`.
    #[must_use]
    pub const fn can_afford(&self, kind: ResourceKind, amount: u64) -> bool {
        self.balances.get(kind) >= amount
    }

    /// Debit `amount` of `kind`, failing without change if the balance is short.
    pub fn consume(&mut self, kind: ResourceKind, amount: u64) -> Result<()> {
        let available = self.balances.get(kind);
        if !self.can_afford(kind, amount) {
            return Err(GameError::InsufficientResources {
                resource: kind,
                required: amount,
                available,
            });
        }
        *self.balances.get_mut(kind) = available - amount;
        Ok(())
    }

    /// Add `amount` of `kind`, discarding anything above capacity.
    ///
    /// Returns the amount actually kept.
    pub fn credit(&mut self, kind: ResourceKind, amount: u64, capacity: ResourcePair) -> u64 {
        let balance = self.balances.get_mut(kind);
        let before = *balance;
        let raised = before.saturating_add(amount);
        *balance = match capacity.get(kind) {
            Some(cap) => raised.min(cap),
            None => raised,
        };
        balance.saturating_sub(before)
    }

    /// Clamp renewable balances to `capacity`.
    pub fn clamp_to(&mut self, capacity: ResourcePair) {
        self.balances.gold = self.balances.gold.min(capacity.gold);
        self.balances.crystal = self.balances.crystal.min(capacity.crystal);
    }
}

fn accrued(balance: u64, rate: u64, elapsed: Tick, bonus: i128, capacity: u64) -> u64 {
    let base = i128::from(rate).saturating_mul(i128::from(elapsed));
    let gain = base.saturating_add(bonus).max(0);
    let total = i128::from(balance).saturating_add(gain);
    u64::try_from(total).unwrap_or(u64::MAX).min(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(gold: u64, crystal: u64, rates: ResourcePair) -> ResourceAccount {
        ResourceAccount::new(Balances::new(gold, crystal, 0), 0, rates)
    }

    #[test]
    fn test_accrue_linear() {
        let mut acct = account(10, 0, ResourcePair::new(2, 1));
        let payout = acct.accrue(50, QueueBonus::default(), ResourcePair::new(1_000, 1_000));

        assert_eq!(payout.elapsed, 50);
        assert_eq!(payout.gained, ResourcePair::new(100, 50));
        assert_eq!(acct.balances.gold, 110);
        assert_eq!(acct.last_payout, 50);

        // Second payout at the same tick gains nothing
        let again = acct.accrue(50, QueueBonus::default(), ResourcePair::new(1_000, 1_000));
        assert_eq!(again.gained, ResourcePair::ZERO);
    }

    #[test]
    fn test_accrue_clamps_to_capacity() {
        let mut acct = account(90, 0, ResourcePair::new(5, 0));
        acct.accrue(100, QueueBonus::default(), ResourcePair::new(120, 0));
        assert_eq!(acct.balances.gold, 120);
    }

    #[test]
    fn test_accrue_with_queue_bonus() {
        let mut acct = account(0, 0, ResourcePair::new(1, 0));
        let mut bonus = QueueBonus::default();
        bonus.add(ResourcePair::new(3, 2), 10, false);
        bonus.add(ResourcePair::new(1, 0), 10, true);

        acct.accrue(20, bonus, ResourcePair::new(1_000, 1_000));
        // 20·1 + 10·3 − 10·1
        assert_eq!(acct.balances.gold, 40);
        assert_eq!(acct.balances.crystal, 20);
    }

    #[test]
    fn test_consume() {
        let mut acct = account(100, 0, ResourcePair::ZERO);
        assert!(acct.consume(ResourceKind::Gold, 60).is_ok());
        assert_eq!(acct.balances.gold, 40);

        let err = acct.consume(ResourceKind::Gold, 41).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientResources {
                resource: ResourceKind::Gold,
                required: 41,
                available: 40
            }
        );
        assert_eq!(acct.balances.gold, 40);
    }

    #[test]
    fn test_credit_discards_overflow() {
        let mut acct = account(80, 0, ResourcePair::ZERO);
        let kept = acct.credit(ResourceKind::Gold, 50, ResourcePair::new(100, 100));
        assert_eq!(kept, 20);
        assert_eq!(acct.balances.gold, 100);

        let kept = acct.credit(ResourceKind::Scarce, 7, ResourcePair::new(100, 100));
        assert_eq!(kept, 7);
        assert_eq!(acct.balances.scarce, 7);
    }
}
