//! Resource kinds and amount bundles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three resources an owner can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Renewable, produced by mines.
    Gold,
    /// Renewable, produced by extractors.
    Crystal,
    /// Scarce resource, neither accrued nor capped by the core.
    Scarce,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gold => write!(f, "gold"),
            Self::Crystal => write!(f, "crystal"),
            Self::Scarce => write!(f, "scarce"),
        }
    }
}

/// An amount of each renewable resource.
///
/// Used for capacity, production rate and per-asset contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourcePair {
    /// Gold amount.
    #[serde(default)]
    pub gold: u64,
    /// Crystal amount.
    #[serde(default)]
    pub crystal: u64,
}

impl ResourcePair {
    /// Zero of both.
    pub const ZERO: Self = Self {
        gold: 0,
        crystal: 0,
    };

    /// Create a new pair.
    #[must_use]
    pub const fn new(gold: u64, crystal: u64) -> Self {
        Self { gold, crystal }
    }

    /// Amount for a renewable kind; scarce has no entry and yields `None`.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> Option<u64> {
        match kind {
            ResourceKind::Gold => Some(self.gold),
            ResourceKind::Crystal => Some(self.crystal),
            ResourceKind::Scarce => None,
        }
    }

    /// Add `count` copies of `other`, saturating.
    #[must_use]
    pub fn saturating_add_scaled(self, other: Self, count: u64) -> Self {
        Self {
            gold: self.gold.saturating_add(other.gold.saturating_mul(count)),
            crystal: self
                .crystal
                .saturating_add(other.crystal.saturating_mul(count)),
        }
    }

    /// Check whether both amounts are zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.gold == 0 && self.crystal == 0
    }
}

/// Balances of all three resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Balances {
    /// Gold balance.
    #[serde(default)]
    pub gold: u64,
    /// Crystal balance.
    #[serde(default)]
    pub crystal: u64,
    /// Scarce balance.
    #[serde(default)]
    pub scarce: u64,
}

impl Balances {
    /// Create balances.
    #[must_use]
    pub const fn new(gold: u64, crystal: u64, scarce: u64) -> Self {
        Self {
            gold,
            crystal,
            scarce,
        }
    }

    /// Balance of one kind.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Crystal => self.crystal,
            ResourceKind::Scarce => self.scarce,
        }
    }

    /// Mutable balance of one kind.
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Crystal => &mut self.crystal,
            ResourceKind::Scarce => &mut self.scarce,
        }
    }

    /// The renewable part as a pair.
    #[must_use]
    pub const fn renewable(&self) -> ResourcePair {
        ResourcePair::new(self.gold, self.crystal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_scaling_saturates() {
        let base = ResourcePair::new(10, 20);
        let step = ResourcePair::new(5, 1);
        assert_eq!(
            base.saturating_add_scaled(step, 3),
            ResourcePair::new(25, 23)
        );
        assert_eq!(
            ResourcePair::new(u64::MAX, 0).saturating_add_scaled(step, 2).gold,
            u64::MAX
        );
    }

    #[test]
    fn test_balances_by_kind() {
        let mut balances = Balances::new(1, 2, 3);
        *balances.get_mut(ResourceKind::Crystal) += 5;
        assert_eq!(balances.get(ResourceKind::Crystal), 7);
        assert_eq!(balances.get(ResourceKind::Scarce), 3);
        assert_eq!(balances.renewable(), ResourcePair::new(1, 7));
        assert_eq!(ResourcePair::new(4, 5).get(ResourceKind::Scarce), None);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ResourceKind::Gold.to_string(), "gold");
        assert_eq!(ResourceKind::Crystal.to_string(), "crystal");
    }
}
