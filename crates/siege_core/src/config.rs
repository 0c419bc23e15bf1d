//! Realm tunables.
//!
//! Loaded from RON; every field has a default so a config file only needs
//! to list what it changes.
//!
//! ```ron
//! RealmConfig(
//!     refund_percent: 60,
//!     cooldown_period: 300,
//!     base_capacity: (gold: 800, crystal: 800),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::combat::BattleModifiers;
use crate::error::{GameError, Result};
use crate::matchmaking::MatchRules;
use crate::resources::ResourcePair;
use crate::Tick;

/// All configurable percentages and periods of a realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmConfig {
    /// Share of price refunded for unproduced units on cancel (0-100).
    pub refund_percent: u64,
    /// Share of the defender's balance an unhurt attacker steals (0-100).
    pub attacker_reward_modifier: u64,
    /// Share of casualty value salvaged by the defender (0-100).
    pub defender_reward_modifier: u64,
    /// Ticks between two attacks by the same owner.
    pub cooldown_period: Tick,
    /// Lower points bound as a percentage of the attacker's points.
    pub lower_threshold: u64,
    /// Upper points bound as a percentage of the attacker's points.
    pub upper_threshold: u64,
    /// Ticks a revenge flag stays usable.
    pub revenge_time_threshold: Tick,
    /// Storage every village has before buildings.
    pub base_capacity: ResourcePair,
    /// Income every village has before buildings.
    pub base_rate: ResourcePair,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            refund_percent: 60,
            attacker_reward_modifier: 50,
            defender_reward_modifier: 10,
            cooldown_period: 100,
            lower_threshold: 50,
            upper_threshold: 200,
            revenge_time_threshold: 1_000,
            base_capacity: ResourcePair::new(1_000, 1_000),
            base_rate: ResourcePair::new(1, 1),
        }
    }
}

impl RealmConfig {
    /// Parse a config from RON.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: "<config>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that percentages and thresholds make sense.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("refund_percent", self.refund_percent),
            ("attacker_reward_modifier", self.attacker_reward_modifier),
            ("defender_reward_modifier", self.defender_reward_modifier),
        ] {
            if value > 100 {
                return Err(GameError::InvalidConfig(format!(
                    "{name} must be at most 100, got {value}"
                )));
            }
        }
        if self.lower_threshold > self.upper_threshold {
            return Err(GameError::InvalidConfig(format!(
                "lower_threshold {} exceeds upper_threshold {}",
                self.lower_threshold, self.upper_threshold
            )));
        }
        Ok(())
    }

    /// Matchmaking subset.
    #[must_use]
    pub const fn match_rules(&self) -> MatchRules {
        MatchRules {
            cooldown_period: self.cooldown_period,
            lower_threshold: self.lower_threshold,
            upper_threshold: self.upper_threshold,
            revenge_time_threshold: self.revenge_time_threshold,
        }
    }

    /// Combat subset.
    #[must_use]
    pub const fn battle_modifiers(&self) -> BattleModifiers {
        BattleModifiers {
            attacker_reward_modifier: self.attacker_reward_modifier,
            defender_reward_modifier: self.defender_reward_modifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RealmConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = RealmConfig::from_ron_str(
            "(refund_percent: 75, base_capacity: (gold: 500, crystal: 200))",
        )
        .unwrap();
        assert_eq!(config.refund_percent, 75);
        assert_eq!(config.base_capacity, ResourcePair::new(500, 200));
        assert_eq!(config.cooldown_period, RealmConfig::default().cooldown_period);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = RealmConfig {
            refund_percent: 120,
            ..RealmConfig::default()
        };
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        let config = RealmConfig {
            lower_threshold: 300,
            ..RealmConfig::default()
        };
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        assert!(matches!(
            RealmConfig::from_ron_str("(refund_percent: \"lots\")"),
            Err(GameError::DataParseError { .. })
        ));
    }
}
