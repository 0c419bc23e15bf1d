//! Error types for the economy and combat core.
//!
//! Every failure is rejected before the first mutation of owner state, so a
//! returned error always means "nothing changed".

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{AssetId, TypeClass};
use crate::realm::OwnerId;
use crate::resources::ResourceKind;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Broad classification of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Malformed input, rejected before any lookup of owner state.
    Validation,
    /// Well-formed request that the game rules forbid right now.
    Policy,
    /// Request that refers to state which does not exist or has moved on.
    State,
}

/// Top-level error type for all core operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// A quantity of zero was requested.
    #[error("Quantity must be greater than zero")]
    ZeroQuantity,

    /// The reserved null identifier (0) was passed.
    #[error("Null identifier passed for {0}")]
    NullIdentifier(&'static str),

    /// The catalog has no spec for this asset.
    #[error("Unknown asset: {0}")]
    UnknownAsset(AssetId),

    /// An army entry refers to an asset that cannot fight.
    #[error("Asset {0} is not a unit")]
    NotAUnit(AssetId),

    /// An army had no units, or its id/quantity lists had different lengths.
    #[error("Army is empty or malformed")]
    EmptyArmy,

    /// An owner tried to attack itself.
    #[error("Owner {0} cannot attack itself")]
    SelfAttack(OwnerId),

    /// The clock was asked to move backwards.
    #[error("Time cannot move backwards: now {now}, requested {requested}")]
    TimeWentBackwards {
        /// Current tick.
        now: u64,
        /// Requested tick.
        requested: u64,
    },

    /// A checked multiplication or addition overflowed.
    #[error("Arithmetic overflow while computing {0}")]
    ArithmeticOverflow(&'static str),

    /// Prerequisites for the asset are not owned.
    #[error("Requirements not met for asset {0}")]
    RequirementNotMet(AssetId),

    /// A single-instance asset class is already owned or queued.
    #[error("Asset {asset} conflicts with an owned or queued member of {class}")]
    DuplicateTypeClass {
        /// Requested asset.
        asset: AssetId,
        /// Its uniqueness class.
        class: TypeClass,
    },

    /// Balance is too low.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource kind.
        resource: ResourceKind,
        /// Amount required.
        required: u64,
        /// Amount available after payout.
        available: u64,
    },

    /// The attacker asked for more units than are ready.
    #[error("Insufficient units of {unit}: requested {requested}, ready {available}")]
    InsufficientUnits {
        /// Unit asset.
        unit: AssetId,
        /// Requested quantity.
        requested: u32,
        /// Ready quantity.
        available: u32,
    },

    /// The attacker is still cooling down.
    #[error("Owner is on cooldown until tick {until}")]
    OnCooldown {
        /// First tick at which the owner may attack again.
        until: u64,
    },

    /// Points are out of range and no revenge flag applies.
    #[error("Target is outside the attacker's points range")]
    NotInPointsRange,

    /// No batch with this asset at this queue index.
    #[error("No batch of asset {asset} at queue index {index}")]
    BatchNotFound {
        /// Requested asset.
        asset: AssetId,
        /// Requested queue index.
        index: usize,
    },

    /// The batch has already finished production.
    #[error("Batch at queue index {index} already completed")]
    AlreadyCompleted {
        /// Queue index of the batch.
        index: usize,
    },

    /// The owner has no village.
    #[error("Unknown owner: {0}")]
    UnknownOwner(OwnerId),

    /// The owner already has a village.
    #[error("Owner {0} is already registered")]
    OwnerExists(OwnerId),

    /// Data file parsing error.
    #[error("Failed to parse data '{path}': {message}")]
    DataParseError {
        /// Source of the data.
        path: String,
        /// Error message.
        message: String,
    },

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid stored state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl GameError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroQuantity
            | Self::NullIdentifier(_)
            | Self::UnknownAsset(_)
            | Self::NotAUnit(_)
            | Self::EmptyArmy
            | Self::SelfAttack(_)
            | Self::TimeWentBackwards { .. }
            | Self::ArithmeticOverflow(_) => ErrorKind::Validation,
            Self::RequirementNotMet(_)
            | Self::DuplicateTypeClass { .. }
            | Self::InsufficientResources { .. }
            | Self::InsufficientUnits { .. }
            | Self::OnCooldown { .. }
            | Self::NotInPointsRange => ErrorKind::Policy,
            Self::BatchNotFound { .. }
            | Self::AlreadyCompleted { .. }
            | Self::UnknownOwner(_)
            | Self::OwnerExists(_)
            | Self::DataParseError { .. }
            | Self::InvalidConfig(_)
            | Self::InvalidState(_) => ErrorKind::State,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(GameError::ZeroQuantity.kind(), ErrorKind::Validation);
        assert_eq!(GameError::EmptyArmy.kind(), ErrorKind::Validation);
        assert_eq!(GameError::NotInPointsRange.kind(), ErrorKind::Policy);
        assert_eq!(
            GameError::RequirementNotMet(AssetId(3)).kind(),
            ErrorKind::Policy
        );
        assert_eq!(
            GameError::AlreadyCompleted { index: 0 }.kind(),
            ErrorKind::State
        );
    }

    #[test]
    fn test_error_display() {
        let err = GameError::InsufficientResources {
            resource: ResourceKind::Gold,
            required: 500,
            available: 120,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient resources: need 500 gold, have 120"
        );
        assert_eq!(
            GameError::BatchNotFound {
                asset: AssetId(7),
                index: 2
            }
            .to_string(),
            "No batch of asset #7 at queue index 2"
        );
    }
}
