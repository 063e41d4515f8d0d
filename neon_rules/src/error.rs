//! Error types raised by the rules layer.

use thiserror::Error;

/// Errors surfaced by inventory, catalog, progression and combat operations.
///
/// Every variant is recoverable from the game's point of view: the operation is
/// rejected and the character is left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    #[error("inventory is full ({capacity} distinct items), cannot add '{item}'")]
    CapacityExceeded { item: String, capacity: usize },

    #[error("not enough '{item}': requested {requested}, held {held}")]
    InsufficientQuantity {
        item: String,
        requested: u32,
        held: u32,
    },

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("'{0}' cannot be used")]
    ItemNotUsable(String),

    #[error("'{0}' cannot be used in combat")]
    WrongContext(String),

    #[error("unknown item '{0}'")]
    UnknownItem(String),

    #[error("unknown enemy '{0}'")]
    UnknownEnemy(String),

    #[error("unknown skill '{0}'")]
    UnknownSkill(String),

    #[error("no unspent points available")]
    NoUnspentPoints,

    #[error("skill '{0}' is already at its maximum level")]
    SkillMaxed(String),

    #[error("skill '{skill}' requires '{requires}' at level {level}")]
    SkillLocked {
        skill: String,
        requires: String,
        level: u32,
    },

    #[error("not enough credits: need {needed}, have {available}")]
    InsufficientCredits { needed: u32, available: u32 },

    #[error("encounter is already resolved")]
    EncounterResolved,

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RulesError>;
