//! Error types for the story layer.

use neon_rules::RulesError;
use thiserror::Error;

/// Errors surfaced by the story engine.
///
/// A rejected operation leaves the game state exactly as it was.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("unknown story node '{0}'")]
    UnknownNode(String),

    #[error("no choice {index} (node has {available})")]
    InvalidChoice { index: usize, available: usize },

    #[error("choice {index} is locked: {reason}")]
    ChoiceLocked { index: usize, reason: String },

    #[error("node '{node}' is not a {expected} node")]
    WrongNodeKind { node: String, expected: &'static str },

    #[error("'{item}' is not sold at {shop}")]
    NotForSale { item: String, shop: String },

    #[error("no game in progress")]
    NotStarted,

    #[error("the game is over")]
    GameOver,

    #[error("an encounter is in progress")]
    EncounterInProgress,

    #[error("no encounter in progress")]
    NoEncounter,

    #[error("story graph error: {0}")]
    Graph(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Failures of the dynamic content collaborator. Never surfaced by the engine:
/// they are logged and replaced by the fallback node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("content generator unavailable: {0}")]
    Unavailable(String),

    #[error("content generator timed out")]
    Timeout,

    #[error("malformed generated node: {0}")]
    Malformed(String),
}

/// Save and load failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("save encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported save version {found} (expected {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("save points at unknown node '{0}'")]
    UnknownNode(String),

    #[error("no save named '{0}'")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoryError>;
