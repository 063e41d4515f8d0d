//! # Neon Narrative
//!
//! The story side of Neon Shadows. This crate walks a character through a
//! graph of story nodes, hands combat and item rules to `neon_rules`, and
//! saves games to disk.
//!
//! ## Core Components
//!
//! - **story_graph**: Nodes, choices, requirements and consequences
//! - **engine**: The state machine that plays a game over the graph
//! - **generation**: Optional dynamic nodes with a deterministic fallback
//! - **persistence**: Versioned save games and the save directory
//!
//! ## Design Philosophy
//!
//! - **Atomic**: An operation either fully applies or leaves the game untouched
//! - **Data-Driven**: Story content is JSON; the engine knows no specific node
//! - **Renderer-Agnostic**: The engine returns views and never prints

pub mod engine;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod story_graph;

pub use engine::*;
pub use error::*;
pub use generation::*;
pub use persistence::{SaveGame, SaveId, SaveMetadata, SaveSlot, SaveStore, SAVE_VERSION};
pub use story_graph::*;
