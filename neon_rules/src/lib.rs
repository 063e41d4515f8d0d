//! # Neon Rules
//!
//! The rules crate - stats and statuses, items and inventory, enemies and
//! combat, skills and progression. Everything here is deterministic given a
//! [`Dice`] source and holds no narrative state.

pub mod catalog;
pub mod combat;
pub mod config;
pub mod dice;
pub mod entities;
pub mod error;
pub mod inventory;
pub mod mechanics;
pub mod progression;

pub use catalog::*;
pub use combat::*;
pub use config::*;
pub use dice::*;
pub use entities::*;
pub use error::*;
pub use inventory::*;
pub use mechanics::*;
pub use progression::*;
