//! Entity definitions for the player character.

mod character;
mod components;

pub use character::*;
pub use components::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    /// Create a new random character ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a nil/empty character ID (useful for fixtures).
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four primary attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Strength,
    Intelligence,
    Charisma,
    Reflex,
}

impl Stat {
    pub const ALL: [Stat; 4] = [
        Stat::Strength,
        Stat::Intelligence,
        Stat::Charisma,
        Stat::Reflex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Strength => "strength",
            Stat::Intelligence => "intelligence",
            Stat::Charisma => "charisma",
            Stat::Reflex => "reflex",
        }
    }
}

impl std::fmt::Display for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Character classes available at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    NetRunner,
    Enforcer,
    Fixer,
    Tech,
}

impl CharacterClass {
    pub const ALL: [CharacterClass; 4] = [
        CharacterClass::NetRunner,
        CharacterClass::Enforcer,
        CharacterClass::Fixer,
        CharacterClass::Tech,
    ];

    /// Starting attributes for the class.
    pub fn starting_stats(&self) -> Stats {
        match self {
            CharacterClass::NetRunner => Stats::new(3, 8, 4, 5),
            CharacterClass::Enforcer => Stats::new(8, 3, 3, 6),
            CharacterClass::Fixer => Stats::new(4, 5, 8, 3),
            CharacterClass::Tech => Stats::new(3, 7, 4, 6),
        }
    }

    /// Items the class starts with, on top of the common kit.
    pub fn starting_kit(&self) -> &'static [&'static str] {
        match self {
            CharacterClass::NetRunner => &["Cyberdeck", "ICEbreaker"],
            CharacterClass::Enforcer => &["Heavy Pistol", "Armored Vest"],
            CharacterClass::Fixer => &["Encrypted Phone", "Concealed Pistol"],
            CharacterClass::Tech => &["Multi-tool", "Diagnostic Scanner"],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CharacterClass::NetRunner => "Elite hackers who navigate the digital realm",
            CharacterClass::Enforcer => "Muscle for hire with augmented combat abilities",
            CharacterClass::Fixer => "Connected operators who know everyone worth knowing",
            CharacterClass::Tech => "Augmentation specialists and gadget gurus",
        }
    }
}

impl std::fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CharacterClass::NetRunner => "NetRunner",
            CharacterClass::Enforcer => "Enforcer",
            CharacterClass::Fixer => "Fixer",
            CharacterClass::Tech => "Tech",
        };
        f.write_str(name)
    }
}
