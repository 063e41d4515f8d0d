//! Game configuration.
//!
//! All tunables live in one [`GameConfig`] that is handed to the story engine and
//! the combat resolver at construction. Every section has serde defaults, so a
//! TOML file only needs to name the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, RulesError};

/// Experience curve and level-up rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Base experience for the first level-up.
    pub level_up_base_xp: u32,
    /// Multiplier applied on top of `base * level`.
    pub xp_curve: f64,
    /// Unspent points granted per level.
    pub points_per_level: u32,
    /// Max health gained per level above 1.
    pub health_per_level: i32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            level_up_base_xp: 100,
            xp_curve: 1.5,
            points_per_level: 2,
            health_per_level: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Maximum number of distinct items a character can carry.
    pub max_items: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self { max_items: 20 }
    }
}

/// Combat tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Attack rolls vary by +/- this amount.
    pub damage_variance: i32,
    pub weakness_multiplier: f64,
    pub resistance_multiplier: f64,
    pub base_flee_chance: f64,
    pub flee_per_reflex: f64,
    /// Cap on the reflex-derived part of the flee chance.
    pub max_flee_chance: f64,
    /// Flee chance lost against tacticians and rogues.
    pub evasive_flee_penalty: f64,
    /// Flee chance gained while stealth boosted.
    pub stealth_flee_bonus: f64,
    /// Chance for a player hit to open a bleeding wound.
    pub bleed_chance: f64,
    /// Rounds before an encounter disengages as a stalemate.
    pub max_turns: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            damage_variance: 1,
            weakness_multiplier: 1.5,
            resistance_multiplier: 0.7,
            base_flee_chance: 0.30,
            flee_per_reflex: 0.05,
            max_flee_chance: 0.90,
            evasive_flee_penalty: 0.15,
            stealth_flee_bonus: 0.25,
            bleed_chance: 0.15,
            max_turns: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub start_node: String,
    /// Ask the content generator for nodes missing from the static graph.
    pub enable_dynamic_content: bool,
    /// Number of choices remembered for generation context.
    pub history_limit: usize,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            start_node: "intro".to_string(),
            enable_dynamic_content: false,
            history_limit: 20,
        }
    }
}

/// Difficulty presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Modifiers derived from a [`Difficulty`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyModifiers {
    pub enemy_damage_multiplier: f64,
    pub player_damage_multiplier: f64,
    pub starting_health_bonus: i32,
    pub starting_credits_bonus: i32,
    pub extra_stimpacks: u32,
}

impl Difficulty {
    pub fn modifiers(&self) -> DifficultyModifiers {
        match self {
            Difficulty::Easy => DifficultyModifiers {
                enemy_damage_multiplier: 0.75,
                player_damage_multiplier: 1.25,
                starting_health_bonus: 5,
                starting_credits_bonus: 50,
                extra_stimpacks: 1,
            },
            Difficulty::Normal => DifficultyModifiers {
                enemy_damage_multiplier: 1.0,
                player_damage_multiplier: 1.0,
                starting_health_bonus: 0,
                starting_credits_bonus: 0,
                extra_stimpacks: 0,
            },
            Difficulty::Hard => DifficultyModifiers {
                enemy_damage_multiplier: 1.25,
                player_damage_multiplier: 0.85,
                starting_health_bonus: -2,
                starting_credits_bonus: -25,
                extra_stimpacks: 0,
            },
        }
    }
}

/// Complete configuration passed into the engine and resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameConfig {
    pub progression: ProgressionConfig,
    pub inventory: InventoryConfig,
    pub combat: CombatConfig,
    pub story: StoryConfig,
    pub difficulty: Difficulty,
    /// Seed for the default dice source.
    pub seed: u64,
}

impl GameConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RulesError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RulesError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }
}
