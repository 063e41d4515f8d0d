//! Player character definition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::{CharacterClass, CharacterId, Stat, Stats, StatusEffects};
use crate::config::GameConfig;
use crate::inventory::Inventory;

/// Starting credits before difficulty adjustments.
pub const STARTING_CREDITS: u32 = 100;

/// Reputation bounds with any faction or district. Everyone starts at 0.
pub const MIN_REPUTATION: i32 = -100;
pub const MAX_REPUTATION: i32 = 100;

/// The player character with all of its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub class: CharacterClass,

    pub stats: Stats,
    pub health: i32,
    pub max_health: i32,
    pub level: u32,
    pub experience: u32,
    pub credits: u32,

    pub inventory: Inventory,
    #[serde(default)]
    pub status_effects: StatusEffects,
    /// Skill ID -> learned level.
    #[serde(default)]
    pub skills: BTreeMap<String, u32>,
    /// Points earned on level-up, spent on stats or skills.
    #[serde(default)]
    pub unspent_points: u32,
    /// Flat max health adjustment from difficulty.
    #[serde(default)]
    pub bonus_health: i32,
    /// Faction or district -> standing. Missing entries are neutral.
    #[serde(default)]
    pub reputation: BTreeMap<String, i32>,
}

impl Character {
    /// Create a level 1 character with the class attributes and an empty inventory.
    pub fn new(name: impl Into<String>, class: CharacterClass) -> Self {
        Self::with_stats(name, class, class.starting_stats())
    }

    /// Create a level 1 character with explicit attributes.
    pub fn with_stats(name: impl Into<String>, class: CharacterClass, stats: Stats) -> Self {
        let max_health = 10 + 2 * stats.strength;
        Self {
            id: CharacterId::new(),
            name: name.into(),
            class,
            stats,
            health: max_health,
            max_health,
            level: 1,
            experience: 0,
            credits: STARTING_CREDITS,
            inventory: Inventory::default(),
            status_effects: StatusEffects::new(),
            skills: BTreeMap::new(),
            unspent_points: 0,
            bonus_health: 0,
            reputation: BTreeMap::new(),
        }
    }

    /// Character creation: class attributes, class kit, common kit and
    /// difficulty adjustments.
    pub fn create(name: impl Into<String>, class: CharacterClass, config: &GameConfig) -> Self {
        let mut character = Self::new(name, class);
        let modifiers = config.difficulty.modifiers();

        character.inventory = Inventory::with_capacity(config.inventory.max_items);
        character.bonus_health = modifiers.starting_health_bonus;
        character.recalculate_max_health(config.progression.health_per_level);
        character.health = character.max_health;
        character.credits = (STARTING_CREDITS as i32 + modifiers.starting_credits_bonus).max(0) as u32;

        let kit = class
            .starting_kit()
            .iter()
            .map(|item| (*item, 1))
            .chain([("Credchip", 1), ("Stimpack", 2 + modifiers.extra_stimpacks)]);
        for (item, quantity) in kit {
            if let Err(err) = character.inventory.add_item(item, quantity) {
                warn!(item, %err, "starting item dropped");
            }
        }

        character
    }

    /// Check if the character is alive.
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Base attribute plus active status modifiers, never below zero.
    pub fn effective_stat(&self, stat: Stat) -> i32 {
        (self.stats.get(stat) + self.status_effects.stat_delta(stat)).max(0)
    }

    /// Check if the character has a specific status effect.
    pub fn has_status(&self, name: &str) -> bool {
        self.status_effects.contains(name)
    }

    /// Learned level of a skill (0 when unknown).
    pub fn skill_level(&self, skill_id: &str) -> u32 {
        self.skills.get(skill_id).copied().unwrap_or(0)
    }

    /// Recompute max health from strength, level and bonus, clamping health.
    pub fn recalculate_max_health(&mut self, health_per_level: i32) {
        let level_bonus = health_per_level * (self.level.saturating_sub(1)) as i32;
        self.max_health = (10 + 2 * self.stats.strength + level_bonus + self.bonus_health).max(1);
        self.health = self.health.clamp(0, self.max_health);
    }

    /// Set health, clamped to `[0, max_health]`.
    pub fn set_health(&mut self, health: i32) {
        self.health = health.clamp(0, self.max_health);
    }

    /// Standing with a faction or district.
    pub fn reputation_with(&self, faction: &str) -> i32 {
        self.reputation.get(faction).copied().unwrap_or(0)
    }

    /// Shift standing with a faction, clamped to the reputation bounds.
    /// Returns the new standing.
    pub fn adjust_reputation(&mut self, faction: &str, delta: i32) -> i32 {
        let standing = (self.reputation_with(faction) + delta).clamp(MIN_REPUTATION, MAX_REPUTATION);
        self.reputation.insert(faction.to_string(), standing);
        standing
    }

    /// Shift credits by a signed amount, flooring at zero.
    pub fn adjust_credits(&mut self, delta: i64) {
        self.credits = (self.credits as i64 + delta).clamp(0, u32::MAX as i64) as u32;
    }
}
