//! Per-encounter enemy instances.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{EnemyDefinition, EnemyType};
use crate::config::{CombatConfig, DifficultyModifiers};
use crate::entities::{StatusEffects, StatusTick};
use crate::mechanics::{Affinity, DamageType};

use super::Stance;

/// An enemy in a running encounter. Created from a definition, discarded when
/// the encounter resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub damage: i32,
    pub defense: i32,
    pub enemy_type: EnemyType,
    pub weaknesses: BTreeSet<DamageType>,
    pub resistances: BTreeSet<DamageType>,
    pub experience_reward: u32,
    pub credit_reward: u32,
    pub loot_table: BTreeMap<String, f64>,
    pub status_effects: StatusEffects,
    /// Picked by the enemy's policy at the start of each of its turns.
    pub stance: Stance,
}

/// Damage dealt to an enemy by one hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub damage: i32,
    pub affinity: Affinity,
}

impl Enemy {
    /// Instantiate a definition, applying archetype and difficulty modifiers.
    pub fn from_definition(definition: &EnemyDefinition, modifiers: &DifficultyModifiers) -> Self {
        let (health, damage, defense) = match definition.enemy_type {
            EnemyType::Standard => (0, 0, 0),
            EnemyType::Berserker => (0, 2, -1),
            EnemyType::Tactician => (0, 0, 2),
            EnemyType::Tank => (5, -1, 3),
            EnemyType::Rogue => (0, 1, 0),
        };

        let health = (definition.health + health).max(1);
        let base_damage = (definition.damage + damage).max(0);
        let damage = (base_damage as f64 * modifiers.enemy_damage_multiplier).round() as i32;

        Self {
            name: definition.name.clone(),
            health,
            max_health: health,
            damage,
            defense: (definition.defense + defense).max(0),
            enemy_type: definition.enemy_type,
            weaknesses: definition.weaknesses.clone(),
            resistances: definition.resistances.clone(),
            experience_reward: definition.experience_reward,
            credit_reward: definition.credit_reward,
            loot_table: definition.loot_table.clone(),
            status_effects: StatusEffects::new(),
            stance: Stance::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Health as a fraction of max health.
    pub fn health_fraction(&self) -> f64 {
        if self.max_health <= 0 {
            return 0.0;
        }
        self.health as f64 / self.max_health as f64
    }

    pub fn has_status(&self, name: &str) -> bool {
        self.status_effects.contains(name)
    }

    /// Base defense plus guard and debuff statuses, never below zero.
    pub fn effective_defense(&self) -> i32 {
        (self.defense + self.status_effects.defense_delta()).max(0)
    }

    /// Base damage plus damage statuses, never below zero.
    pub fn effective_damage(&self) -> i32 {
        (self.damage + self.status_effects.damage_delta()).max(0)
    }

    /// Apply an incoming hit: stance-scaled defense first, then the affinity
    /// multiplier.
    /// Health floors at zero.
    pub fn take_damage(&mut self, raw: i32, damage_type: DamageType, config: &CombatConfig) -> HitResult {
        let affinity = Affinity::classify(damage_type, &self.weaknesses, &self.resistances);
        let reduced = (raw - self.stance.scale_defense(self.effective_defense())).max(0);
        let scaled = (reduced as f64
            * affinity.multiplier(config.weakness_multiplier, config.resistance_multiplier))
            as i32;

        let damage = scaled.min(self.health).max(0);
        self.health -= damage;
        HitResult { damage, affinity }
    }

    /// Advance statuses one tick, applying bleed. Returns the tick summary.
    pub fn tick_statuses(&mut self) -> StatusTick {
        let tick = self.status_effects.tick();
        self.health = (self.health - tick.bleed_damage).clamp(0, self.max_health);
        tick
    }
}
