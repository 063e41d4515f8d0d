//! Game mechanics: damage types, damage and healing, status effects.
//!
//! These are the only operations that touch a character's health, so the
//! `0..=max_health` bound is enforced here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::Catalogs;
use crate::combat::Stance;
use crate::entities::{Character, StatusEffect, StatusMagnitude};

/// Status name set by toxin immunity items.
pub const TOXIN_IMMUNITY: &str = "toxin_immunity";
/// Status name set by stealth items.
pub const STEALTH_BOOST: &str = "stealth_boost";

/// All damage types in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Physical,
    Hacking,
    Emp,
    Thermal,
    Chemical,
}

/// How a target reacts to a damage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affinity {
    Weak,
    Normal,
    Resistant,
}

impl Affinity {
    /// Classify a damage type against weakness and resistance sets.
    /// A type listed in both cancels out.
    pub fn classify(
        damage_type: DamageType,
        weaknesses: &BTreeSet<DamageType>,
        resistances: &BTreeSet<DamageType>,
    ) -> Self {
        match (
            weaknesses.contains(&damage_type),
            resistances.contains(&damage_type),
        ) {
            (true, false) => Affinity::Weak,
            (false, true) => Affinity::Resistant,
            _ => Affinity::Normal,
        }
    }

    /// Get the damage multiplier for this affinity.
    pub fn multiplier(&self, weakness: f64, resistance: f64) -> f64 {
        match self {
            Affinity::Weak => weakness,
            Affinity::Normal => 1.0,
            Affinity::Resistant => resistance,
        }
    }
}

/// Total defense of a character: best armor, defense statuses and skills.
pub fn character_defense(character: &Character, catalogs: &Catalogs) -> i32 {
    let armor = catalogs.items.best_armor(&character.inventory);
    let skills = catalogs.skills.total_bonus(&character.skills).defense;
    armor + character.status_effects.defense_delta() + skills
}

/// Apply incoming damage to a character.
///
/// Effective damage is `max(0, raw - defense)`; toxin immunity blocks chemical
/// damage outright. Health is clamped at zero. Returns the damage applied.
pub fn apply_damage(
    character: &mut Character,
    raw: i32,
    damage_type: DamageType,
    catalogs: &Catalogs,
) -> i32 {
    apply_damage_in_stance(character, raw, damage_type, Stance::Tactical, catalogs)
}

/// [`apply_damage`] with the character's defense scaled by a combat stance.
pub fn apply_damage_in_stance(
    character: &mut Character,
    raw: i32,
    damage_type: DamageType,
    stance: Stance,
    catalogs: &Catalogs,
) -> i32 {
    if damage_type == DamageType::Chemical && character.has_status(TOXIN_IMMUNITY) {
        return 0;
    }

    let defense = stance.scale_defense(character_defense(character, catalogs));
    let effective = (raw - defense).max(0);
    let before = character.health;
    character.set_health(before - effective);
    before - character.health
}

/// Restore health up to the maximum. Returns the health actually gained.
pub fn heal(character: &mut Character, amount: i32) -> i32 {
    let before = character.health;
    character.set_health(before + amount.max(0));
    character.health - before
}

/// Insert or overwrite a timed status effect.
pub fn apply_status(
    character: &mut Character,
    name: impl Into<String>,
    magnitude: StatusMagnitude,
    duration: u32,
) {
    character
        .status_effects
        .apply(name, StatusEffect::timed(magnitude, duration));
}

/// Advance the character's statuses by one tick.
///
/// Bleed damage is applied first (ignoring defense), then durations decrement
/// and expired effects are removed. Returns the expired names.
pub fn tick_statuses(character: &mut Character) -> Vec<String> {
    let tick = character.status_effects.tick();
    if tick.bleed_damage > 0 {
        let health = character.health - tick.bleed_damage;
        character.set_health(health);
    }
    tick.expired
}
