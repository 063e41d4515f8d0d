//! Combat stances. A stance trades damage for defense for as long as it is
//! held. Both the character and the enemy hold one.

use serde::{Deserialize, Serialize};

/// How a combatant is fighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// More damage, less defense.
    Offensive,
    /// Less damage, more defense.
    Defensive,
    /// Balanced, no modifiers.
    #[default]
    Tactical,
    /// Heavy damage from hiding, very little defense if caught.
    Stealth,
}

impl Stance {
    pub const ALL: [Stance; 4] = [
        Stance::Offensive,
        Stance::Defensive,
        Stance::Tactical,
        Stance::Stealth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Offensive => "offensive",
            Stance::Defensive => "defensive",
            Stance::Tactical => "tactical",
            Stance::Stealth => "stealth",
        }
    }

    pub fn damage_modifier(&self) -> f64 {
        match self {
            Stance::Offensive => 1.3,
            Stance::Defensive => 0.7,
            Stance::Tactical => 1.0,
            Stance::Stealth => 1.5,
        }
    }

    pub fn defense_modifier(&self) -> f64 {
        match self {
            Stance::Offensive => 0.7,
            Stance::Defensive => 1.5,
            Stance::Tactical => 1.0,
            Stance::Stealth => 0.6,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Stance::Offensive => "Increases damage dealt but reduces defense",
            Stance::Defensive => "Reduces damage dealt but increases defense",
            Stance::Tactical => "Balanced stance with no modifiers",
            Stance::Stealth => "High damage from the shadows, but low defense if detected",
        }
    }

    /// Outgoing damage under this stance, rounded, never negative.
    pub fn scale_damage(&self, raw: i32) -> i32 {
        ((raw as f64 * self.damage_modifier()).round() as i32).max(0)
    }

    /// Defense under this stance. Only positive defense is scaled; a debuffed
    /// defense stays as bad as it is.
    pub fn scale_defense(&self, defense: i32) -> i32 {
        if defense <= 0 {
            return defense;
        }
        (defense as f64 * self.defense_modifier()).round() as i32
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
