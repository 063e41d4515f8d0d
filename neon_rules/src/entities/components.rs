//! Component definitions shared by characters and enemies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Stat;

/// Primary attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: i32,
    pub intelligence: i32,
    pub charisma: i32,
    pub reflex: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(3, 3, 3, 3)
    }
}

impl Stats {
    pub fn new(strength: i32, intelligence: i32, charisma: i32, reflex: i32) -> Self {
        Self {
            strength,
            intelligence,
            charisma,
            reflex,
        }
    }

    pub fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Strength => self.strength,
            Stat::Intelligence => self.intelligence,
            Stat::Charisma => self.charisma,
            Stat::Reflex => self.reflex,
        }
    }

    pub fn get_mut(&mut self, stat: Stat) -> &mut i32 {
        match stat {
            Stat::Strength => &mut self.strength,
            Stat::Intelligence => &mut self.intelligence,
            Stat::Charisma => &mut self.charisma,
            Stat::Reflex => &mut self.reflex,
        }
    }
}

/// What an active status effect does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusMagnitude {
    /// Shifts a primary attribute.
    Stat { stat: Stat, delta: i32 },
    /// Shifts defense against incoming damage.
    Defense { amount: i32 },
    /// Shifts outgoing damage.
    Damage { amount: i32 },
    /// Damage taken at every tick.
    Bleed { amount: i32 },
    /// Marker with no numeric payload (stealth, immunity, EMP).
    Flag,
}

/// An active status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Ticks left. None = permanent effect.
    pub remaining: Option<u32>,
    pub magnitude: StatusMagnitude,
    /// Harmful effects are the ones cleansing items remove.
    #[serde(default)]
    pub harmful: bool,
}

impl StatusEffect {
    /// Create a timed effect; harmfulness follows the sign of the magnitude.
    pub fn timed(magnitude: StatusMagnitude, duration: u32) -> Self {
        Self {
            remaining: Some(duration),
            magnitude,
            harmful: Self::is_harmful_magnitude(&magnitude),
        }
    }

    /// Create an effect that never expires.
    pub fn permanent(magnitude: StatusMagnitude) -> Self {
        Self {
            remaining: None,
            magnitude,
            harmful: Self::is_harmful_magnitude(&magnitude),
        }
    }

    /// Create a timed marker effect.
    pub fn flag(duration: u32, harmful: bool) -> Self {
        Self {
            remaining: Some(duration),
            magnitude: StatusMagnitude::Flag,
            harmful,
        }
    }

    fn is_harmful_magnitude(magnitude: &StatusMagnitude) -> bool {
        match magnitude {
            StatusMagnitude::Stat { delta, .. } => *delta < 0,
            StatusMagnitude::Defense { amount } | StatusMagnitude::Damage { amount } => *amount < 0,
            StatusMagnitude::Bleed { amount } => *amount > 0,
            StatusMagnitude::Flag => false,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.remaining.is_none()
    }
}

/// Result of advancing a status set by one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTick {
    /// Bleed damage dealt this tick (before any clamping by the owner).
    pub bleed_damage: i32,
    /// Names of effects that expired, in name order.
    pub expired: Vec<String>,
}

/// Status effects currently active on a combatant, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusEffects {
    effects: BTreeMap<String, StatusEffect>,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an effect.
    pub fn apply(&mut self, name: impl Into<String>, effect: StatusEffect) {
        self.effects.insert(name.into(), effect);
    }

    pub fn remove(&mut self, name: &str) -> Option<StatusEffect> {
        self.effects.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&StatusEffect> {
        self.effects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StatusEffect)> {
        self.effects.iter()
    }

    /// Sum of attribute deltas for a stat.
    pub fn stat_delta(&self, stat: Stat) -> i32 {
        self.effects
            .values()
            .map(|e| match e.magnitude {
                StatusMagnitude::Stat { stat: s, delta } if s == stat => delta,
                _ => 0,
            })
            .sum()
    }

    /// Sum of defense modifiers.
    pub fn defense_delta(&self) -> i32 {
        self.effects
            .values()
            .map(|e| match e.magnitude {
                StatusMagnitude::Defense { amount } => amount,
                _ => 0,
            })
            .sum()
    }

    /// Sum of outgoing damage modifiers.
    pub fn damage_delta(&self) -> i32 {
        self.effects
            .values()
            .map(|e| match e.magnitude {
                StatusMagnitude::Damage { amount } => amount,
                _ => 0,
            })
            .sum()
    }

    /// Remove every harmful effect, returning the removed names.
    pub fn cleanse(&mut self) -> Vec<String> {
        let harmful: Vec<String> = self
            .effects
            .iter()
            .filter(|(_, e)| e.harmful)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &harmful {
            self.effects.remove(name);
        }
        harmful
    }

    /// Apply bleed, decrement finite durations and drop the expired effects.
    pub fn tick(&mut self) -> StatusTick {
        let mut tick = StatusTick::default();

        for (name, effect) in self.effects.iter_mut() {
            if let StatusMagnitude::Bleed { amount } = effect.magnitude {
                tick.bleed_damage += amount.max(0);
            }
            if let Some(remaining) = effect.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    tick.expired.push(name.clone());
                }
            }
        }

        for name in &tick.expired {
            self.effects.remove(name);
        }
        tick
    }
}
