//! Choices, the requirements that gate them and the consequences they carry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use neon_rules::{
    progression, Catalogs, Character, LevelUp, ProgressionConfig, RulesError, Stat,
};

/// A player-selectable transition out of a narrative node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub next_node: String,
    #[serde(default, alias = "requirements", skip_serializing_if = "Option::is_none")]
    pub requirement: Option<Requirement>,
    #[serde(default, alias = "consequences", skip_serializing_if = "Option::is_none")]
    pub consequence: Option<Consequence>,
}

impl Choice {
    pub fn new(text: impl Into<String>, next_node: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            next_node: next_node.into(),
            requirement: None,
            consequence: None,
        }
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = Some(requirement);
        self
    }

    pub fn with_consequence(mut self, consequence: Consequence) -> Self {
        self.consequence = Some(consequence);
        self
    }

    /// Why the choice is unavailable, or `None` when it can be taken.
    pub fn locked_reason(&self, character: &Character, flags: &BTreeSet<String>) -> Option<String> {
        self.requirement
            .as_ref()
            .and_then(|requirement| requirement.unmet_reason(character, flags))
    }
}

/// Conditions a character must meet to take a choice. All present
/// conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirement {
    /// Minimum effective value per stat.
    pub stats: BTreeMap<Stat, i32>,
    pub item: Option<String>,
    pub flag: Option<String>,
    pub not_flag: Option<String>,
    pub credits: Option<u32>,
    /// Minimum standing per faction or district.
    pub reputation: BTreeMap<String, i32>,
}

impl Requirement {
    pub fn stat(mut self, stat: Stat, minimum: i32) -> Self {
        self.stats.insert(stat, minimum);
        self
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    pub fn not_flag(mut self, flag: impl Into<String>) -> Self {
        self.not_flag = Some(flag.into());
        self
    }

    pub fn credits(mut self, credits: u32) -> Self {
        self.credits = Some(credits);
        self
    }

    pub fn reputation(mut self, faction: impl Into<String>, minimum: i32) -> Self {
        self.reputation.insert(faction.into(), minimum);
        self
    }

    /// First unmet condition as a player-facing reason.
    pub fn unmet_reason(&self, character: &Character, flags: &BTreeSet<String>) -> Option<String> {
        for (stat, minimum) in &self.stats {
            let value = character.effective_stat(*stat);
            if value < *minimum {
                return Some(format!("requires {stat} {minimum} (you have {value})"));
            }
        }
        if let Some(item) = &self.item {
            if !character.inventory.has_item(item, 1) {
                return Some(format!("requires {item}"));
            }
        }
        if let Some(flag) = &self.flag {
            if !flags.contains(flag) {
                return Some(format!("requires '{flag}'"));
            }
        }
        if let Some(flag) = &self.not_flag {
            if flags.contains(flag) {
                return Some("no longer available".to_string());
            }
        }
        if let Some(credits) = self.credits {
            if character.credits < credits {
                return Some(format!("requires {credits} credits (you have {})", character.credits));
            }
        }
        for (faction, minimum) in &self.reputation {
            let standing = character.reputation_with(faction);
            if standing < *minimum {
                return Some(format!(
                    "requires {minimum} reputation with {faction} (you have {standing})"
                ));
            }
        }
        None
    }

    pub fn is_met(&self, character: &Character, flags: &BTreeSet<String>) -> bool {
        self.unmet_reason(character, flags).is_none()
    }
}

/// A bundle of state changes. Applied all together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consequence {
    pub items_gained: BTreeMap<String, u32>,
    pub items_lost: BTreeMap<String, u32>,
    pub stats_change: BTreeMap<Stat, i32>,
    pub health_change: i32,
    pub credits_change: i64,
    pub experience: u32,
    pub set_flags: Vec<String>,
    pub clear_flags: Vec<String>,
    pub reputation_change: BTreeMap<String, i32>,
}

/// What applying a consequence actually did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsequenceReport {
    pub items_gained: Vec<String>,
    /// Gained items that did not fit.
    pub items_dropped: Vec<String>,
    /// Health actually gained or lost after clamping.
    pub health_change: i32,
    pub level_ups: Vec<LevelUp>,
}

impl Consequence {
    pub fn gain_item(mut self, item: impl Into<String>, quantity: u32) -> Self {
        self.items_gained.insert(item.into(), quantity);
        self
    }

    pub fn lose_item(mut self, item: impl Into<String>, quantity: u32) -> Self {
        self.items_lost.insert(item.into(), quantity);
        self
    }

    pub fn change_stat(mut self, stat: Stat, delta: i32) -> Self {
        self.stats_change.insert(stat, delta);
        self
    }

    pub fn health(mut self, delta: i32) -> Self {
        self.health_change = delta;
        self
    }

    pub fn credits(mut self, delta: i64) -> Self {
        self.credits_change = delta;
        self
    }

    pub fn experience(mut self, amount: u32) -> Self {
        self.experience = amount;
        self
    }

    pub fn set_flag(mut self, flag: impl Into<String>) -> Self {
        self.set_flags.push(flag.into());
        self
    }

    pub fn clear_flag(mut self, flag: impl Into<String>) -> Self {
        self.clear_flags.push(flag.into());
        self
    }

    pub fn reputation(mut self, faction: impl Into<String>, delta: i32) -> Self {
        self.reputation_change.insert(faction.into(), delta);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every change to a staged copy and commit only if all succeed.
    ///
    /// Losing items the character does not hold, paying credits it does not
    /// have or gaining an item missing from the catalog rejects the whole
    /// bundle. Gained items that do not fit are dropped.
    pub fn apply(
        &self,
        character: &mut Character,
        flags: &mut BTreeSet<String>,
        catalogs: &Catalogs,
        config: &ProgressionConfig,
    ) -> Result<ConsequenceReport, RulesError> {
        if let Some(unknown) = self.items_gained.keys().find(|item| !catalogs.items.contains(item)) {
            return Err(RulesError::UnknownItem(unknown.clone()));
        }

        let mut staged = character.clone();
        let mut staged_flags = flags.clone();
        let mut report = ConsequenceReport::default();

        for (item, quantity) in &self.items_lost {
            staged.inventory.remove_item(item, *quantity)?;
        }

        if self.credits_change < 0 && staged.credits as i64 + self.credits_change < 0 {
            return Err(RulesError::InsufficientCredits {
                needed: self.credits_change.unsigned_abs() as u32,
                available: staged.credits,
            });
        }
        staged.adjust_credits(self.credits_change);

        for (item, quantity) in &self.items_gained {
            match staged.inventory.add_item(item, *quantity) {
                Ok(()) => report.items_gained.push(item.clone()),
                Err(RulesError::CapacityExceeded { .. }) => {
                    warn!(item = %item, "inventory full, item dropped");
                    report.items_dropped.push(item.clone());
                }
                Err(err) => return Err(err),
            }
        }

        for (stat, delta) in &self.stats_change {
            let value = staged.stats.get_mut(*stat);
            *value = (*value + delta).max(1);
            if *stat == Stat::Strength {
                let before = staged.max_health;
                staged.recalculate_max_health(config.health_per_level);
                let gained = staged.max_health - before;
                if gained > 0 {
                    staged.set_health(staged.health + gained);
                }
            }
        }

        let before = staged.health;
        staged.set_health(staged.health + self.health_change);
        report.health_change = staged.health - before;

        if self.experience > 0 {
            report.level_ups = progression::grant_experience(&mut staged, self.experience, config);
        }

        for (faction, delta) in &self.reputation_change {
            staged.adjust_reputation(faction, *delta);
        }

        for flag in &self.set_flags {
            staged_flags.insert(flag.clone());
        }
        for flag in &self.clear_flags {
            staged_flags.remove(flag);
        }

        *character = staged;
        *flags = staged_flags;
        Ok(report)
    }

    /// Like [`Consequence::apply`], but losses are capped at what the
    /// character holds. Used for outcomes the player did not pick: node
    /// entry, escapes and failed checks.
    pub fn apply_forced(
        &self,
        character: &mut Character,
        flags: &mut BTreeSet<String>,
        catalogs: &Catalogs,
        config: &ProgressionConfig,
    ) -> Result<ConsequenceReport, RulesError> {
        let mut capped = self.clone();
        capped.items_lost = self
            .items_lost
            .iter()
            .map(|(item, quantity)| (item.clone(), (*quantity).min(character.inventory.count(item))))
            .filter(|(_, quantity)| *quantity > 0)
            .collect();
        capped.credits_change = self.credits_change.max(-(character.credits as i64));
        capped.apply(character, flags, catalogs, config)
    }
}
