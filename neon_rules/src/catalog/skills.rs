//! Skill tree definitions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::entities::Stat;
use crate::error::{Result, RulesError};

/// Bonuses granted by one level of a skill. Totals add up across levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillBonus {
    pub damage: i32,
    pub defense: i32,
    /// Added to the flee probability.
    pub flee: f64,
    /// Added to every healing item.
    pub healing: i32,
    /// Percent off shop prices.
    pub vendor_discount: u32,
    /// Applied to base stats once, when the level is learned.
    pub stats: BTreeMap<Stat, i32>,
}

impl SkillBonus {
    fn accumulate(&mut self, other: &SkillBonus) {
        self.damage += other.damage;
        self.defense += other.defense;
        self.flee += other.flee;
        self.healing += other.healing;
        self.vendor_discount += other.vendor_discount;
        for (stat, delta) in &other.stats {
            *self.stats.entry(*stat).or_default() += delta;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPrerequisite {
    pub skill: String,
    pub level: u32,
}

/// Catalog entry for a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub prerequisites: Vec<SkillPrerequisite>,
    /// Bonus per level; the length is the max level.
    pub levels: Vec<SkillBonus>,
}

impl SkillDefinition {
    pub fn max_level(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Bonus granted by one specific level (1-based).
    pub fn level_bonus(&self, level: u32) -> Option<&SkillBonus> {
        level
            .checked_sub(1)
            .and_then(|index| self.levels.get(index as usize))
    }
}

/// Immutable lookup table of skills.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillCatalog {
    skills: HashMap<String, SkillDefinition>,
}

impl SkillCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of skill ID -> definition.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| RulesError::Catalog(format!("skills: {}", e)))
    }

    pub fn insert(&mut self, id: impl Into<String>, definition: SkillDefinition) {
        self.skills.insert(id.into(), definition);
    }

    pub fn with_skill(mut self, id: impl Into<String>, definition: SkillDefinition) -> Self {
        self.insert(id, definition);
        self
    }

    pub fn get(&self, id: &str) -> Result<&SkillDefinition> {
        self.skills
            .get(id)
            .ok_or_else(|| RulesError::UnknownSkill(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Sum of bonuses for every learned skill level. Unknown skills are ignored.
    pub fn total_bonus(&self, learned: &BTreeMap<String, u32>) -> SkillBonus {
        let mut total = SkillBonus::default();
        for (id, level) in learned {
            if let Some(definition) = self.skills.get(id) {
                for bonus in definition.levels.iter().take(*level as usize) {
                    total.accumulate(bonus);
                }
            }
        }
        total
    }
}
