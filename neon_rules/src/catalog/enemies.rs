//! Enemy definitions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{Result, RulesError};
use crate::mechanics::DamageType;

/// Behaviour archetypes; each maps to one AI policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnemyType {
    #[default]
    Standard,
    Berserker,
    Tank,
    Tactician,
    Rogue,
}

impl EnemyType {
    /// Tacticians and rogues are harder to escape from.
    pub fn is_evasive(&self) -> bool {
        matches!(self, EnemyType::Tactician | EnemyType::Rogue)
    }
}

/// Catalog (or inline node) entry for an enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    /// Filled from the catalog key when omitted.
    #[serde(default)]
    pub name: String,
    pub health: i32,
    pub damage: i32,
    #[serde(default)]
    pub defense: i32,
    #[serde(default)]
    pub enemy_type: EnemyType,
    #[serde(default)]
    pub weaknesses: BTreeSet<DamageType>,
    #[serde(default)]
    pub resistances: BTreeSet<DamageType>,
    #[serde(default)]
    pub experience_reward: u32,
    #[serde(default)]
    pub credit_reward: u32,
    /// Item name -> drop probability in `0.0..=1.0`.
    #[serde(default)]
    pub loot_table: BTreeMap<String, f64>,
}

impl EnemyDefinition {
    pub fn new(name: impl Into<String>, health: i32, damage: i32, defense: i32) -> Self {
        Self {
            name: name.into(),
            health,
            damage,
            defense,
            enemy_type: EnemyType::Standard,
            weaknesses: BTreeSet::new(),
            resistances: BTreeSet::new(),
            experience_reward: 0,
            credit_reward: 0,
            loot_table: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, enemy_type: EnemyType) -> Self {
        self.enemy_type = enemy_type;
        self
    }

    pub fn with_rewards(mut self, experience: u32, credits: u32) -> Self {
        self.experience_reward = experience;
        self.credit_reward = credits;
        self
    }

    pub fn with_loot(mut self, item: impl Into<String>, probability: f64) -> Self {
        self.loot_table.insert(item.into(), probability.clamp(0.0, 1.0));
        self
    }

    pub fn with_weakness(mut self, damage_type: DamageType) -> Self {
        self.weaknesses.insert(damage_type);
        self
    }

    pub fn with_resistance(mut self, damage_type: DamageType) -> Self {
        self.resistances.insert(damage_type);
        self
    }

    /// Reject definitions that cannot produce a fair encounter.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RulesError::Catalog("enemy without a name".into()));
        }
        if self.health <= 0 {
            return Err(RulesError::Catalog(format!(
                "enemy '{}' has non-positive health",
                self.name
            )));
        }
        if let Some((item, p)) = self
            .loot_table
            .iter()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(RulesError::Catalog(format!(
                "enemy '{}' drops '{}' with invalid probability {}",
                self.name, item, p
            )));
        }
        Ok(())
    }
}

/// Immutable lookup table of enemy definitions.
#[derive(Debug, Clone, Default)]
pub struct EnemyCatalog {
    enemies: HashMap<String, EnemyDefinition>,
}

impl EnemyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of enemy name -> definition.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: HashMap<String, EnemyDefinition> = serde_json::from_str(text)
            .map_err(|e| RulesError::Catalog(format!("enemies: {}", e)))?;

        let mut catalog = Self::new();
        for (key, mut definition) in raw {
            if definition.name.is_empty() {
                definition.name = key.clone();
            }
            definition.validate()?;
            catalog.enemies.insert(key, definition);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, definition: EnemyDefinition) {
        self.enemies.insert(definition.name.clone(), definition);
    }

    pub fn with_enemy(mut self, definition: EnemyDefinition) -> Self {
        self.insert(definition);
        self
    }

    /// Look up an enemy, failing on unknown names.
    pub fn get(&self, name: &str) -> Result<&EnemyDefinition> {
        self.enemies
            .get(name)
            .ok_or_else(|| RulesError::UnknownEnemy(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.enemies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }
}
