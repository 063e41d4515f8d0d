//! Item definitions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::entities::Stat;
use crate::error::{Result, RulesError};
use crate::inventory::Inventory;
use crate::mechanics::DamageType;

/// Item categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Consumable,
    Equipment,
    Software,
    Weapon,
    Armor,
    Currency,
    Storage,
    Key,
    MissionItem,
    Augmentation,
}

/// Effects that need more than a number to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialEffect {
    /// Clears harmful status effects.
    RemoveStatus,
    /// Disables the opposing combatant for the effect duration.
    EmpDisable,
    /// Makes the user harder to pin down.
    StealthBoost,
    /// Blocks chemical damage.
    ToxinImmunity,
    /// Purely informational for the renderer.
    RevealMap,
}

/// What happens when an item is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemEffects {
    pub health: Option<i32>,
    pub stats: BTreeMap<Stat, i32>,
    /// Duration of stat boosts and special effects, in ticks.
    pub duration: Option<u32>,
    pub special: Option<SpecialEffect>,
}

impl ItemEffects {
    pub fn is_empty(&self) -> bool {
        self.health.is_none() && self.stats.is_empty() && self.special.is_none()
    }
}

/// Catalog entry for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub usable: bool,
    #[serde(default)]
    pub usable_in_combat: bool,
    /// Permanent items stay in the inventory after use.
    #[serde(default)]
    pub permanent: bool,
    /// Weapon damage bonus.
    #[serde(default)]
    pub damage: Option<i32>,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    /// Armor defense bonus.
    #[serde(default)]
    pub defense: Option<i32>,
    /// Base shop price.
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub effects: ItemEffects,
}

impl ItemDefinition {
    /// Create a definition of the given type with no effects.
    pub fn new(item_type: ItemType) -> Self {
        Self {
            description: String::new(),
            item_type,
            usable: false,
            usable_in_combat: false,
            permanent: false,
            damage: None,
            damage_type: None,
            defense: None,
            price: None,
            effects: ItemEffects::default(),
        }
    }

    /// Mark the item usable, optionally in combat.
    pub fn usable(mut self, in_combat: bool) -> Self {
        self.usable = true;
        self.usable_in_combat = in_combat;
        self
    }

    /// Set the use effects.
    pub fn with_effects(mut self, effects: ItemEffects) -> Self {
        self.effects = effects;
        self
    }

    /// Set weapon damage.
    pub fn with_damage(mut self, damage: i32, damage_type: DamageType) -> Self {
        self.damage = Some(damage);
        self.damage_type = Some(damage_type);
        self
    }

    /// Set armor defense.
    pub fn with_defense(mut self, defense: i32) -> Self {
        self.defense = Some(defense);
        self
    }

    /// Mark the item as permanent.
    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }
}

/// Immutable lookup table of item definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCatalog {
    items: HashMap<String, ItemDefinition>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of item name -> definition.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| RulesError::Catalog(format!("items: {}", e)))
    }

    /// Add a definition (catalog construction only).
    pub fn insert(&mut self, name: impl Into<String>, definition: ItemDefinition) {
        self.items.insert(name.into(), definition);
    }

    /// Builder form of [`ItemCatalog::insert`].
    pub fn with_item(mut self, name: impl Into<String>, definition: ItemDefinition) -> Self {
        self.insert(name, definition);
        self
    }

    /// Look up an item, failing on unknown names.
    pub fn get(&self, name: &str) -> Result<&ItemDefinition> {
        self.items
            .get(name)
            .ok_or_else(|| RulesError::UnknownItem(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.items.keys()
    }

    /// Strongest weapon held, as (damage, damage type).
    pub fn best_weapon(&self, inventory: &Inventory) -> Option<(i32, DamageType)> {
        inventory
            .iter()
            .filter_map(|(name, _)| self.items.get(name))
            .filter(|def| def.item_type == ItemType::Weapon)
            .filter_map(|def| {
                def.damage
                    .map(|d| (d, def.damage_type.unwrap_or(DamageType::Physical)))
            })
            .max_by_key(|(damage, _)| *damage)
    }

    /// Defense of the best armor held (0 without armor).
    pub fn best_armor(&self, inventory: &Inventory) -> i32 {
        inventory
            .iter()
            .filter_map(|(name, _)| self.items.get(name))
            .filter(|def| def.item_type == ItemType::Armor)
            .filter_map(|def| def.defense)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ItemCatalog {
        ItemCatalog::new()
            .with_item("Heavy Pistol", ItemDefinition::new(ItemType::Weapon).with_damage(5, DamageType::Physical))
            .with_item("Concealed Pistol", ItemDefinition::new(ItemType::Weapon).with_damage(3, DamageType::Physical))
            .with_item("Armored Vest", ItemDefinition::new(ItemType::Armor).with_defense(2))
    }

    #[test]
    fn test_parse_definition() {
        let catalog = ItemCatalog::from_json(
            r#"{
                "Stimpack": {
                    "type": "consumable",
                    "usable": true,
                    "usable_in_combat": true,
                    "effects": { "health": 5 }
                },
                "Neural Booster": {
                    "type": "consumable",
                    "usable": true,
                    "effects": { "stats": { "intelligence": 2 }, "duration": 3 }
                }
            }"#,
        )
        .unwrap();

        let stim = catalog.get("Stimpack").unwrap();
        assert_eq!(stim.effects.health, Some(5));
        assert!(stim.usable_in_combat);

        let booster = catalog.get("Neural Booster").unwrap();
        assert_eq!(booster.effects.stats.get(&Stat::Intelligence), Some(&2));
        assert!(!booster.usable_in_combat);
    }

    #[test]
    fn test_unknown_item_fails_fast() {
        let catalog = catalog();
        assert_eq!(
            catalog.get("Plasma Rifle").unwrap_err(),
            RulesError::UnknownItem("Plasma Rifle".into())
        );
    }

    #[test]
    fn test_bad_json_is_catalog_error() {
        let result = ItemCatalog::from_json(r#"{ "Thing": { "type": "spaceship" } }"#);
        assert!(matches!(result, Err(RulesError::Catalog(_))));
    }

    #[test]
    fn test_equipment_queries() {
        let catalog = catalog();
        let mut inventory = Inventory::default();
        assert_eq!(catalog.best_weapon(&inventory), None);
        assert_eq!(catalog.best_armor(&inventory), 0);

        inventory.add_item("Concealed Pistol", 1).unwrap();
        inventory.add_item("Heavy Pistol", 1).unwrap();
        inventory.add_item("Armored Vest", 1).unwrap();

        assert_eq!(catalog.best_weapon(&inventory), Some((5, DamageType::Physical)));
        assert_eq!(catalog.best_armor(&inventory), 2);
    }
}
