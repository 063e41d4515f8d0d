//! Inventory ledger: quantity-tracked item ownership and item use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::catalog::{Catalogs, SpecialEffect};
use crate::entities::{Character, StatusEffect, StatusMagnitude};
use crate::error::{Result, RulesError};
use crate::mechanics::{self, STEALTH_BOOST, TOXIN_IMMUNITY};

/// Default number of distinct items a character can carry.
pub const DEFAULT_CAPACITY: usize = 20;

/// Duration used for stat boosts that do not name one.
pub const DEFAULT_BOOST_DURATION: u32 = 3;

/// Item name -> quantity, bounded by a number of distinct entries.
///
/// Present keys always hold a quantity of at least one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
    capacity: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add `quantity` units. A new name is rejected when the inventory is full.
    pub fn add_item(&mut self, name: &str, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(RulesError::InvalidQuantity);
        }
        match self.items.get_mut(name) {
            Some(held) => *held = held.saturating_add(quantity),
            None => {
                if self.items.len() >= self.capacity {
                    return Err(RulesError::CapacityExceeded {
                        item: name.to_string(),
                        capacity: self.capacity,
                    });
                }
                self.items.insert(name.to_string(), quantity);
            }
        }
        Ok(())
    }

    /// Remove `quantity` units, dropping the entry at zero.
    pub fn remove_item(&mut self, name: &str, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(RulesError::InvalidQuantity);
        }
        let held = self.count(name);
        if quantity > held {
            return Err(RulesError::InsufficientQuantity {
                item: name.to_string(),
                requested: quantity,
                held,
            });
        }
        if quantity == held {
            self.items.remove(name);
        } else if let Some(entry) = self.items.get_mut(name) {
            *entry -= quantity;
        }
        Ok(())
    }

    /// Whether at least `quantity` units are held.
    pub fn has_item(&self, name: &str, quantity: u32) -> bool {
        self.count(name) >= quantity.max(1)
    }

    pub fn count(&self, name: &str) -> u32 {
        self.items.get(name).copied().unwrap_or(0)
    }

    /// Items in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(name, qty)| (name.as_str(), *qty))
    }

    /// Number of distinct items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }
}

/// What using an item did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUse {
    pub item: String,
    /// Health actually restored (negative when the item hurts).
    pub health_change: i32,
    /// Statuses applied or refreshed.
    pub statuses_applied: Vec<String>,
    /// Harmful statuses cleared.
    pub statuses_removed: Vec<String>,
    /// Turns the opposing combatant should be disabled for.
    pub emp_disable: Option<u32>,
    pub revealed_map: bool,
    /// Whether a unit was taken from the inventory.
    pub consumed: bool,
}

/// Use one unit of an item on its owner.
///
/// Every check runs before anything changes, so a failed call leaves the
/// character untouched.
pub fn use_item(
    character: &mut Character,
    name: &str,
    in_combat: bool,
    catalogs: &Catalogs,
) -> Result<ItemUse> {
    let held = character.inventory.count(name);
    if held == 0 {
        return Err(RulesError::InsufficientQuantity {
            item: name.to_string(),
            requested: 1,
            held,
        });
    }

    let definition = catalogs.items.get(name)?;
    if !definition.usable {
        return Err(RulesError::ItemNotUsable(name.to_string()));
    }
    if in_combat && !definition.usable_in_combat {
        return Err(RulesError::WrongContext(name.to_string()));
    }

    let mut report = ItemUse {
        item: name.to_string(),
        ..Default::default()
    };

    if !definition.permanent {
        character.inventory.remove_item(name, 1)?;
        report.consumed = true;
    }

    let effects = &definition.effects;
    let duration = effects.duration.unwrap_or(DEFAULT_BOOST_DURATION);

    if let Some(health) = effects.health {
        report.health_change = if health > 0 {
            let bonus = catalogs.skills.total_bonus(&character.skills).healing;
            mechanics::heal(character, health + bonus)
        } else {
            let before = character.health;
            character.set_health(before + health);
            character.health - before
        };
    }

    for (stat, delta) in &effects.stats {
        let magnitude = StatusMagnitude::Stat {
            stat: *stat,
            delta: *delta,
        };
        let (status_name, effect) = if definition.permanent {
            let status_name = if effects.stats.len() == 1 {
                format!("augment:{}", name)
            } else {
                format!("augment:{}:{}", name, stat)
            };
            (status_name, StatusEffect::permanent(magnitude))
        } else {
            (format!("{}_boost", stat), StatusEffect::timed(magnitude, duration))
        };
        character.status_effects.apply(status_name.clone(), effect);
        report.statuses_applied.push(status_name);
    }

    match effects.special {
        Some(SpecialEffect::RemoveStatus) => {
            report.statuses_removed = character.status_effects.cleanse();
        }
        Some(SpecialEffect::EmpDisable) => {
            report.emp_disable = Some(effects.duration.unwrap_or(2));
        }
        Some(SpecialEffect::StealthBoost) => {
            character
                .status_effects
                .apply(STEALTH_BOOST, StatusEffect::flag(duration, false));
            report.statuses_applied.push(STEALTH_BOOST.to_string());
        }
        Some(SpecialEffect::ToxinImmunity) => {
            character
                .status_effects
                .apply(TOXIN_IMMUNITY, StatusEffect::flag(duration, false));
            report.statuses_applied.push(TOXIN_IMMUNITY.to_string());
        }
        Some(SpecialEffect::RevealMap) => report.revealed_map = true,
        None => {}
    }

    debug!(item = name, in_combat, health = report.health_change, "item used");
    Ok(report)
}
