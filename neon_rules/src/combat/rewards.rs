//! Victory rewards: loot, experience and credits.

use tracing::{info, warn};

use crate::config::ProgressionConfig;
use crate::dice::Dice;
use crate::entities::Character;
use crate::progression::{self, LevelUp};

use super::Enemy;

/// Everything granted for a win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VictoryRewards {
    pub experience: u32,
    pub credits: u32,
    /// Loot that made it into the inventory.
    pub items_granted: Vec<String>,
    /// Loot that dropped but did not fit.
    pub items_dropped: Vec<String>,
    pub level_ups: Vec<LevelUp>,
}

/// Roll each loot entry independently, in name order.
pub fn roll_loot(enemy: &Enemy, dice: &mut dyn Dice) -> Vec<String> {
    enemy
        .loot_table
        .iter()
        .filter(|(_, probability)| dice.roll_chance(**probability))
        .map(|(item, _)| item.clone())
        .collect()
}

/// Grant loot, credits and experience for defeating `enemy`.
///
/// Loot that does not fit is dropped; nothing here can fail.
pub fn grant_victory(
    character: &mut Character,
    enemy: &Enemy,
    dice: &mut dyn Dice,
    config: &ProgressionConfig,
) -> VictoryRewards {
    let mut rewards = VictoryRewards {
        experience: enemy.experience_reward,
        credits: enemy.credit_reward,
        ..Default::default()
    };

    for item in roll_loot(enemy, dice) {
        match character.inventory.add_item(&item, 1) {
            Ok(()) => rewards.items_granted.push(item),
            Err(err) => {
                warn!(item = %item, %err, "loot dropped");
                rewards.items_dropped.push(item);
            }
        }
    }

    character.adjust_credits(enemy.credit_reward as i64);
    rewards.level_ups = progression::grant_experience(character, enemy.experience_reward, config);

    info!(
        enemy = %enemy.name,
        experience = rewards.experience,
        credits = rewards.credits,
        loot = rewards.items_granted.len(),
        "victory rewards granted"
    );
    rewards
}
