//! Experience, levels, stat points and skills.
//!
//! Surplus experience carries over: a grant larger than the threshold leaves the
//! remainder toward the next level, and one grant can raise several levels.

use tracing::info;

use crate::catalog::Catalogs;
use crate::config::ProgressionConfig;
use crate::entities::{Character, Stat};
use crate::error::{Result, RulesError};

/// One level gained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUp {
    pub new_level: u32,
    pub points_gained: u32,
    pub max_health: i32,
}

/// Experience needed to advance from `level` to the next.
pub fn xp_to_next(level: u32, config: &ProgressionConfig) -> u32 {
    let needed = config.level_up_base_xp as f64 * level.max(1) as f64 * config.xp_curve;
    (needed.round() as u32).max(1)
}

/// Add experience and apply every level-up it pays for.
pub fn grant_experience(
    character: &mut Character,
    amount: u32,
    config: &ProgressionConfig,
) -> Vec<LevelUp> {
    character.experience = character.experience.saturating_add(amount);

    let mut gained = Vec::new();
    loop {
        let needed = xp_to_next(character.level, config);
        if character.experience < needed {
            break;
        }
        character.experience -= needed;
        gained.push(level_up(character, config));
    }
    gained
}

/// Advance one level: grant points, recompute max health and heal to full.
pub fn level_up(character: &mut Character, config: &ProgressionConfig) -> LevelUp {
    character.level += 1;
    character.unspent_points += config.points_per_level;
    character.recalculate_max_health(config.health_per_level);
    character.health = character.max_health;

    info!(
        character = %character.name,
        level = character.level,
        max_health = character.max_health,
        "level up"
    );

    LevelUp {
        new_level: character.level,
        points_gained: config.points_per_level,
        max_health: character.max_health,
    }
}

/// Shift a base stat. Strength changes move max health and current health together.
fn raise_stat(character: &mut Character, stat: Stat, delta: i32, config: &ProgressionConfig) {
    let before = character.max_health;
    *character.stats.get_mut(stat) += delta;
    if stat == Stat::Strength {
        character.recalculate_max_health(config.health_per_level);
        let gain = character.max_health - before;
        let health = character.health + gain;
        character.set_health(health);
    }
}

/// Spend one unspent point on a primary stat.
pub fn allocate_point(
    character: &mut Character,
    stat: Stat,
    config: &ProgressionConfig,
) -> Result<()> {
    if character.unspent_points == 0 {
        return Err(RulesError::NoUnspentPoints);
    }
    character.unspent_points -= 1;
    raise_stat(character, stat, 1, config);
    Ok(())
}

/// Spend one unspent point on the next level of a skill. Returns the new level.
pub fn learn_skill(
    character: &mut Character,
    skill_id: &str,
    catalogs: &Catalogs,
    config: &ProgressionConfig,
) -> Result<u32> {
    let skill = catalogs.skills.get(skill_id)?;
    let current = character.skill_level(skill_id);
    if current >= skill.max_level() {
        return Err(RulesError::SkillMaxed(skill_id.to_string()));
    }
    if let Some(missing) = skill
        .prerequisites
        .iter()
        .find(|p| character.skill_level(&p.skill) < p.level)
    {
        return Err(RulesError::SkillLocked {
            skill: skill_id.to_string(),
            requires: missing.skill.clone(),
            level: missing.level,
        });
    }
    if character.unspent_points == 0 {
        return Err(RulesError::NoUnspentPoints);
    }

    let new_level = current + 1;
    character.unspent_points -= 1;
    character.skills.insert(skill_id.to_string(), new_level);
    if let Some(bonus) = skill.level_bonus(new_level) {
        for (stat, delta) in &bonus.stats {
            raise_stat(character, *stat, *delta, config);
        }
    }

    info!(skill = skill_id, level = new_level, "skill learned");
    Ok(new_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalogs;
    use crate::entities::CharacterClass;

    fn config() -> ProgressionConfig {
        ProgressionConfig::default()
    }

    #[test]
    fn test_threshold_curve() {
        let config = config();
        assert_eq!(xp_to_next(1, &config), 150);
        assert_eq!(xp_to_next(2, &config), 300);
    }

    #[test]
    fn test_surplus_carries_over() {
        let config = config();
        let mut character = Character::new("V", CharacterClass::Tech);
        character.set_health(5);

        let ups = grant_experience(&mut character, 200, &config);
        assert_eq!(ups.len(), 1);
        assert_eq!(character.level, 2);
        assert_eq!(character.experience, 50);
        assert_eq!(character.unspent_points, 2);
        assert_eq!(character.max_health, 18);
        assert_eq!(character.health, 18);
    }

    #[test]
    fn test_multiple_levels_in_one_grant() {
        let config = config();
        let mut character = Character::new("V", CharacterClass::Tech);

        let ups = grant_experience(&mut character, 150 + 300 + 10, &config);
        assert_eq!(ups.iter().map(|u| u.new_level).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(character.experience, 10);
        assert_eq!(character.unspent_points, 4);
    }

    #[test]
    fn test_below_threshold_no_level() {
        let mut character = Character::new("V", CharacterClass::Tech);
        assert!(grant_experience(&mut character, 50, &config()).is_empty());
        assert_eq!(character.level, 1);
        assert_eq!(character.experience, 50);
    }

    #[test]
    fn test_allocate_strength_raises_health() {
        let config = config();
        let mut character = Character::new("V", CharacterClass::NetRunner);
        assert_eq!(
            allocate_point(&mut character, Stat::Strength, &config),
            Err(RulesError::NoUnspentPoints)
        );

        character.unspent_points = 1;
        character.set_health(10);
        allocate_point(&mut character, Stat::Strength, &config).unwrap();
        assert_eq!(character.stats.strength, 4);
        assert_eq!(character.max_health, 18);
        assert_eq!(character.health, 12);
        assert_eq!(character.unspent_points, 0);
    }

    #[test]
    fn test_learn_skill_rules() {
        let config = config();
        let catalogs = default_catalogs().unwrap();
        let mut character = Character::new("V", CharacterClass::NetRunner);

        assert_eq!(
            learn_skill(&mut character, "melee_master", &catalogs, &config),
            Err(RulesError::NoUnspentPoints)
        );
        assert_eq!(
            learn_skill(&mut character, "jedi", &catalogs, &config),
            Err(RulesError::UnknownSkill("jedi".into()))
        );

        character.unspent_points = 10;
        assert_eq!(
            learn_skill(&mut character, "drone_master", &catalogs, &config),
            Err(RulesError::SkillLocked {
                skill: "drone_master".into(),
                requires: "network_infiltrator".into(),
                level: 2
            })
        );

        learn_skill(&mut character, "network_infiltrator", &catalogs, &config).unwrap();
        let level = learn_skill(&mut character, "network_infiltrator", &catalogs, &config).unwrap();
        assert_eq!(level, 2);
        // Level 2 grants +1 intelligence
        assert_eq!(character.stats.intelligence, 9);
        assert_eq!(
            learn_skill(&mut character, "drone_master", &catalogs, &config),
            Ok(1)
        );
        assert_eq!(character.unspent_points, 7);
    }

    #[test]
    fn test_skill_maxed() {
        let config = config();
        let catalogs = default_catalogs().unwrap();
        let mut character = Character::new("V", CharacterClass::Tech);
        character.unspent_points = 10;

        for _ in 0..4 {
            learn_skill(&mut character, "cyber_surgeon", &catalogs, &config).unwrap();
        }
        assert_eq!(
            learn_skill(&mut character, "cyber_surgeon", &catalogs, &config),
            Err(RulesError::SkillMaxed("cyber_surgeon".into()))
        );
        assert_eq!(character.unspent_points, 6);
    }
}
