//! Immutable lookup tables for items, enemies and skills.
//!
//! Catalogs are loaded once and only read afterwards. Lookups fail with a
//! descriptive error instead of falling back to a default entry.

mod enemies;
mod items;
mod skills;

pub use enemies::*;
pub use items::*;
pub use skills::*;

use crate::error::Result;

/// All rule catalogs bundled together.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub items: ItemCatalog,
    pub enemies: EnemyCatalog,
    pub skills: SkillCatalog,
}

impl Catalogs {
    pub fn new(items: ItemCatalog, enemies: EnemyCatalog, skills: SkillCatalog) -> Self {
        Self {
            items,
            enemies,
            skills,
        }
    }

    /// Parse all three catalogs from JSON text.
    pub fn from_json(items: &str, enemies: &str, skills: &str) -> Result<Self> {
        Ok(Self::new(
            ItemCatalog::from_json(items)?,
            EnemyCatalog::from_json(enemies)?,
            SkillCatalog::from_json(skills)?,
        ))
    }
}

/// Seed catalogs with the bundled default content.
pub fn default_catalogs() -> Result<Catalogs> {
    Catalogs::from_json(
        include_str!("../../data/items.json"),
        include_str!("../../data/enemies.json"),
        include_str!("../../data/skills.json"),
    )
}
