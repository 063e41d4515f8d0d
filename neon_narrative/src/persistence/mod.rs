//! Save games and their on-disk store.
//!
//! A save is a versioned JSON document holding the full [`GameState`] plus
//! any dynamically generated nodes the state may point at.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

use neon_rules::CharacterClass;

use crate::engine::GameState;
use crate::error::PersistenceError;
use crate::story_graph::StoryNode;

/// Current save format version.
pub const SAVE_VERSION: u32 = 1;

const SAVE_EXTENSION: &str = "json";

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Unique identifier for a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveId(pub Uuid);

impl SaveId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SaveId {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary shown in a load menu without decoding the whole state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub character_name: String,
    pub class: CharacterClass,
    pub level: u32,
    pub node: String,
    /// Seconds since the Unix epoch.
    pub saved_at: u64,
}

/// A complete save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    pub save_id: SaveId,
    pub metadata: SaveMetadata,
    pub state: GameState,
    /// Nodes created by the content generator during play.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated_nodes: Vec<StoryNode>,
}

impl SaveGame {
    pub fn new(state: GameState) -> Self {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            version: SAVE_VERSION,
            save_id: SaveId::new(),
            metadata: SaveMetadata {
                character_name: state.character.name.clone(),
                class: state.character.class,
                level: state.character.level,
                node: state.current_node.clone(),
                saved_at,
            },
            state,
            generated_nodes: Vec::new(),
        }
    }

    pub fn with_generated_nodes(mut self, nodes: Vec<StoryNode>) -> Self {
        self.generated_nodes = nodes;
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a save, checking the version before the rest of the document.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let found = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0) as u32;
        if found != SAVE_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found,
                supported: SAVE_VERSION,
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// A named save slot found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSlot {
    pub name: String,
    pub metadata: SaveMetadata,
}

/// Directory of save files, one JSON file per slot.
#[derive(Debug, Clone)]
pub struct SaveStore {
    base_dir: PathBuf,
}

impl SaveStore {
    /// Open a store, creating the directory if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn slot_path(&self, name: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", sanitize_name(name), SAVE_EXTENSION))
    }

    /// Write a save, replacing the slot atomically.
    pub fn save(&self, name: &str, save: &SaveGame) -> Result<PathBuf> {
        let path = self.slot_path(name);
        let temp_path = path.with_extension("json.tmp");

        fs::write(&temp_path, save.to_json()?)?;
        fs::rename(&temp_path, &path)?;

        debug!(slot = name, path = %path.display(), "saved game");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<SaveGame> {
        let path = self.slot_path(name);
        if !path.exists() {
            return Err(PersistenceError::NotFound(name.to_string()));
        }
        let save = SaveGame::from_json(&fs::read_to_string(&path)?)?;
        debug!(slot = name, path = %path.display(), "loaded game");
        Ok(save)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.slot_path(name).exists()
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.slot_path(name);
        if !path.exists() {
            return Err(PersistenceError::NotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Every readable save, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<SaveSlot>> {
        let mut slots = Vec::new();

        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SAVE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let loaded = fs::read_to_string(&path)
                .map_err(PersistenceError::from)
                .and_then(|text| SaveGame::from_json(&text));
            match loaded {
                Ok(save) => slots.push(SaveSlot {
                    name: name.to_string(),
                    metadata: save.metadata,
                }),
                Err(err) => warn!(path = %path.display(), %err, "skipping unreadable save"),
            }
        }

        slots.sort_by(|a, b| {
            b.metadata
                .saved_at
                .cmp(&a.metadata.saved_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(slots)
    }
}

/// Reduce a slot name to a safe file stem.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "save".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neon_rules::{Character, Stat, StatusEffect, StatusMagnitude};

    fn state() -> GameState {
        let mut character = Character::new("Kira", CharacterClass::NetRunner);
        character.inventory.add_item("Stimpack", 2).unwrap();
        character.inventory.add_item("Cyberdeck", 1).unwrap();
        character.health = 9;
        character.status_effects.apply(
            "reflex_boost",
            StatusEffect::timed(
                StatusMagnitude::Stat {
                    stat: Stat::Reflex,
                    delta: 2,
                },
                2,
            ),
        );
        let mut state = GameState::new(character, "marketplace", 20);
        state.flags.insert("job_accepted".into());
        state
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("slot 1"), "slot_1");
        assert_eq!(sanitize_name("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_name("   "), "save");
        assert_eq!(sanitize_name("quick-save_2"), "quick-save_2");
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path()).unwrap();
        let save = SaveGame::new(state());

        let path = store.save("slot 1", &save).unwrap();
        assert!(path.ends_with("slot_1.json"));
        assert!(store.exists("slot 1"));

        let loaded = store.load("slot 1").unwrap();
        assert_eq!(loaded, save);
        assert_eq!(loaded.state.character.health, 9);
        assert_eq!(loaded.state.character.inventory.count("Stimpack"), 2);
        assert!(loaded.state.character.has_status("reflex_boost"));
        assert_eq!(loaded.state.current_node, "marketplace");
        assert_eq!(loaded.metadata.character_name, "Kira");
    }

    #[test]
    fn test_missing_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path()).unwrap();
        assert!(matches!(store.load("nothing"), Err(PersistenceError::NotFound(_))));
        assert!(matches!(store.delete("nothing"), Err(PersistenceError::NotFound(_))));
    }

    #[test]
    fn test_version_checked() {
        let save = SaveGame::new(state());
        let mut value = serde_json::to_value(&save).unwrap();
        value["version"] = serde_json::json!(99);

        let err = SaveGame::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedVersion {
                found: 99,
                supported: SAVE_VERSION
            }
        ));
    }

    #[test]
    fn test_list_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path()).unwrap();

        let mut older = SaveGame::new(state());
        older.metadata.saved_at = 100;
        let mut newer = SaveGame::new(state());
        newer.metadata.saved_at = 200;
        store.save("older", &older).unwrap();
        store.save("newer", &newer).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let slots = store.list().unwrap();
        let names: Vec<&str> = slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["newer", "older"]);
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path()).unwrap();
        store.save("slot", &SaveGame::new(state())).unwrap();
        store.delete("slot").unwrap();
        assert!(!store.exists("slot"));
    }
}
