//! Persistent game state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use neon_rules::Character;

/// A choice the player made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub node: String,
    pub choice: String,
    pub target: String,
}

/// The most recent choices, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceHistory {
    entries: VecDeque<ChoiceRecord>,
    limit: usize,
}

impl ChoiceHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Record a choice, forgetting the oldest one past the limit.
    pub fn record(&mut self, record: ChoiceRecord) {
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    /// The last `count` choices, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ChoiceRecord> {
        self.entries.iter().skip(self.entries.len().saturating_sub(count))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChoiceRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything needed to resume a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub character: Character,
    pub current_node: String,
    pub previous_node: Option<String>,
    /// Story flags set and cleared by consequences.
    #[serde(default)]
    pub flags: BTreeSet<String>,
    pub history: ChoiceHistory,
    #[serde(default)]
    pub game_over: bool,
    /// Ending node id, or `"defeat"`.
    #[serde(default)]
    pub ending: Option<String>,
}

impl GameState {
    pub fn new(character: Character, start_node: impl Into<String>, history_limit: usize) -> Self {
        Self {
            character,
            current_node: start_node.into(),
            previous_node: None,
            flags: BTreeSet::new(),
            history: ChoiceHistory::new(history_limit),
            game_over: false,
            ending: None,
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}
