//! Read-only views handed to the renderer.

use neon_rules::{Encounter, Stance, Stat, TurnReport};

use crate::story_graph::ConsequenceReport;

/// What the renderer needs to draw the current node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: String,
    pub title: String,
    pub text: String,
    pub kind: NodeKindView,
    pub choices: Vec<ChoiceView>,
}

/// Kind-specific details of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKindView {
    Narrative,
    Combat { enemy: String },
    Shop { shop_name: String, wares: Vec<WareView> },
    SkillCheck { stat: Stat, difficulty: i32 },
    Ending,
}

/// A choice and whether it can be taken. Locked choices are listed with a
/// reason; whether to hide or grey them out is up to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub index: usize,
    pub text: String,
    pub enabled: bool,
    pub locked_reason: Option<String>,
}

/// One item for sale, at the character's price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WareView {
    pub item: String,
    pub price: u32,
    pub description: String,
    pub affordable: bool,
}

/// Snapshot of a running encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatView {
    pub enemy: String,
    pub enemy_health: i32,
    pub enemy_max_health: i32,
    pub player_health: i32,
    pub player_max_health: i32,
    pub player_stance: Stance,
    pub enemy_stance: Stance,
    pub turn: u32,
}

impl CombatView {
    pub(crate) fn new(encounter: &Encounter, player_health: i32, player_max_health: i32) -> Self {
        Self {
            enemy: encounter.enemy.name.clone(),
            enemy_health: encounter.enemy.health,
            enemy_max_health: encounter.enemy.max_health,
            player_health,
            player_max_health,
            player_stance: encounter.player_stance,
            enemy_stance: encounter.enemy.stance,
            turn: encounter.turn,
        }
    }
}

/// One combat round and, once the encounter resolved, where the story went.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatTurn {
    pub report: TurnReport,
    /// Set when the encounter resolved and the story moved on.
    pub next: Option<NodeView>,
}

/// Outcome of a skill check node.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillCheckResult {
    pub stat: Stat,
    pub roll: i32,
    pub stat_value: i32,
    pub difficulty: i32,
    pub success: bool,
    pub consequence: ConsequenceReport,
    pub next: NodeView,
}

/// A completed purchase or sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub item: String,
    pub quantity: u32,
    /// Credits paid (buying) or received (selling).
    pub credits: u32,
}
