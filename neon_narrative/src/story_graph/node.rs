//! Story nodes and their kinds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use neon_rules::{EnemyDefinition, Stat};

use super::{Choice, Consequence};

/// One location or beat in the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryNode {
    /// Filled from the graph key when omitted.
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    /// Applied every time the node is entered.
    #[serde(default, alias = "consequences", skip_serializing_if = "Option::is_none")]
    pub on_enter: Option<Consequence>,
}

impl StoryNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            kind: NodeKind::Narrative,
            choices: Vec::new(),
            on_enter: None,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_entry(mut self, consequence: Consequence) -> Self {
        self.on_enter = Some(consequence);
        self
    }

    /// Every node id this node can lead to, choices first.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.choices.iter().map(|c| c.next_node.as_str()).collect();
        match &self.kind {
            NodeKind::Narrative | NodeKind::Ending => {}
            NodeKind::Combat(combat) => {
                targets.push(&combat.victory_node);
                targets.extend(combat.defeat_node.as_deref());
                targets.extend(combat.escape_node.as_deref());
            }
            NodeKind::Shop(shop) => targets.push(&shop.exit_node),
            NodeKind::SkillCheck(check) => {
                targets.push(&check.success_node);
                targets.push(&check.failure_node);
            }
        }
        targets
    }

    pub fn is_ending(&self) -> bool {
        matches!(self.kind, NodeKind::Ending)
    }
}

/// What the player does at a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Pick one of the node's choices.
    #[default]
    Narrative,
    Combat(CombatNode),
    Shop(ShopNode),
    SkillCheck(SkillCheckNode),
    /// The story ends here.
    Ending,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Narrative => "narrative",
            NodeKind::Combat(_) => "combat",
            NodeKind::Shop(_) => "shop",
            NodeKind::SkillCheck(_) => "skill_check",
            NodeKind::Ending => "ending",
        }
    }
}

/// A catalog enemy by name, or a definition written into the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnemyRef {
    Named(String),
    Inline(EnemyDefinition),
}

impl EnemyRef {
    pub fn name(&self) -> &str {
        match self {
            EnemyRef::Named(name) => name,
            EnemyRef::Inline(definition) => &definition.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatNode {
    pub enemy: EnemyRef,
    pub victory_node: String,
    /// Where a defeated character wakes up. Without one, defeat ends the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defeat_node: Option<String>,
    /// Without one, a successful escape returns to the previous node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape_node: Option<String>,
    /// Applied on top of the enemy's own rewards.
    #[serde(default)]
    pub rewards: Consequence,
    #[serde(default)]
    pub escape_consequences: Consequence,
}

impl CombatNode {
    pub fn new(enemy: EnemyRef, victory_node: impl Into<String>) -> Self {
        Self {
            enemy,
            victory_node: victory_node.into(),
            defeat_node: None,
            escape_node: None,
            rewards: Consequence::default(),
            escape_consequences: Consequence::default(),
        }
    }
}

/// Price list entry. Without a price, the catalog price is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopEntry {
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopNode {
    pub shop_name: String,
    pub inventory: BTreeMap<String, ShopEntry>,
    pub exit_node: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCheckNode {
    pub stat: Stat,
    pub difficulty: i32,
    pub success_node: String,
    pub failure_node: String,
    #[serde(default)]
    pub success_rewards: Consequence,
    #[serde(default)]
    pub failure_consequences: Consequence,
}
