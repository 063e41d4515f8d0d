//! Story Graph - node storage and reference checks.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use neon_rules::Catalogs;

use super::{EnemyRef, NodeKind, StoryNode};
use crate::error::{Result, StoryError};

/// A choice or outcome that points at a node the graph does not hold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DanglingTarget {
    pub from: String,
    pub target: String,
}

/// A node that names an item or enemy missing from the catalogs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MissingReference {
    Item { node: String, item: String },
    Enemy { node: String, enemy: String },
}

/// The story graph: node id -> node.
///
/// Static content is loaded once; the only mutation afterwards is inserting
/// dynamically generated nodes, and existing nodes are never replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryGraph {
    nodes: HashMap<String, StoryNode>,
}

impl StoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of id -> node. Node ids default to their keys.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut nodes: HashMap<String, StoryNode> =
            serde_json::from_str(text).map_err(|e| StoryError::Graph(e.to_string()))?;
        for (key, node) in nodes.iter_mut() {
            if node.id.is_empty() {
                node.id = key.clone();
            } else if node.id != *key {
                return Err(StoryError::Graph(format!(
                    "node '{}' is stored under key '{}'",
                    node.id, key
                )));
            }
        }
        Ok(Self { nodes })
    }

    /// Add a node unless one with the same id exists. Returns whether it was added.
    pub fn insert(&mut self, node: StoryNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    pub fn with_node(mut self, node: StoryNode) -> Self {
        self.insert(node);
        self
    }

    pub fn get(&self, id: &str) -> Result<&StoryNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| StoryError::UnknownNode(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids, sorted.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Targets that point outside the graph, sorted. These are either
    /// authoring mistakes or hooks for dynamic content.
    pub fn validate(&self) -> Vec<DanglingTarget> {
        let mut dangling: Vec<DanglingTarget> = self
            .nodes
            .values()
            .flat_map(|node| {
                node.targets()
                    .into_iter()
                    .filter(|target| !self.contains(target))
                    .map(|target| DanglingTarget {
                        from: node.id.clone(),
                        target: target.to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        dangling.sort();
        dangling.dedup();
        dangling
    }

    /// Items and enemies named by nodes but missing from the catalogs, sorted.
    pub fn missing_references(&self, catalogs: &Catalogs) -> Vec<MissingReference> {
        let mut missing = Vec::new();
        for node in self.nodes.values() {
            let mut items: HashSet<&str> = HashSet::new();
            let consequences = node
                .on_enter
                .iter()
                .chain(node.choices.iter().filter_map(|c| c.consequence.as_ref()));
            for consequence in consequences {
                items.extend(consequence.items_gained.keys().map(String::as_str));
                items.extend(consequence.items_lost.keys().map(String::as_str));
            }
            items.extend(
                node.choices
                    .iter()
                    .filter_map(|c| c.requirement.as_ref()?.item.as_deref()),
            );

            match &node.kind {
                NodeKind::Combat(combat) => {
                    if let EnemyRef::Named(name) = &combat.enemy {
                        if !catalogs.enemies.contains(name) {
                            missing.push(MissingReference::Enemy {
                                node: node.id.clone(),
                                enemy: name.clone(),
                            });
                        }
                    }
                    items.extend(combat.rewards.items_gained.keys().map(String::as_str));
                }
                NodeKind::Shop(shop) => items.extend(shop.inventory.keys().map(String::as_str)),
                NodeKind::SkillCheck(check) => {
                    items.extend(check.success_rewards.items_gained.keys().map(String::as_str));
                }
                NodeKind::Narrative | NodeKind::Ending => {}
            }

            missing.extend(
                items
                    .into_iter()
                    .filter(|item| !catalogs.items.contains(item))
                    .map(|item| MissingReference::Item {
                        node: node.id.clone(),
                        item: item.to_string(),
                    }),
            );
        }
        missing.sort();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story_graph::{Choice, CombatNode, Consequence};
    use neon_rules::default_catalogs;

    fn small_graph() -> StoryGraph {
        StoryGraph::new()
            .with_node(
                StoryNode::new("intro", "Neon Dreams", "Rain.")
                    .with_choice(Choice::new("Head out", "street_entrance"))
                    .with_choice(Choice::new("Climb", "service_ladder")),
            )
            .with_node(
                StoryNode::new("street_entrance", "The Streets", "Crowds.")
                    .with_choice(Choice::new("Back", "intro")),
            )
    }

    #[test]
    fn test_get_and_unknown_node() {
        let graph = small_graph();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get("intro").unwrap().title, "Neon Dreams");
        assert!(matches!(
            graph.get("nowhere"),
            Err(StoryError::UnknownNode(id)) if id == "nowhere"
        ));
    }

    #[test]
    fn test_insert_never_replaces() {
        let mut graph = small_graph();
        assert!(!graph.insert(StoryNode::new("intro", "Other", "Other")));
        assert_eq!(graph.get("intro").unwrap().title, "Neon Dreams");

        assert!(graph.insert(StoryNode::new("service_ladder", "Ladder", "Up.")));
        assert!(graph.contains("service_ladder"));
    }

    #[test]
    fn test_validate_lists_dangling_targets() {
        let graph = small_graph();
        assert_eq!(
            graph.validate(),
            vec![DanglingTarget {
                from: "intro".into(),
                target: "service_ladder".into()
            }]
        );
    }

    #[test]
    fn test_from_json_fills_ids() {
        let graph = StoryGraph::from_json(
            r#"{"intro": {"title": "Start", "text": "Go.", "choices": [{"text": "On", "next_node": "intro"}]}}"#,
        )
        .unwrap();
        assert_eq!(graph.get("intro").unwrap().id, "intro");
        assert!(graph.validate().is_empty());

        let mismatched = StoryGraph::from_json(r#"{"a": {"id": "b", "title": "t", "text": "x"}}"#);
        assert!(matches!(mismatched, Err(StoryError::Graph(_))));

        assert!(matches!(StoryGraph::from_json("[1, 2]"), Err(StoryError::Graph(_))));
    }

    #[test]
    fn test_missing_references() {
        let catalogs = default_catalogs().unwrap();
        let graph = StoryGraph::new()
            .with_node(
                StoryNode::new("fight", "Fight", "!").with_kind(NodeKind::Combat(CombatNode::new(
                    EnemyRef::Named("Cyber Dragon".into()),
                    "after",
                ))),
            )
            .with_node(
                StoryNode::new("after", "After", ".")
                    .with_entry(Consequence::default().gain_item("Unobtainium", 1)),
            );

        assert_eq!(
            graph.missing_references(&catalogs),
            vec![
                MissingReference::Item {
                    node: "after".into(),
                    item: "Unobtainium".into()
                },
                MissingReference::Enemy {
                    node: "fight".into(),
                    enemy: "Cyber Dragon".into()
                },
            ]
        );
    }
}
