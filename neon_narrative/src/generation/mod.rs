//! Dynamic content - nodes requested from an external generator when the
//! player walks off the authored graph.
//!
//! The generator is an optional collaborator. Whatever it returns is
//! validated before it reaches the graph, and any failure is replaced by a
//! deterministic fallback node, so play never stalls on it.

mod context;

pub use context::*;

use neon_rules::Catalogs;

use crate::error::GenerationError;
use crate::story_graph::{Choice, Consequence, EnemyRef, NodeKind, StoryGraph, StoryNode};

/// Title of the node used when generation fails.
pub const FALLBACK_TITLE: &str = "System Malfunction";

const FALLBACK_TEXT: &str = "Your neural interface flickers, error messages crawling across your \
vision. The data feed is corrupted or jammed. As you try to make sense of your surroundings, the \
static clears just long enough to show you a way forward.";

/// Fallback exits: text, target and health change.
const FALLBACK_ROUTES: [(&str, &str, i32); 3] = [
    ("Try to reboot your neural systems", "street_entrance", 0),
    ("Look for a tech vendor who might help", "marketplace", 0),
    ("Push through despite the system errors", "neon_dragon_exterior", -1),
];

/// Source of story nodes that are not in the authored graph.
pub trait ContentGenerator {
    /// Produce the node `node_id` as JSON in the story node format.
    ///
    /// Implementations own their timeout and report it as
    /// [`GenerationError::Timeout`]; the engine waits for nothing else.
    fn generate(
        &self,
        node_id: &str,
        context: &GenerationContext,
    ) -> Result<serde_json::Value, GenerationError>;
}

/// Turn generator output into a node, rejecting anything the engine could
/// not play.
pub fn parse_generated_node(
    node_id: &str,
    value: serde_json::Value,
    catalogs: &Catalogs,
) -> Result<StoryNode, GenerationError> {
    let mut node: StoryNode =
        serde_json::from_value(value).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    node.id = node_id.to_string();

    if node.title.trim().is_empty() {
        return Err(GenerationError::Malformed("empty title".into()));
    }
    if node.text.trim().is_empty() {
        return Err(GenerationError::Malformed("empty text".into()));
    }
    if let Some(choice) = node
        .choices
        .iter()
        .find(|c| c.text.trim().is_empty() || c.next_node.trim().is_empty())
    {
        return Err(GenerationError::Malformed(format!(
            "incomplete choice '{}' -> '{}'",
            choice.text, choice.next_node
        )));
    }

    match &node.kind {
        NodeKind::Narrative if node.choices.is_empty() => {
            return Err(GenerationError::Malformed("narrative node without choices".into()));
        }
        NodeKind::Combat(combat) => match &combat.enemy {
            EnemyRef::Named(name) if !catalogs.enemies.contains(name) => {
                return Err(GenerationError::Malformed(format!("unknown enemy '{name}'")));
            }
            EnemyRef::Inline(definition) => {
                definition
                    .validate()
                    .map_err(|e| GenerationError::Malformed(e.to_string()))?;
            }
            EnemyRef::Named(_) => {}
        },
        _ => {}
    }

    if node.targets().iter().any(|target| target.trim().is_empty()) {
        return Err(GenerationError::Malformed("empty target node".into()));
    }

    let standalone = StoryGraph::new().with_node(node.clone());
    if let Some(missing) = standalone.missing_references(catalogs).first() {
        return Err(GenerationError::Malformed(format!("{missing:?}")));
    }

    Ok(node)
}

/// The node shown when generation fails. Its choices only lead to nodes the
/// graph holds, falling back to the start node.
pub fn fallback_node(node_id: &str, graph: &StoryGraph, start_node: &str) -> StoryNode {
    let mut node = StoryNode::new(node_id, FALLBACK_TITLE, FALLBACK_TEXT);

    for (text, target, health) in FALLBACK_ROUTES {
        if !graph.contains(target) {
            continue;
        }
        let mut choice = Choice::new(text, target);
        if health != 0 {
            choice = choice.with_consequence(Consequence::default().health(health));
        }
        node = node.with_choice(choice);
    }

    if node.choices.is_empty() {
        node = node.with_choice(Choice::new("Try to reboot your neural systems", start_node));
    }
    node
}
