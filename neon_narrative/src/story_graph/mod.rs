//! Story Graph module - the authored branching narrative.
//!
//! The graph consists of:
//! - **Nodes**: narrative beats, fights, shops, skill checks and endings
//! - **Choices**: edges between nodes, optionally gated by a requirement
//! - **Consequences**: atomic bundles of state changes carried by choices,
//!   node entries and encounter outcomes

mod choice;
mod graph;
mod node;

pub use choice::*;
pub use graph::*;
pub use node::*;

use crate::error::Result;

/// Seed a graph with the bundled Neon Shadows story.
pub fn default_story() -> Result<StoryGraph> {
    StoryGraph::from_json(include_str!("../../data/story_nodes.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use neon_rules::default_catalogs;

    #[test]
    fn test_default_story_loads() {
        let graph = default_story().unwrap();
        assert!(graph.contains("intro"));
        assert!(graph.contains("guard_combat"));
        assert!(matches!(graph.get("tech_vendor").unwrap().kind, NodeKind::Shop(_)));
        assert!(matches!(graph.get("sneak_attempt").unwrap().kind, NodeKind::SkillCheck(_)));
    }

    #[test]
    fn test_default_story_references_resolve() {
        let graph = default_story().unwrap();
        let catalogs = default_catalogs().unwrap();
        assert_eq!(graph.missing_references(&catalogs), Vec::new());
    }

    #[test]
    fn test_default_story_open_ends() {
        // Everything not authored is left to dynamic content.
        let graph = default_story().unwrap();
        let targets: Vec<String> = graph.validate().into_iter().map(|d| d.target).collect();
        for target in &targets {
            assert!(
                ["service_ladder", "staff_elevator", "contact_fixer", "bar_contact"].contains(&target.as_str()),
                "unexpected dangling target {target}"
            );
        }
        assert!(targets.contains(&"service_ladder".to_string()));
    }
}
