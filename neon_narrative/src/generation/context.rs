//! Context handed to the content generator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use neon_rules::{Character, CharacterClass, Stat};

use crate::engine::{ChoiceRecord, GameState};

/// How many recent choices go into a generation request.
pub const RECENT_CHOICES: usize = 10;

/// Character facts relevant to writing a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSummary {
    pub name: String,
    pub class: CharacterClass,
    pub level: u32,
    pub health: i32,
    pub max_health: i32,
    pub credits: u32,
    /// Effective values, statuses included.
    pub stats: BTreeMap<Stat, i32>,
    pub items: BTreeMap<String, u32>,
    pub statuses: Vec<String>,
    pub skills: BTreeMap<String, u32>,
    pub reputation: BTreeMap<String, i32>,
}

impl CharacterSummary {
    pub fn from_character(character: &Character) -> Self {
        Self {
            name: character.name.clone(),
            class: character.class,
            level: character.level,
            health: character.health,
            max_health: character.max_health,
            credits: character.credits,
            stats: Stat::ALL
                .iter()
                .map(|stat| (*stat, character.effective_stat(*stat)))
                .collect(),
            items: character
                .inventory
                .iter()
                .map(|(item, quantity)| (item.to_string(), quantity))
                .collect(),
            statuses: character
                .status_effects
                .iter()
                .map(|(name, _)| name.clone())
                .collect(),
            skills: character.skills.clone(),
            reputation: character.reputation.clone(),
        }
    }
}

/// Everything a generator gets to know about the game when asked for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    /// The node being requested.
    pub node_id: String,
    /// The node the player is leaving.
    pub from_node: String,
    pub character: CharacterSummary,
    pub flags: Vec<String>,
    /// Oldest first.
    pub recent_choices: Vec<ChoiceRecord>,
}

impl GenerationContext {
    pub fn from_state(node_id: impl Into<String>, state: &GameState) -> Self {
        Self {
            node_id: node_id.into(),
            from_node: state.current_node.clone(),
            character: CharacterSummary::from_character(&state.character),
            flags: state.flags.iter().cloned().collect(),
            recent_choices: state.history.recent(RECENT_CHOICES).cloned().collect(),
        }
    }

    /// Render the context as a plain-text brief.
    pub fn to_prompt_string(&self) -> String {
        let mut prompt = String::new();
        let character = &self.character;

        prompt.push_str("## Requested Node\n");
        prompt.push_str(&format!("{} (reached from {})\n\n", self.node_id, self.from_node));

        prompt.push_str("## Character\n");
        prompt.push_str(&format!(
            "{}, level {} {}: HP {}/{}, {} credits\n",
            character.name,
            character.level,
            character.class,
            character.health,
            character.max_health,
            character.credits
        ));
        let stats: Vec<String> = character
            .stats
            .iter()
            .map(|(stat, value)| format!("{stat} {value}"))
            .collect();
        prompt.push_str(&format!("Stats: {}\n", stats.join(", ")));
        let items: Vec<String> = character
            .items
            .iter()
            .map(|(item, quantity)| format!("{item} x{quantity}"))
            .collect();
        prompt.push_str(&format!(
            "Inventory: {}\n",
            if items.is_empty() {
                "Empty".to_string()
            } else {
                items.join(", ")
            }
        ));
        if !character.reputation.is_empty() {
            let standings: Vec<String> = character
                .reputation
                .iter()
                .map(|(faction, standing)| format!("{faction} {standing:+}"))
                .collect();
            prompt.push_str(&format!("Reputation: {}\n", standings.join(", ")));
        }
        prompt.push_str(&format!(
            "Conditions: {}\n\n",
            if character.statuses.is_empty() {
                "None".to_string()
            } else {
                character.statuses.join(", ")
            }
        ));

        if !self.flags.is_empty() {
            prompt.push_str("## Story Flags\n");
            for flag in &self.flags {
                prompt.push_str(&format!("- {}\n", flag));
            }
            prompt.push('\n');
        }

        if !self.recent_choices.is_empty() {
            prompt.push_str("## Recent Choices\n");
            for record in &self.recent_choices {
                prompt.push_str(&format!("- At {}: {}\n", record.node, record.choice));
            }
            prompt.push('\n');
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neon_rules::{StatusEffect, StatusMagnitude};

    fn state() -> GameState {
        let mut character = Character::new("Kira", CharacterClass::NetRunner);
        character.inventory.add_item("Cyberdeck", 1).unwrap();
        character.status_effects.apply(
            "intelligence_boost",
            StatusEffect::timed(
                StatusMagnitude::Stat {
                    stat: Stat::Intelligence,
                    delta: 2,
                },
                3,
            ),
        );
        character.adjust_reputation("arasaka", -45);
        let mut state = GameState::new(character, "maintenance_entrance", 20);
        state.flags.insert("job_accepted".into());
        for n in 0..12 {
            state.history.record(ChoiceRecord {
                node: format!("node_{n}"),
                choice: format!("choice {n}"),
                target: format!("node_{}", n + 1),
            });
        }
        state
    }

    #[test]
    fn test_context_from_state() {
        let context = GenerationContext::from_state("service_ladder", &state());

        assert_eq!(context.node_id, "service_ladder");
        assert_eq!(context.from_node, "maintenance_entrance");
        assert_eq!(context.character.stats[&Stat::Intelligence], 10);
        assert_eq!(context.character.items["Cyberdeck"], 1);
        assert_eq!(context.flags, vec!["job_accepted".to_string()]);
        assert_eq!(context.recent_choices.len(), RECENT_CHOICES);
        assert_eq!(context.recent_choices[0].node, "node_2");
    }

    #[test]
    fn test_prompt_string() {
        let prompt = GenerationContext::from_state("service_ladder", &state()).to_prompt_string();

        assert!(prompt.contains("service_ladder (reached from maintenance_entrance)"));
        assert!(prompt.contains("Kira, level 1 NetRunner: HP 16/16"));
        assert!(prompt.contains("intelligence 10"));
        assert!(prompt.contains("Cyberdeck x1"));
        assert!(prompt.contains("intelligence_boost"));
        assert!(prompt.contains("Reputation: arasaka -45"));
        assert!(prompt.contains("- job_accepted"));
        assert!(prompt.contains("- At node_11: choice 11"));
    }
}
