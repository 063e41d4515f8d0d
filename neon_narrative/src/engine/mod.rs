//! Story Engine - drives one game through the story graph.
//!
//! The engine owns the graph, the rule catalogs, the configuration and the
//! game state. Every operation either succeeds as a whole or leaves the
//! state untouched: changes are made on a staged copy of [`GameState`] and
//! committed at the end.
//!
//! The engine is a state machine over node kinds:
//! - **narrative**: [`StoryEngine::choose`]
//! - **combat**: [`StoryEngine::begin_combat`], then [`StoryEngine::combat_turn`]
//! - **shop**: [`StoryEngine::buy`], [`StoryEngine::sell`], [`StoryEngine::leave_shop`]
//! - **skill check**: [`StoryEngine::resolve_skill_check`]
//! - **ending**: nothing, the game is over

mod state;
mod view;

pub use state::*;
pub use view::*;

use tracing::{debug, info, warn};

use neon_rules::{
    inventory, mechanics, progression, Catalogs, Character, CombatAction, CombatOutcome,
    CombatResolver, Dice, Encounter, GameConfig, ItemUse, RulesError, Stat,
};

use crate::error::{GenerationError, PersistenceError, Result, StoryError};
use crate::generation::{fallback_node, parse_generated_node, ContentGenerator, GenerationContext};
use crate::persistence::{SaveGame, SAVE_VERSION};
use crate::story_graph::{EnemyRef, NodeKind, ShopEntry, ShopNode, StoryGraph, StoryNode};

/// Ending recorded when a defeat is not redirected.
pub const DEFEAT_ENDING: &str = "defeat";

/// What selling an item the shop does not list fetches, per unit.
pub const UNLISTED_SELL_PRICE: u32 = 5;

/// Cap on skill vendor discounts, in percent.
pub const MAX_VENDOR_DISCOUNT: u32 = 50;

/// Runs a game over a story graph.
pub struct StoryEngine {
    graph: StoryGraph,
    catalogs: Catalogs,
    config: GameConfig,
    generator: Option<Box<dyn ContentGenerator>>,
    /// Ids of nodes inserted by the generator or the fallback, in order.
    generated: Vec<String>,
    state: Option<GameState>,
    encounter: Option<Encounter>,
}

impl StoryEngine {
    pub fn new(graph: StoryGraph, catalogs: Catalogs, config: GameConfig) -> Self {
        Self {
            graph,
            catalogs,
            config,
            generator: None,
            generated: Vec::new(),
            state: None,
            encounter: None,
        }
    }

    /// Attach a content generator for nodes missing from the graph.
    pub fn with_generator(mut self, generator: Box<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn graph(&self) -> &StoryGraph {
        &self.graph
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn character(&self) -> Option<&Character> {
        self.state.as_ref().map(|s| &s.character)
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    pub fn is_over(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.game_over)
    }

    /// Begin a new game at the configured start node.
    pub fn start(&mut self, character: Character) -> Result<NodeView> {
        let start = self.config.story.start_node.clone();
        self.graph.get(&start)?;

        let mut state = GameState::new(character, &start, self.config.story.history_limit);
        self.arrive(&mut state)?;

        info!(character = %state.character.name, class = %state.character.class, node = %start, "game started");
        self.state = Some(state);
        self.encounter = None;
        self.view()
    }

    /// The current node as the renderer should show it.
    pub fn view(&self) -> Result<NodeView> {
        let state = self.current_state()?;
        let node = self.graph.get(&state.current_node)?;
        let character = &state.character;

        let kind = match &node.kind {
            NodeKind::Narrative => NodeKindView::Narrative,
            NodeKind::Combat(combat) => NodeKindView::Combat {
                enemy: combat.enemy.name().to_string(),
            },
            NodeKind::Shop(shop) => NodeKindView::Shop {
                shop_name: shop.shop_name.clone(),
                wares: shop
                    .inventory
                    .iter()
                    .filter_map(|(item, entry)| {
                        let price = self.buy_price(character, item, entry)?;
                        Some(WareView {
                            item: item.clone(),
                            price,
                            description: entry.description.clone(),
                            affordable: character.credits >= price,
                        })
                    })
                    .collect(),
            },
            NodeKind::SkillCheck(check) => NodeKindView::SkillCheck {
                stat: check.stat,
                difficulty: check.difficulty,
            },
            NodeKind::Ending => NodeKindView::Ending,
        };

        let choices = node
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| {
                let locked_reason = choice.locked_reason(character, &state.flags);
                ChoiceView {
                    index,
                    text: choice.text.clone(),
                    enabled: locked_reason.is_none(),
                    locked_reason,
                }
            })
            .collect();

        Ok(NodeView {
            id: node.id.clone(),
            title: node.title.clone(),
            text: node.text.clone(),
            kind,
            choices,
        })
    }

    /// Take a choice at a narrative node.
    pub fn choose(&mut self, index: usize) -> Result<NodeView> {
        let state = playable(&self.state)?;
        if self.encounter.is_some() {
            return Err(StoryError::EncounterInProgress);
        }
        let node = self.graph.get(&state.current_node)?;
        if !matches!(node.kind, NodeKind::Narrative) {
            return Err(wrong_kind(node, "narrative"));
        }
        let choice = node
            .choices
            .get(index)
            .ok_or(StoryError::InvalidChoice {
                index,
                available: node.choices.len(),
            })?
            .clone();
        if let Some(reason) = choice.locked_reason(&state.character, &state.flags) {
            return Err(StoryError::ChoiceLocked { index, reason });
        }

        self.ensure_node(&choice.next_node)?;

        let mut staged = self.current_state()?.clone();
        if let Some(consequence) = &choice.consequence {
            consequence.apply(
                &mut staged.character,
                &mut staged.flags,
                &self.catalogs,
                &self.config.progression,
            )?;
        }
        staged.history.record(ChoiceRecord {
            node: staged.current_node.clone(),
            choice: choice.text.clone(),
            target: choice.next_node.clone(),
        });
        self.transition(&mut staged, &choice.next_node)?;

        self.state = Some(staged);
        self.view()
    }

    /// Instantiate the enemy of the current combat node.
    pub fn begin_combat(&mut self) -> Result<CombatView> {
        let state = playable(&self.state)?;
        if self.encounter.is_some() {
            return Err(StoryError::EncounterInProgress);
        }
        let node = self.graph.get(&state.current_node)?;
        let NodeKind::Combat(combat) = &node.kind else {
            return Err(wrong_kind(node, "combat"));
        };

        let resolver = CombatResolver::new(&self.catalogs, &self.config);
        let encounter = match &combat.enemy {
            EnemyRef::Named(name) => resolver.begin(name)?,
            EnemyRef::Inline(definition) => resolver.begin_with(definition),
        };

        info!(node = %node.id, enemy = %encounter.enemy.name, "combat started");
        let view = CombatView::new(
            &encounter,
            state.character.health,
            state.character.max_health,
        );
        self.encounter = Some(encounter);
        Ok(view)
    }

    /// The running encounter, if any.
    pub fn combat_view(&self) -> Option<CombatView> {
        let state = self.state.as_ref()?;
        let encounter = self.encounter.as_ref()?;
        Some(CombatView::new(
            encounter,
            state.character.health,
            state.character.max_health,
        ))
    }

    /// Play one combat round. When the encounter resolves, the story moves to
    /// the node the outcome leads to.
    ///
    /// The round runs on copies of the character and the encounter. Nothing
    /// is committed unless the outcome's node can be reached, so a missing
    /// target leaves the fight open and the rewards ungranted.
    pub fn combat_turn(&mut self, action: CombatAction, dice: &mut dyn Dice) -> Result<CombatTurn> {
        let mut character = self.current_state()?.character.clone();
        let mut encounter = self.encounter.clone().ok_or(StoryError::NoEncounter)?;

        let resolver = CombatResolver::new(&self.catalogs, &self.config);
        let report = resolver.take_turn(&mut character, &mut encounter, action, dice)?;
        let Some(outcome) = report.outcome else {
            self.commit_character(character)?;
            self.encounter = Some(encounter);
            return Ok(CombatTurn { report, next: None });
        };

        let next = self.finish_combat(outcome, character)?;
        Ok(CombatTurn {
            report,
            next: Some(next),
        })
    }

    fn finish_combat(&mut self, outcome: CombatOutcome, character: Character) -> Result<NodeView> {
        let current = self.current_state()?.current_node.clone();
        let node = self.graph.get(&current)?;
        let NodeKind::Combat(combat) = &node.kind else {
            return Err(wrong_kind(node, "combat"));
        };
        let combat = combat.clone();

        let target = match outcome {
            CombatOutcome::Victory => Some(combat.victory_node.clone()),
            CombatOutcome::Defeat => combat.defeat_node.clone(),
            CombatOutcome::Fled => Some(
                combat
                    .escape_node
                    .clone()
                    .or_else(|| self.current_state().ok()?.previous_node.clone())
                    .unwrap_or_else(|| self.config.story.start_node.clone()),
            ),
        };
        if let Some(target) = &target {
            self.ensure_node(target)?;
        }

        let mut staged = self.current_state()?.clone();
        staged.character = character;
        let consequence = match outcome {
            CombatOutcome::Victory => Some(&combat.rewards),
            CombatOutcome::Fled => Some(&combat.escape_consequences),
            CombatOutcome::Defeat => None,
        };
        if let Some(consequence) = consequence {
            consequence.apply_forced(
                &mut staged.character,
                &mut staged.flags,
                &self.catalogs,
                &self.config.progression,
            )?;
        }

        match target {
            Some(target) => {
                if outcome == CombatOutcome::Defeat {
                    // Left for dead, but alive.
                    staged.character.set_health(1);
                }
                self.transition(&mut staged, &target)?;
            }
            None => {
                staged.game_over = true;
                staged.ending = Some(DEFEAT_ENDING.to_string());
            }
        }

        info!(node = %current, ?outcome, next = %staged.current_node, "combat finished");
        self.state = Some(staged);
        self.encounter = None;
        self.view()
    }

    /// Roll d10 plus the effective stat against the node's difficulty.
    pub fn resolve_skill_check(&mut self, dice: &mut dyn Dice) -> Result<SkillCheckResult> {
        let state = playable(&self.state)?;
        let node = self.graph.get(&state.current_node)?;
        let NodeKind::SkillCheck(check) = &node.kind else {
            return Err(wrong_kind(node, "skill_check"));
        };
        let check = check.clone();

        let stat_value = state.character.effective_stat(check.stat);
        let roll = dice.d10();
        let success = roll + stat_value >= check.difficulty;
        let (target, consequence) = if success {
            (&check.success_node, &check.success_rewards)
        } else {
            (&check.failure_node, &check.failure_consequences)
        };

        self.ensure_node(target)?;
        let mut staged = self.current_state()?.clone();
        let report = consequence.apply_forced(
            &mut staged.character,
            &mut staged.flags,
            &self.catalogs,
            &self.config.progression,
        )?;
        self.transition(&mut staged, target)?;

        info!(stat = %check.stat, roll, stat_value, difficulty = check.difficulty, success, "skill check");
        self.state = Some(staged);
        Ok(SkillCheckResult {
            stat: check.stat,
            roll,
            stat_value,
            difficulty: check.difficulty,
            success,
            consequence: report,
            next: self.view()?,
        })
    }

    /// Buy from the current shop. Credits and inventory change together or
    /// not at all.
    pub fn buy(&mut self, item: &str, quantity: u32) -> Result<Trade> {
        if quantity == 0 {
            return Err(RulesError::InvalidQuantity.into());
        }
        let shop = self.current_shop()?;
        let character = &self.current_state()?.character;
        let unit_price = shop
            .inventory
            .get(item)
            .and_then(|entry| self.buy_price(character, item, entry))
            .ok_or_else(|| not_for_sale(item, &shop))?;
        let total = unit_price.saturating_mul(quantity);
        if character.credits < total {
            return Err(RulesError::InsufficientCredits {
                needed: total,
                available: character.credits,
            }
            .into());
        }

        let mut staged = character.clone();
        staged.inventory.add_item(item, quantity)?;
        staged.credits -= total;

        info!(shop = %shop.shop_name, item, quantity, total, "item bought");
        self.commit_character(staged)?;
        Ok(Trade {
            item: item.to_string(),
            quantity,
            credits: total,
        })
    }

    /// Sell to the current shop: half the shop's price (at least 1), or a
    /// flat price for items it does not list.
    pub fn sell(&mut self, item: &str, quantity: u32) -> Result<Trade> {
        let shop = self.current_shop()?;
        let unit_price = shop
            .inventory
            .get(item)
            .and_then(|entry| self.list_price(item, entry))
            .map(|price| (price / 2).max(1))
            .unwrap_or(UNLISTED_SELL_PRICE);
        let total = unit_price.saturating_mul(quantity);

        let mut staged = self.current_state()?.character.clone();
        staged.inventory.remove_item(item, quantity)?;
        staged.adjust_credits(total as i64);

        info!(shop = %shop.shop_name, item, quantity, total, "item sold");
        self.commit_character(staged)?;
        Ok(Trade {
            item: item.to_string(),
            quantity,
            credits: total,
        })
    }

    /// Walk out of the current shop.
    pub fn leave_shop(&mut self) -> Result<NodeView> {
        let shop = self.current_shop()?;
        self.ensure_node(&shop.exit_node)?;

        let mut staged = self.current_state()?.clone();
        self.transition(&mut staged, &shop.exit_node)?;
        self.state = Some(staged);
        self.view()
    }

    /// Use an item outside combat.
    pub fn use_item(&mut self, item: &str) -> Result<ItemUse> {
        if self.encounter.is_some() {
            return Err(StoryError::EncounterInProgress);
        }
        let state = playable_mut(&mut self.state)?;
        Ok(inventory::use_item(
            &mut state.character,
            item,
            false,
            &self.catalogs,
        )?)
    }

    /// Spend an unspent point on a stat.
    pub fn allocate_point(&mut self, stat: Stat) -> Result<()> {
        let state = playable_mut(&mut self.state)?;
        progression::allocate_point(&mut state.character, stat, &self.config.progression)?;
        Ok(())
    }

    /// Spend an unspent point on a skill. Returns the new skill level.
    pub fn learn_skill(&mut self, skill_id: &str) -> Result<u32> {
        let state = playable_mut(&mut self.state)?;
        Ok(progression::learn_skill(
            &mut state.character,
            skill_id,
            &self.catalogs,
            &self.config.progression,
        )?)
    }

    /// Capture the game for saving. Refused mid-encounter.
    pub fn snapshot(&self) -> Result<SaveGame> {
        if self.encounter.is_some() {
            return Err(StoryError::EncounterInProgress);
        }
        let state = self.current_state()?;
        let generated = self
            .generated
            .iter()
            .filter_map(|id| self.graph.get(id).ok().cloned())
            .collect();
        Ok(SaveGame::new(state.clone()).with_generated_nodes(generated))
    }

    /// Resume a saved game. The save is fully checked before anything changes.
    pub fn restore(&mut self, save: SaveGame) -> Result<()> {
        if save.version != SAVE_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: save.version,
                supported: SAVE_VERSION,
            }
            .into());
        }
        let node = &save.state.current_node;
        let known = self.graph.contains(node)
            || save.generated_nodes.iter().any(|generated| generated.id == *node);
        if !known {
            return Err(PersistenceError::UnknownNode(node.clone()).into());
        }

        let mut state = save.state;
        let (health, max_health) = (state.character.health, state.character.max_health);
        state
            .character
            .recalculate_max_health(self.config.progression.health_per_level);
        if (health, max_health) != (state.character.health, state.character.max_health) {
            warn!(
                health,
                max_health,
                restored_health = state.character.health,
                restored_max_health = state.character.max_health,
                "save health out of range, clamped"
            );
        }

        for node in save.generated_nodes {
            let id = node.id.clone();
            if self.graph.insert(node) {
                self.generated.push(id);
            }
        }
        info!(character = %state.character.name, node = %state.current_node, "game restored");
        self.state = Some(state);
        self.encounter = None;
        Ok(())
    }

    fn current_state(&self) -> Result<&GameState> {
        self.state.as_ref().ok_or(StoryError::NotStarted)
    }

    fn current_shop(&self) -> Result<ShopNode> {
        let state = playable(&self.state)?;
        let node = self.graph.get(&state.current_node)?;
        match &node.kind {
            NodeKind::Shop(shop) => Ok(shop.clone()),
            _ => Err(wrong_kind(node, "shop")),
        }
    }

    fn commit_character(&mut self, character: Character) -> Result<()> {
        let state = self.state.as_mut().ok_or(StoryError::NotStarted)?;
        state.character = character;
        Ok(())
    }

    /// Shop price, falling back to the catalog price.
    fn list_price(&self, item: &str, entry: &ShopEntry) -> Option<u32> {
        entry
            .price
            .or_else(|| self.catalogs.items.get(item).ok()?.price)
    }

    /// List price after the character's vendor discount.
    fn buy_price(&self, character: &Character, item: &str, entry: &ShopEntry) -> Option<u32> {
        let price = self.list_price(item, entry)?;
        let discount = self
            .catalogs
            .skills
            .total_bonus(&character.skills)
            .vendor_discount
            .min(MAX_VENDOR_DISCOUNT);
        let discounted = u64::from(price) * u64::from(100 - discount) / 100;
        Some(u32::try_from(discounted).unwrap_or(u32::MAX))
    }

    /// Make sure `id` is in the graph, generating it when allowed.
    fn ensure_node(&mut self, id: &str) -> Result<()> {
        if self.graph.contains(id) {
            return Ok(());
        }
        if !self.config.story.enable_dynamic_content {
            return Err(StoryError::UnknownNode(id.to_string()));
        }

        let context = GenerationContext::from_state(id, self.current_state()?);
        let generated = match &self.generator {
            Some(generator) => generator
                .generate(id, &context)
                .and_then(|value| parse_generated_node(id, value, &self.catalogs)),
            None => Err(GenerationError::Unavailable("no content generator attached".into())),
        };

        let node = match generated {
            Ok(node) => {
                info!(node = id, "generated node");
                node
            }
            Err(err) => {
                warn!(node = id, %err, "content generation failed, using fallback");
                fallback_node(id, &self.graph, &self.config.story.start_node)
            }
        };
        self.graph.insert(node);
        self.generated.push(id.to_string());
        Ok(())
    }

    /// Move a staged state to `target` and arrive there.
    fn transition(&self, state: &mut GameState, target: &str) -> Result<()> {
        let from = std::mem::replace(&mut state.current_node, target.to_string());
        debug!(from = %from, to = target, "node transition");
        state.previous_node = Some(from);
        self.arrive(state)
    }

    /// Arrival at the current node: statuses tick, the entry consequence
    /// applies, and endings or death end the game.
    fn arrive(&self, state: &mut GameState) -> Result<()> {
        let node: &StoryNode = self.graph.get(&state.current_node)?;

        let expired = mechanics::tick_statuses(&mut state.character);
        if !expired.is_empty() {
            debug!(?expired, "statuses expired");
        }

        if let Some(consequence) = &node.on_enter {
            consequence.apply_forced(
                &mut state.character,
                &mut state.flags,
                &self.catalogs,
                &self.config.progression,
            )?;
        }

        if node.is_ending() {
            state.game_over = true;
            state.ending = Some(node.id.clone());
            info!(ending = %node.id, "story ended");
        } else if !state.character.is_alive() {
            state.game_over = true;
            state.ending = Some(DEFEAT_ENDING.to_string());
            info!(node = %node.id, "character died");
        }
        Ok(())
    }
}

fn playable(state: &Option<GameState>) -> Result<&GameState> {
    let state = state.as_ref().ok_or(StoryError::NotStarted)?;
    if state.game_over {
        return Err(StoryError::GameOver);
    }
    Ok(state)
}

fn playable_mut(state: &mut Option<GameState>) -> Result<&mut GameState> {
    let state = state.as_mut().ok_or(StoryError::NotStarted)?;
    if state.game_over {
        return Err(StoryError::GameOver);
    }
    Ok(state)
}

fn wrong_kind(node: &StoryNode, expected: &'static str) -> StoryError {
    StoryError::WrongNodeKind {
        node: node.id.clone(),
        expected,
    }
}

fn not_for_sale(item: &str, shop: &ShopNode) -> StoryError {
    StoryError::NotForSale {
        item: item.to_string(),
        shop: shop.shop_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::SaveStore;
    use crate::story_graph::{default_story, Choice, CombatNode, Consequence};
    use neon_rules::{default_catalogs, CharacterClass, EnemyDefinition, ScriptedDice, Stance};
    use serde_json::json;

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.combat.bleed_chance = 0.0;
        config
    }

    fn engine() -> StoryEngine {
        StoryEngine::new(default_story().unwrap(), default_catalogs().unwrap(), quiet_config())
    }

    fn hero(class: CharacterClass) -> Character {
        Character::create("Kira", class, &quiet_config())
    }

    /// An engine placed directly at `node`, as if loaded from a save.
    fn engine_at(node: &str, character: Character) -> StoryEngine {
        let mut engine = engine();
        engine
            .restore(SaveGame::new(GameState::new(character, node, 20)))
            .unwrap();
        engine
    }

    struct Generator(std::result::Result<serde_json::Value, GenerationError>);

    impl ContentGenerator for Generator {
        fn generate(
            &self,
            _node_id: &str,
            _context: &GenerationContext,
        ) -> std::result::Result<serde_json::Value, GenerationError> {
            self.0.clone()
        }
    }

    fn dynamic_engine(generator: Generator) -> StoryEngine {
        let mut config = quiet_config();
        config.story.enable_dynamic_content = true;
        StoryEngine::new(default_story().unwrap(), default_catalogs().unwrap(), config)
            .with_generator(Box::new(generator))
    }

    #[test]
    fn test_start_at_intro() {
        let mut engine = engine();
        assert!(matches!(engine.view(), Err(StoryError::NotStarted)));

        let view = engine.start(hero(CharacterClass::Enforcer)).unwrap();
        assert_eq!(view.id, "intro");
        assert_eq!(view.kind, NodeKindView::Narrative);
        assert_eq!(view.choices.len(), 2);
        assert!(view.choices.iter().all(|c| c.enabled));
    }

    #[test]
    fn test_choice_moves_and_records_history() {
        let mut engine = engine();
        engine.start(hero(CharacterClass::Enforcer)).unwrap();

        let view = engine.choose(1).unwrap();
        assert_eq!(view.id, "intro_surroundings");

        let state = engine.state().unwrap();
        assert_eq!(state.previous_node.as_deref(), Some("intro"));
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history.iter().next().unwrap().target, "intro_surroundings");
    }

    #[test]
    fn test_gated_choice_rejected() {
        let mut engine = engine();
        engine.start(hero(CharacterClass::Enforcer)).unwrap();
        let view = engine.choose(0).unwrap();
        assert_eq!(view.id, "intro_memory");

        let locked = &view.choices[0];
        assert!(!locked.enabled);
        assert_eq!(
            locked.locked_reason.as_deref(),
            Some("requires intelligence 5 (you have 3)")
        );

        let before = engine.state().unwrap().clone();
        let err = engine.choose(0).unwrap_err();
        assert!(matches!(err, StoryError::ChoiceLocked { index: 0, .. }));
        assert_eq!(engine.state().unwrap(), &before);
    }

    #[test]
    fn test_entry_consequence_applied() {
        let mut engine = engine();
        engine.start(hero(CharacterClass::NetRunner)).unwrap();
        engine.choose(0).unwrap();
        let view = engine.choose(0).unwrap();
        assert_eq!(view.id, "intro_force_memory");

        let character = engine.character().unwrap();
        assert_eq!(character.stats.intelligence, 9);
        assert_eq!(character.health, character.max_health - 2);
    }

    #[test]
    fn test_invalid_choice_and_wrong_kind() {
        let mut engine = engine();
        engine.start(hero(CharacterClass::Fixer)).unwrap();
        assert!(matches!(
            engine.choose(9),
            Err(StoryError::InvalidChoice {
                index: 9,
                available: 2
            })
        ));

        let mut engine = engine_at("tech_vendor", hero(CharacterClass::Fixer));
        assert!(matches!(
            engine.choose(0),
            Err(StoryError::WrongNodeKind {
                expected: "narrative",
                ..
            })
        ));
        assert!(matches!(engine.begin_combat(), Err(StoryError::WrongNodeKind { .. })));
    }

    #[test]
    fn test_unknown_target_leaves_state_untouched() {
        let mut engine = engine_at("street_entrance", hero(CharacterClass::Fixer));
        let before = engine.state().unwrap().clone();

        let err = engine.choose(2).unwrap_err();
        assert!(matches!(err, StoryError::UnknownNode(id) if id == "contact_fixer"));
        assert_eq!(engine.state().unwrap(), &before);
        assert!(!engine.graph().contains("contact_fixer"));
    }

    #[test]
    fn test_generated_node_inserted() {
        let generator = Generator(Ok(json!({
            "title": "Old Friends",
            "text": "The line crackles. 'Thought you were dead.'",
            "choices": [{"text": "Hang up", "next_node": "street_entrance"}]
        })));
        let mut engine = dynamic_engine(generator);
        engine
            .restore(SaveGame::new(GameState::new(hero(CharacterClass::Fixer), "street_entrance", 20)))
            .unwrap();

        let view = engine.choose(2).unwrap();
        assert_eq!(view.id, "contact_fixer");
        assert_eq!(view.title, "Old Friends");
        assert!(engine.graph().contains("contact_fixer"));
    }

    #[test]
    fn test_generation_failure_uses_fallback() {
        let mut engine = dynamic_engine(Generator(Err(GenerationError::Timeout)));
        engine
            .restore(SaveGame::new(GameState::new(hero(CharacterClass::Enforcer), "maintenance_entrance", 20)))
            .unwrap();

        let view = engine.choose(0).unwrap();
        assert_eq!(view.id, "service_ladder");
        assert_eq!(view.title, crate::generation::FALLBACK_TITLE);
        let fallback = engine.graph().get("service_ladder").unwrap();
        assert!(fallback
            .targets()
            .iter()
            .all(|target| engine.graph().contains(target)));

        // Malformed output falls back the same way.
        let mut engine = dynamic_engine(Generator(Ok(json!({"title": "Broken"}))));
        engine
            .restore(SaveGame::new(GameState::new(hero(CharacterClass::Enforcer), "maintenance_entrance", 20)))
            .unwrap();
        assert_eq!(engine.choose(1).unwrap().title, crate::generation::FALLBACK_TITLE);
    }

    #[test]
    fn test_generated_nodes_survive_save() {
        let mut engine = dynamic_engine(Generator(Err(GenerationError::Unavailable("offline".into()))));
        engine
            .restore(SaveGame::new(GameState::new(hero(CharacterClass::Enforcer), "maintenance_entrance", 20)))
            .unwrap();
        engine.choose(0).unwrap();
        let save = engine.snapshot().unwrap();
        assert_eq!(save.generated_nodes.len(), 1);

        let mut fresh = self::engine();
        fresh.restore(save).unwrap();
        assert_eq!(fresh.view().unwrap().id, "service_ladder");
    }

    #[test]
    fn test_shop_buy_and_sell() {
        let mut engine = engine_at("tech_vendor", hero(CharacterClass::Enforcer));

        let view = engine.view().unwrap();
        let NodeKindView::Shop { shop_name, wares } = view.kind else {
            panic!("expected a shop");
        };
        assert_eq!(shop_name, "Wei's Tech Emporium");
        assert_eq!(wares.len(), 4);
        let cyberdeck = wares.iter().find(|w| w.item == "Basic Cyberdeck").unwrap();
        assert_eq!(cyberdeck.price, 150);
        assert!(!cyberdeck.affordable);

        let trade = engine.buy("Memory Shard", 1).unwrap();
        assert_eq!(trade.credits, 50);
        assert_eq!(engine.character().unwrap().credits, 50);
        assert!(engine.character().unwrap().inventory.has_item("Memory Shard", 1));

        let before = engine.state().unwrap().clone();
        assert!(matches!(
            engine.buy("Basic Cyberdeck", 1),
            Err(StoryError::Rules(RulesError::InsufficientCredits {
                needed: 150,
                available: 50
            }))
        ));
        assert!(matches!(engine.buy("Stimpack", 1), Err(StoryError::NotForSale { .. })));
        assert_eq!(engine.state().unwrap(), &before);

        assert_eq!(engine.sell("Memory Shard", 1).unwrap().credits, 25);
        assert_eq!(engine.sell("Credchip", 1).unwrap().credits, UNLISTED_SELL_PRICE);
        assert_eq!(engine.character().unwrap().credits, 80);
        assert!(engine.sell("Cyberdeck", 1).is_err());

        assert_eq!(engine.leave_shop().unwrap().id, "marketplace");
    }

    #[test]
    fn test_vendor_discount() {
        let mut character = hero(CharacterClass::Fixer);
        character.skills.insert("street_cred".into(), 1);
        let mut engine = engine_at("tech_vendor", character);

        assert_eq!(engine.buy("Memory Shard", 1).unwrap().credits, 47);
    }

    #[test]
    fn test_combat_victory_routes_to_victory_node() {
        let mut engine = engine_at("guard_combat", hero(CharacterClass::Enforcer));
        let mut dice = ScriptedDice::new();

        let combat = engine.begin_combat().unwrap();
        assert_eq!(combat.enemy, "Corporate Security Guard");
        assert!(matches!(engine.begin_combat(), Err(StoryError::EncounterInProgress)));
        assert!(matches!(engine.choose(0), Err(StoryError::EncounterInProgress)));
        assert!(matches!(engine.snapshot(), Err(StoryError::EncounterInProgress)));

        let first = engine.combat_turn(CombatAction::Attack, &mut dice).unwrap();
        assert!(first.next.is_none());
        assert_eq!(engine.combat_view().unwrap().enemy_health, 4);

        let second = engine.combat_turn(CombatAction::Attack, &mut dice).unwrap();
        assert_eq!(second.report.outcome, Some(CombatOutcome::Victory));
        assert_eq!(second.next.unwrap().id, "maintenance_entrance");
        assert!(engine.encounter().is_none());

        let character = engine.character().unwrap();
        assert_eq!(character.experience, 75);
        assert_eq!(character.credits, 130);
        assert!(character.inventory.has_item("Security Keycard", 1));
        assert_eq!(character.inventory.count("Stimpack"), 3);
        assert_eq!(character.health, character.max_health - 1);
    }

    #[test]
    fn test_stance_switch_shows_in_combat_view() {
        let mut engine = engine_at("guard_combat", hero(CharacterClass::NetRunner));
        let combat = engine.begin_combat().unwrap();
        assert_eq!(combat.player_stance, Stance::Tactical);

        let turn = engine
            .combat_turn(CombatAction::SetStance(Stance::Defensive), &mut ScriptedDice::new())
            .unwrap();
        assert!(turn.next.is_none());
        let view = engine.combat_view().unwrap();
        assert_eq!(view.player_stance, Stance::Defensive);
        assert_eq!(view.enemy_stance, Stance::Tactical);
        assert_eq!(view.turn, 2);
        // Guard hits for 3, no armor to scale
        assert_eq!(view.player_health, view.player_max_health - 3);
    }

    #[test]
    fn test_combat_escape_applies_consequences() {
        let mut engine = engine_at("guard_combat", hero(CharacterClass::Enforcer));
        let mut dice = ScriptedDice::new().with_chances([true]);
        let max_health = engine.character().unwrap().max_health;

        engine.begin_combat().unwrap();
        let turn = engine.combat_turn(CombatAction::Flee, &mut dice).unwrap();
        assert_eq!(turn.report.outcome, Some(CombatOutcome::Fled));
        assert_eq!(turn.next.unwrap().id, "street_entrance");

        let character = engine.character().unwrap();
        assert_eq!(character.health, max_health - 3);
        assert_eq!(character.credits, 80);
    }

    fn arena(defeat_node: Option<&str>) -> StoryEngine {
        let brute = EnemyDefinition::new("Cyberpsycho", 100, 60, 0);
        let mut combat = CombatNode::new(EnemyRef::Inline(brute), "after");
        combat.defeat_node = defeat_node.map(str::to_string);
        let graph = StoryGraph::new()
            .with_node(
                StoryNode::new("alley", "Alley", "Something moves.")
                    .with_choice(Choice::new("Investigate", "fight")),
            )
            .with_node(StoryNode::new("fight", "Fight", "It lunges.").with_kind(NodeKind::Combat(combat)))
            .with_node(
                StoryNode::new("after", "After", "Quiet.").with_choice(Choice::new("Back", "alley")),
            )
            .with_node(
                StoryNode::new("clinic", "Clinic", "You wake up.")
                    .with_choice(Choice::new("Leave", "alley")),
            );
        let mut config = quiet_config();
        config.story.start_node = "alley".into();
        StoryEngine::new(graph, default_catalogs().unwrap(), config)
    }

    #[test]
    fn test_defeat_ends_game() {
        let mut engine = arena(None);
        engine.start(hero(CharacterClass::NetRunner)).unwrap();
        engine.choose(0).unwrap();
        engine.begin_combat().unwrap();

        let turn = engine
            .combat_turn(CombatAction::Attack, &mut ScriptedDice::new())
            .unwrap();
        assert_eq!(turn.report.outcome, Some(CombatOutcome::Defeat));

        let state = engine.state().unwrap();
        assert!(state.game_over);
        assert_eq!(state.ending.as_deref(), Some(DEFEAT_ENDING));
        assert!(engine.is_over());
        assert!(matches!(engine.choose(0), Err(StoryError::GameOver)));
        assert!(matches!(engine.use_item("Stimpack"), Err(StoryError::GameOver)));
    }

    #[test]
    fn test_defeat_redirect() {
        let mut engine = arena(Some("clinic"));
        engine.start(hero(CharacterClass::NetRunner)).unwrap();
        engine.choose(0).unwrap();
        engine.begin_combat().unwrap();

        let turn = engine
            .combat_turn(CombatAction::Attack, &mut ScriptedDice::new())
            .unwrap();
        assert_eq!(turn.next.unwrap().id, "clinic");
        assert_eq!(engine.character().unwrap().health, 1);
        assert!(!engine.is_over());
    }

    #[test]
    fn test_combat_turn_without_encounter() {
        let mut engine = engine_at("guard_combat", hero(CharacterClass::Enforcer));
        assert!(matches!(
            engine.combat_turn(CombatAction::Attack, &mut ScriptedDice::new()),
            Err(StoryError::NoEncounter)
        ));
    }

    #[test]
    fn test_skill_check_success_and_failure() {
        let mut engine = engine_at("sneak_attempt", hero(CharacterClass::Enforcer));
        let result = engine
            .resolve_skill_check(&mut ScriptedDice::new().with_ranges([1]))
            .unwrap();
        assert!(result.success);
        assert_eq!((result.roll, result.stat_value, result.difficulty), (1, 6, 7));
        assert_eq!(result.next.id, "maintenance_entrance");
        assert_eq!(engine.character().unwrap().experience, 50);

        let mut engine = engine_at("sneak_attempt", hero(CharacterClass::NetRunner));
        let result = engine
            .resolve_skill_check(&mut ScriptedDice::new().with_ranges([1]))
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.next.id, "guard_combat");
        assert_eq!(engine.character().unwrap().experience, 0);
    }

    #[test]
    fn test_use_item_outside_combat() {
        let mut character = hero(CharacterClass::Enforcer);
        character.health = 3;
        let mut engine = engine_at("marketplace", character);

        let used = engine.use_item("Stimpack").unwrap();
        assert_eq!(used.health_change, 5);
        assert_eq!(engine.character().unwrap().health, 8);
        assert_eq!(engine.character().unwrap().inventory.count("Stimpack"), 1);

        assert!(matches!(
            engine.use_item("Heavy Pistol"),
            Err(StoryError::Rules(RulesError::ItemNotUsable(_)))
        ));
    }

    #[test]
    fn test_points_and_skills() {
        let mut character = hero(CharacterClass::Enforcer);
        character.unspent_points = 2;
        let mut engine = engine_at("marketplace", character);

        engine.allocate_point(Stat::Reflex).unwrap();
        assert_eq!(engine.learn_skill("street_cred").unwrap(), 1);
        assert!(matches!(
            engine.allocate_point(Stat::Reflex),
            Err(StoryError::Rules(RulesError::NoUnspentPoints))
        ));
        assert_eq!(engine.character().unwrap().stats.reflex, 7);
    }

    #[test]
    fn test_ending_node_ends_game() {
        let graph = StoryGraph::new()
            .with_node(
                StoryNode::new("intro", "Start", "Go.")
                    .with_choice(Choice::new("Finish", "credits_roll").with_consequence(
                        Consequence::default().set_flag("finished"),
                    )),
            )
            .with_node(StoryNode::new("credits_roll", "The End", "Fade out.").with_kind(NodeKind::Ending));
        let mut engine = StoryEngine::new(graph, default_catalogs().unwrap(), quiet_config());
        engine.start(hero(CharacterClass::Tech)).unwrap();

        let view = engine.choose(0).unwrap();
        assert_eq!(view.kind, NodeKindView::Ending);
        let state = engine.state().unwrap();
        assert!(state.game_over);
        assert_eq!(state.ending.as_deref(), Some("credits_roll"));
        assert!(state.has_flag("finished"));
    }

    #[test]
    fn test_save_and_restore_round_trip() {
        let mut engine = engine();
        engine.start(hero(CharacterClass::Fixer)).unwrap();
        engine.choose(1).unwrap();
        engine.choose(1).unwrap();
        engine.use_item("Stimpack").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path()).unwrap();
        store.save("quick", &engine.snapshot().unwrap()).unwrap();

        let mut resumed = self::engine();
        resumed.restore(store.load("quick").unwrap()).unwrap();

        assert_eq!(resumed.state(), engine.state());
        assert_eq!(resumed.view().unwrap().id, "street_entrance");
        assert_eq!(resumed.character().unwrap().inventory.count("Stimpack"), 1);
    }

    #[test]
    fn test_restore_rejects_bad_saves() {
        let mut engine = engine();
        engine.start(hero(CharacterClass::Fixer)).unwrap();
        let before = engine.state().unwrap().clone();

        let mut lost = SaveGame::new(GameState::new(hero(CharacterClass::Tech), "nowhere", 20));
        assert!(matches!(
            engine.restore(lost.clone()),
            Err(StoryError::Persistence(PersistenceError::UnknownNode(_)))
        ));

        lost.state.current_node = "intro".into();
        lost.version = 7;
        assert!(matches!(
            engine.restore(lost),
            Err(StoryError::Persistence(PersistenceError::UnsupportedVersion { found: 7, .. }))
        ));
        assert_eq!(engine.state().unwrap(), &before);
    }

    #[test]
    fn test_combat_outcome_waits_for_reachable_node() {
        let rat = EnemyDefinition::new("Rat", 1, 1, 0).with_rewards(40, 30);
        let graph = StoryGraph::new()
            .with_node(
                StoryNode::new("intro", "Cellar", "Something squeaks.")
                    .with_choice(Choice::new("Look closer", "fight")),
            )
            .with_node(StoryNode::new("fight", "Rat", "It bites.").with_kind(NodeKind::Combat(
                CombatNode::new(EnemyRef::Inline(rat), "missing_node"),
            )));
        let mut engine = StoryEngine::new(graph, default_catalogs().unwrap(), quiet_config());
        engine.start(hero(CharacterClass::Enforcer)).unwrap();
        engine.choose(0).unwrap();
        engine.begin_combat().unwrap();

        for _ in 0..3 {
            let err = engine
                .combat_turn(CombatAction::Attack, &mut ScriptedDice::new())
                .unwrap_err();
            assert!(matches!(err, StoryError::UnknownNode(id) if id == "missing_node"));

            let character = engine.character().unwrap();
            assert_eq!(character.experience, 0);
            assert_eq!(character.credits, 100);
            assert_eq!(engine.state().unwrap().current_node, "fight");
            assert_eq!(engine.combat_view().unwrap().enemy_health, 1);
        }
        assert!(matches!(engine.begin_combat(), Err(StoryError::EncounterInProgress)));
    }

    #[test]
    fn test_large_prices_do_not_overflow() {
        let mut wares = std::collections::BTreeMap::new();
        wares.insert(
            "Memory Shard".to_string(),
            ShopEntry {
                price: Some(4_000_000_000),
                description: String::new(),
            },
        );
        let vault = ShopNode {
            shop_name: "Arasaka Vault".into(),
            inventory: wares,
            exit_node: "intro".into(),
        };
        let graph = StoryGraph::new()
            .with_node(
                StoryNode::new("intro", "Lobby", "Marble and glass.")
                    .with_choice(Choice::new("Enter the vault", "vault")),
            )
            .with_node(StoryNode::new("vault", "Vault", "Everything has a price.").with_kind(NodeKind::Shop(vault)));
        let mut engine = StoryEngine::new(graph, default_catalogs().unwrap(), quiet_config());
        let mut character = hero(CharacterClass::Fixer);
        character.skills.insert("street_cred".into(), 1);
        engine.start(character).unwrap();

        let view = engine.choose(0).unwrap();
        let NodeKindView::Shop { wares, .. } = view.kind else {
            panic!("expected a shop");
        };
        assert_eq!(wares[0].price, 3_800_000_000);
        assert!(!wares[0].affordable);
        assert!(matches!(
            engine.buy("Memory Shard", 2),
            Err(StoryError::Rules(RulesError::InsufficientCredits {
                needed: u32::MAX,
                available: 100
            }))
        ));
    }

    #[test]
    fn test_restore_clamps_health() {
        let mut character = hero(CharacterClass::NetRunner);
        character.max_health = 999;
        character.health = 999;
        let mut engine = engine();
        engine
            .restore(SaveGame::new(GameState::new(character, "marketplace", 20)))
            .unwrap();

        let character = engine.character().unwrap();
        assert_eq!(character.max_health, 16);
        assert_eq!(character.health, 16);
    }
}
