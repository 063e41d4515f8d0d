//! Turn-based combat between a character and one enemy.
//!
//! An [`Encounter`] moves `PlayerTurn -> EnemyTurn -> PlayerTurn` until it is
//! resolved as a victory, a defeat or a successful escape. Statuses on both
//! sides tick at the end of every full round, and the round counter is capped
//! so every encounter terminates.
//!
//! Both sides fight in a [`Stance`]. The character changes stance as an
//! action; the enemy picks one at the start of each of its turns.

mod ai;
mod enemy;
mod rewards;
mod stance;

pub use ai::*;
pub use enemy::*;
pub use rewards::*;
pub use stance::*;

use tracing::{debug, info};

use crate::catalog::{Catalogs, EnemyDefinition};
use crate::config::GameConfig;
use crate::dice::Dice;
use crate::entities::{Character, Stat, StatusEffect, StatusMagnitude};
use crate::error::{Result, RulesError};
use crate::inventory::{self, ItemUse};
use crate::mechanics::{self, Affinity, DamageType, STEALTH_BOOST};

/// Bleed opened by a lucky hit.
pub const BLEEDING: &str = "bleeding";
pub const BLEED_AMOUNT: i32 = 2;
pub const BLEED_DURATION: u32 = 3;

/// How an encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Fled,
}

/// Where an encounter stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatPhase {
    PlayerTurn,
    EnemyTurn,
    Resolved(CombatOutcome),
}

/// One player action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatAction {
    Attack,
    UseItem(String),
    Flee,
    /// Switch stance. Takes the turn.
    SetStance(Stance),
}

/// Which side of the fight an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combatant {
    Player,
    Enemy,
}

/// Structured record of what happened during a turn, for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    PlayerAttack {
        raw: i32,
        damage: i32,
        affinity: Affinity,
    },
    BleedInflicted,
    ItemUsed(ItemUse),
    /// The item could not be used; the turn is still spent.
    ItemFailed {
        item: String,
        error: RulesError,
    },
    FleeFailed {
        chance: f64,
    },
    Fled {
        chance: f64,
    },
    EnemyAttack {
        raw: i32,
        damage: i32,
        multiplier: f64,
    },
    EnemyGuard {
        amount: i32,
    },
    EnemyDebuff,
    EnemyDisabled,
    StanceChanged {
        target: Combatant,
        stance: Stance,
    },
    BleedDamage {
        target: Combatant,
        amount: i32,
    },
    StatusExpired {
        target: Combatant,
        name: String,
    },
    /// Round cap reached; both sides disengage.
    Stalemate,
}

/// Result of one call to [`CombatResolver::take_turn`].
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub turn: u32,
    pub events: Vec<CombatEvent>,
    pub outcome: Option<CombatOutcome>,
    /// Present only on victory.
    pub rewards: Option<VictoryRewards>,
}

/// Summary of a full encounter driven by [`CombatResolver::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct CombatSummary {
    pub outcome: CombatOutcome,
    pub turns: u32,
    pub rewards: Option<VictoryRewards>,
}

/// A running fight.
#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    pub enemy: Enemy,
    /// Current round, starting at 1.
    pub turn: u32,
    pub phase: CombatPhase,
    pub player_stance: Stance,
}

impl Encounter {
    pub fn new(enemy: Enemy) -> Self {
        Self {
            enemy,
            turn: 1,
            phase: CombatPhase::PlayerTurn,
            player_stance: Stance::default(),
        }
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        match self.phase {
            CombatPhase::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome().is_some()
    }
}

/// Resolves encounters against a fixed set of catalogs and configuration.
#[derive(Debug, Clone, Copy)]
pub struct CombatResolver<'a> {
    catalogs: &'a Catalogs,
    config: &'a GameConfig,
}

impl<'a> CombatResolver<'a> {
    pub fn new(catalogs: &'a Catalogs, config: &'a GameConfig) -> Self {
        Self { catalogs, config }
    }

    /// Start an encounter against a cataloged enemy.
    pub fn begin(&self, enemy_name: &str) -> Result<Encounter> {
        let definition = self.catalogs.enemies.get(enemy_name)?;
        Ok(self.begin_with(definition))
    }

    /// Start an encounter against an explicit definition.
    pub fn begin_with(&self, definition: &EnemyDefinition) -> Encounter {
        let enemy = Enemy::from_definition(definition, &self.config.difficulty.modifiers());
        debug!(enemy = %enemy.name, health = enemy.health, "encounter started");
        Encounter::new(enemy)
    }

    /// Raw attack damage before the enemy's defense, never negative.
    pub fn attack_roll(&self, character: &Character, dice: &mut dyn Dice) -> (i32, DamageType) {
        let (weapon, damage_type) = self
            .catalogs
            .items
            .best_weapon(&character.inventory)
            .unwrap_or((0, DamageType::Physical));
        let skills = self.catalogs.skills.total_bonus(&character.skills).damage;
        let variance = self.config.combat.damage_variance.abs();

        let base = character.effective_stat(Stat::Strength)
            + weapon
            + skills
            + character.status_effects.damage_delta()
            + dice.roll_range(-variance, variance);
        let scaled = base as f64 * self.config.difficulty.modifiers().player_damage_multiplier;
        ((scaled.round() as i32).max(0), damage_type)
    }

    /// Probability that a flee attempt succeeds.
    pub fn flee_chance(&self, character: &Character, enemy: &Enemy) -> f64 {
        let combat = &self.config.combat;
        let reflex = character.effective_stat(Stat::Reflex) as f64;

        let mut chance = (combat.base_flee_chance + combat.flee_per_reflex * reflex)
            .min(combat.max_flee_chance);
        chance += self.catalogs.skills.total_bonus(&character.skills).flee;
        if character.has_status(STEALTH_BOOST) {
            chance += combat.stealth_flee_bonus;
        }
        if enemy.enemy_type.is_evasive() {
            chance -= combat.evasive_flee_penalty;
        }
        chance.clamp(0.05, 0.95)
    }

    /// Resolve one full round: the player's action, the enemy's response and
    /// the end-of-round status tick.
    pub fn take_turn(
        &self,
        character: &mut Character,
        encounter: &mut Encounter,
        action: CombatAction,
        dice: &mut dyn Dice,
    ) -> Result<TurnReport> {
        if encounter.is_resolved() {
            return Err(RulesError::EncounterResolved);
        }

        let turn = encounter.turn;
        let mut events = Vec::new();

        let mut outcome = self.player_action(character, encounter, action, dice, &mut events);

        if outcome.is_none() {
            encounter.phase = CombatPhase::EnemyTurn;
            outcome = self.enemy_action(character, encounter, dice, &mut events);
        }

        if outcome.is_none() {
            outcome = self.end_of_round(character, encounter, &mut events);
        }

        if outcome.is_none() {
            encounter.turn += 1;
            if encounter.turn > self.config.combat.max_turns {
                events.push(CombatEvent::Stalemate);
                outcome = Some(CombatOutcome::Fled);
            }
        }

        let rewards = match outcome {
            Some(CombatOutcome::Victory) => Some(grant_victory(
                character,
                &encounter.enemy,
                dice,
                &self.config.progression,
            )),
            _ => None,
        };

        encounter.phase = match outcome {
            Some(outcome) => {
                info!(enemy = %encounter.enemy.name, ?outcome, turn, "encounter resolved");
                CombatPhase::Resolved(outcome)
            }
            None => CombatPhase::PlayerTurn,
        };

        Ok(TurnReport {
            turn,
            events,
            outcome,
            rewards,
        })
    }

    /// Drive an encounter to completion, asking `choose` for each action.
    pub fn run<F>(
        &self,
        character: &mut Character,
        encounter: &mut Encounter,
        dice: &mut dyn Dice,
        mut choose: F,
    ) -> Result<CombatSummary>
    where
        F: FnMut(&Character, &Encounter) -> CombatAction,
    {
        loop {
            let action = choose(character, encounter);
            let report = self.take_turn(character, encounter, action, dice)?;
            if let Some(outcome) = report.outcome {
                return Ok(CombatSummary {
                    outcome,
                    turns: report.turn,
                    rewards: report.rewards,
                });
            }
        }
    }

    fn player_action(
        &self,
        character: &mut Character,
        encounter: &mut Encounter,
        action: CombatAction,
        dice: &mut dyn Dice,
        events: &mut Vec<CombatEvent>,
    ) -> Option<CombatOutcome> {
        let stance = encounter.player_stance;
        let enemy = &mut encounter.enemy;
        match action {
            CombatAction::Attack => {
                let (rolled, damage_type) = self.attack_roll(character, dice);
                let raw = stance.scale_damage(rolled);
                let hit = enemy.take_damage(raw, damage_type, &self.config.combat);
                debug!(raw, damage = hit.damage, enemy_health = enemy.health, "player attack");
                events.push(CombatEvent::PlayerAttack {
                    raw,
                    damage: hit.damage,
                    affinity: hit.affinity,
                });

                if !enemy.is_alive() {
                    return Some(CombatOutcome::Victory);
                }
                if hit.damage > 0 && dice.roll_chance(self.config.combat.bleed_chance) {
                    enemy.status_effects.apply(
                        BLEEDING,
                        StatusEffect::timed(StatusMagnitude::Bleed { amount: BLEED_AMOUNT }, BLEED_DURATION),
                    );
                    events.push(CombatEvent::BleedInflicted);
                }
                None
            }
            CombatAction::UseItem(item) => {
                match inventory::use_item(character, &item, true, self.catalogs) {
                    Ok(report) => {
                        if let Some(duration) = report.emp_disable {
                            enemy
                                .status_effects
                                .apply(EMP_DISABLED, StatusEffect::flag(duration, true));
                        }
                        events.push(CombatEvent::ItemUsed(report));
                    }
                    Err(error) => {
                        debug!(item = %item, %error, "combat item failed");
                        events.push(CombatEvent::ItemFailed { item, error });
                    }
                }
                None
            }
            CombatAction::Flee => {
                let chance = self.flee_chance(character, enemy);
                if dice.roll_chance(chance) {
                    events.push(CombatEvent::Fled { chance });
                    Some(CombatOutcome::Fled)
                } else {
                    events.push(CombatEvent::FleeFailed { chance });
                    None
                }
            }
            CombatAction::SetStance(stance) => {
                debug!(%stance, "player stance");
                encounter.player_stance = stance;
                events.push(CombatEvent::StanceChanged {
                    target: Combatant::Player,
                    stance,
                });
                None
            }
        }
    }

    fn enemy_action(
        &self,
        character: &mut Character,
        encounter: &mut Encounter,
        dice: &mut dyn Dice,
        events: &mut Vec<CombatEvent>,
    ) -> Option<CombatOutcome> {
        let player_stance = encounter.player_stance;
        let enemy = &mut encounter.enemy;

        let stance = choose_stance(enemy, player_stance);
        if stance != enemy.stance {
            enemy.stance = stance;
            events.push(CombatEvent::StanceChanged {
                target: Combatant::Enemy,
                stance,
            });
        }

        match choose_intent(enemy, character, encounter.turn) {
            EnemyIntent::Attack { multiplier } => {
                let variance = self.config.combat.damage_variance.abs();
                let base = enemy.effective_damage() + dice.roll_range(-variance, variance);
                let scaled = base as f64 * multiplier * enemy.stance.damage_modifier();
                let raw = (scaled.round() as i32).max(0);
                let damage = mechanics::apply_damage_in_stance(
                    character,
                    raw,
                    DamageType::Physical,
                    player_stance,
                    self.catalogs,
                );
                debug!(raw, damage, health = character.health, "enemy attack");
                events.push(CombatEvent::EnemyAttack {
                    raw,
                    damage,
                    multiplier,
                });
                if !character.is_alive() {
                    return Some(CombatOutcome::Defeat);
                }
            }
            EnemyIntent::Guard(amount) => {
                enemy.status_effects.apply(
                    GUARDING,
                    StatusEffect::timed(StatusMagnitude::Defense { amount }, GUARD_DURATION),
                );
                events.push(CombatEvent::EnemyGuard { amount });
            }
            EnemyIntent::Debuff => {
                mechanics::apply_status(
                    character,
                    VULNERABLE,
                    StatusMagnitude::Defense {
                        amount: VULNERABLE_AMOUNT,
                    },
                    VULNERABLE_DURATION,
                );
                events.push(CombatEvent::EnemyDebuff);
            }
            EnemyIntent::Disabled => events.push(CombatEvent::EnemyDisabled),
        }
        None
    }

    /// Tick both sides. An enemy that bleeds out loses before the character does.
    fn end_of_round(
        &self,
        character: &mut Character,
        encounter: &mut Encounter,
        events: &mut Vec<CombatEvent>,
    ) -> Option<CombatOutcome> {
        let enemy_tick = encounter.enemy.tick_statuses();
        if enemy_tick.bleed_damage > 0 {
            events.push(CombatEvent::BleedDamage {
                target: Combatant::Enemy,
                amount: enemy_tick.bleed_damage,
            });
        }
        events.extend(enemy_tick.expired.into_iter().map(|name| CombatEvent::StatusExpired {
            target: Combatant::Enemy,
            name,
        }));

        let health_before = character.health;
        let expired = mechanics::tick_statuses(character);
        let bled = health_before - character.health;
        if bled > 0 {
            events.push(CombatEvent::BleedDamage {
                target: Combatant::Player,
                amount: bled,
            });
        }
        events.extend(expired.into_iter().map(|name| CombatEvent::StatusExpired {
            target: Combatant::Player,
            name,
        }));

        if !encounter.enemy.is_alive() {
            Some(CombatOutcome::Victory)
        } else if !character.is_alive() {
            Some(CombatOutcome::Defeat)
        } else {
            None
        }
    }
}
