//! Enemy action selection.
//!
//! Each archetype has exactly one policy function. Policies are pure: they read
//! the enemy, the character and the turn number and return an intent. Numeric
//! rolls happen later, when the resolver executes the intent.

use crate::catalog::EnemyType;
use crate::entities::Character;

use super::{Enemy, Stance};

/// Status an EMP puts on an enemy.
pub const EMP_DISABLED: &str = "emp_disabled";
/// Status a tank raises while guarding.
pub const GUARDING: &str = "guarding";
/// Status a tactician puts on the character.
pub const VULNERABLE: &str = "vulnerable";

pub const GUARD_AMOUNT: i32 = 3;
pub const GUARD_DURATION: u32 = 2;
pub const VULNERABLE_AMOUNT: i32 = -2;
pub const VULNERABLE_DURATION: u32 = 2;

/// What an enemy is about to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnemyIntent {
    /// Attack with damage scaled by `multiplier`.
    Attack { multiplier: f64 },
    /// Raise defense for a couple of turns.
    Guard(i32),
    /// Make the character vulnerable.
    Debuff,
    /// Skip the turn.
    Disabled,
}

impl EnemyIntent {
    pub const PLAIN_ATTACK: EnemyIntent = EnemyIntent::Attack { multiplier: 1.0 };
}

/// Signature shared by all policies.
pub type Policy = fn(&Enemy, &Character, u32) -> EnemyIntent;

/// Archetype -> policy.
pub const POLICIES: [(EnemyType, Policy); 5] = [
    (EnemyType::Standard, standard),
    (EnemyType::Berserker, berserker),
    (EnemyType::Tank, tank),
    (EnemyType::Tactician, tactician),
    (EnemyType::Rogue, rogue),
];

/// Look up the policy for an archetype.
pub fn policy_for(enemy_type: EnemyType) -> Policy {
    POLICIES
        .iter()
        .find(|(kind, _)| *kind == enemy_type)
        .map(|(_, policy)| *policy)
        .unwrap_or(standard)
}

/// Pick the enemy's action for this turn.
pub fn choose_intent(enemy: &Enemy, character: &Character, turn: u32) -> EnemyIntent {
    if enemy.has_status(EMP_DISABLED) {
        return EnemyIntent::Disabled;
    }
    policy_for(enemy.enemy_type)(enemy, character, turn)
}

fn standard(_enemy: &Enemy, _character: &Character, _turn: u32) -> EnemyIntent {
    EnemyIntent::PLAIN_ATTACK
}

/// Always attacks; frenzies when badly hurt.
fn berserker(enemy: &Enemy, _character: &Character, _turn: u32) -> EnemyIntent {
    if enemy.health_fraction() < 0.3 {
        EnemyIntent::Attack { multiplier: 1.5 }
    } else {
        EnemyIntent::PLAIN_ATTACK
    }
}

/// Guards once it drops under half health, attacks otherwise.
fn tank(enemy: &Enemy, _character: &Character, _turn: u32) -> EnemyIntent {
    if enemy.health_fraction() < 0.5 && !enemy.has_status(GUARDING) {
        EnemyIntent::Guard(GUARD_AMOUNT)
    } else {
        EnemyIntent::PLAIN_ATTACK
    }
}

/// Opens with a debuff and refreshes it every third turn.
fn tactician(_enemy: &Enemy, character: &Character, turn: u32) -> EnemyIntent {
    let debuff_turn = turn == 1 || turn % 3 == 0;
    if debuff_turn && !character.has_status(VULNERABLE) {
        EnemyIntent::Debuff
    } else {
        EnemyIntent::PLAIN_ATTACK
    }
}

/// Ambushes for double damage every third turn.
fn rogue(_enemy: &Enemy, _character: &Character, turn: u32) -> EnemyIntent {
    if turn % 3 == 0 {
        EnemyIntent::Attack { multiplier: 2.0 }
    } else {
        EnemyIntent::PLAIN_ATTACK
    }
}

/// Pick the stance the enemy holds from its turn until its next one.
/// A disabled enemy keeps the stance it had.
///
/// - standard: tactical
/// - berserker: always offensive
/// - tank: defensive once under half health, tactical before
/// - tactician: counters the character's stance
/// - rogue: stealth once under 40% health, tactical before
pub fn choose_stance(enemy: &Enemy, player_stance: Stance) -> Stance {
    if enemy.has_status(EMP_DISABLED) {
        return enemy.stance;
    }
    match enemy.enemy_type {
        EnemyType::Standard => Stance::Tactical,
        EnemyType::Berserker => Stance::Offensive,
        EnemyType::Tank if enemy.health_fraction() < 0.5 => Stance::Defensive,
        EnemyType::Tank => Stance::Tactical,
        EnemyType::Tactician => match player_stance {
            Stance::Offensive => Stance::Defensive,
            Stance::Defensive => Stance::Tactical,
            Stance::Tactical | Stance::Stealth => Stance::Offensive,
        },
        EnemyType::Rogue if enemy.health_fraction() < 0.4 => Stance::Stealth,
        EnemyType::Rogue => Stance::Tactical,
    }
}
