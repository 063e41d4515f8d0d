//! Random draws for combat, loot and skill checks.
//!
//! Every random decision goes through [`Dice`], so a run can be reproduced from
//! a seed ([`SeededDice`]) or from an explicit list of draws ([`ScriptedDice`]).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Source of random draws.
pub trait Dice {
    /// Roll an integer in `low..=high`.
    fn roll_range(&mut self, low: i32, high: i32) -> i32;

    /// Return true with the given probability (clamped to `0.0..=1.0`).
    fn roll_chance(&mut self, probability: f64) -> bool;

    /// Roll a ten-sided die.
    fn d10(&mut self) -> i32 {
        self.roll_range(1, 10)
    }
}

/// Dice backed by a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: StdRng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Dice for SeededDice {
    fn roll_range(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn roll_chance(&mut self, probability: f64) -> bool {
        let p = probability.clamp(0.0, 1.0);
        self.rng.gen_bool(p)
    }
}

/// Dice that replay queued draws.
///
/// Range rolls pop from the range queue and are clamped into the requested
/// bounds; an empty queue yields the in-range value closest to zero. Chance
/// rolls pop from the chance queue; an empty queue yields `false`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    ranges: VecDeque<i32>,
    chances: VecDeque<bool>,
}

impl ScriptedDice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue range results.
    pub fn with_ranges(mut self, values: impl IntoIterator<Item = i32>) -> Self {
        self.ranges.extend(values);
        self
    }

    /// Queue chance results.
    pub fn with_chances(mut self, values: impl IntoIterator<Item = bool>) -> Self {
        self.chances.extend(values);
        self
    }

    /// Number of draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.ranges.len() + self.chances.len()
    }
}

impl Dice for ScriptedDice {
    fn roll_range(&mut self, low: i32, high: i32) -> i32 {
        let (low, high) = if high < low { (high, low) } else { (low, high) };
        self.ranges.pop_front().unwrap_or(0).clamp(low, high)
    }

    fn roll_chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.chances.pop_front().unwrap_or(false)
    }
}
