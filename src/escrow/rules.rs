//! Match resolution rules.
//!
//! The beats cycle is fixed: ROCK beats SCISSORS, SCISSORS beats PAPER,
//! PAPER beats ROCK. Identical moves draw.

use serde::{Deserialize, Serialize};

/// A player's move for one match. Transient input to resolution, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// True if `self` beats `other` under the fixed cycle.
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Move::Rock => "ROCK",
            Move::Paper => "PAPER",
            Move::Scissors => "SCISSORS",
        };
        f.write_str(name)
    }
}

/// Outcome of resolving two moves against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Draw,
    FirstWins,
    SecondWins,
}

/// Resolve one match. Exactly one of the three outcomes holds for any pair
/// of moves.
pub fn resolve(first: Move, second: Move) -> Outcome {
    if first == second {
        Outcome::Draw
    } else if first.beats(second) {
        Outcome::FirstWins
    } else {
        Outcome::SecondWins
    }
}
