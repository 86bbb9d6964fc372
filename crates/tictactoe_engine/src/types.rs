//! Core domain types shared by the board, rules and session.

use derive_more::Display;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Marker a player places on a cell.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// First mover.
    X,
    /// Second mover.
    O,
}

impl Symbol {
    /// Returns the other symbol.
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }
}

/// A player placing their symbol at a position.
///
/// Moves are recorded in session history and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct Move {
    /// Board index of the placed symbol.
    pub position: usize,
    /// The player making the move.
    pub player: Symbol,
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.player, self.position)
    }
}

/// Result of evaluating a board that has reached a terminal position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// A player completed a line.
    Winner(Symbol),
    /// The board filled with no completed line.
    Draw,
}

impl Outcome {
    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<Symbol> {
        match self {
            Outcome::Winner(symbol) => Some(*symbol),
            Outcome::Draw => None,
        }
    }

    /// Returns true if the game was a draw.
    pub fn is_draw(&self) -> bool {
        matches!(self, Outcome::Draw)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(symbol) => write!(f, "Player {} wins", symbol),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

/// Current status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// Game is ongoing.
    InProgress,
    /// Game ended in a win.
    Won(Symbol),
    /// Game ended in a draw.
    Drawn,
}

impl GameStatus {
    /// Returns true for `Won` and `Drawn`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    /// Converts a terminal status into its outcome.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            GameStatus::InProgress => None,
            GameStatus::Won(symbol) => Some(Outcome::Winner(*symbol)),
            GameStatus::Drawn => Some(Outcome::Draw),
        }
    }
}

impl From<Option<Outcome>> for GameStatus {
    fn from(outcome: Option<Outcome>) -> Self {
        match outcome {
            None => GameStatus::InProgress,
            Some(Outcome::Winner(symbol)) => GameStatus::Won(symbol),
            Some(Outcome::Draw) => GameStatus::Drawn,
        }
    }
}
