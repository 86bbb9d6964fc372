//! Pure tic-tac-toe game logic for square boards of any size.
//!
//! # Architecture
//!
//! - **Board**: N×N grid, row-major indices, line enumeration
//! - **Rules**: win and draw detection over a board
//! - **MoveEngine**: depth-bounded minimax opponent
//! - **GameSession**: state machine with history and undo
//! - **Invariants**: properties every session maintains
//!
//! Nothing here performs I/O; the server crate wraps it.
//!
//! # Example
//!
//! ```
//! use tictactoe_engine::{GameSession, GameStatus, MoveEngine, Symbol};
//!
//! let mut session = GameSession::new(3, Symbol::X).unwrap();
//! session.apply_move(0).unwrap();
//! let reply = MoveEngine::new()
//!     .select_move(session.board(), session.current_player())
//!     .unwrap();
//! assert_eq!(session.apply_move(reply).unwrap(), GameStatus::InProgress);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod engine;
mod error;
mod invariants;
pub mod rules;
mod session;
mod types;

pub use board::{Board, Line, Lines};
pub use engine::{MoveEngine, SearchResult, WIN_SCORE, depth_bound, fallback_move};
pub use error::GameError;
pub use invariants::{
    AlternatingTurns, BoardShape, HistoryConsistent, Invariant, InvariantSet, InvariantViolation,
    SessionInvariants,
};
pub use rules::evaluate;
pub use session::GameSession;
pub use types::{GameStatus, Move, Outcome, Symbol};
