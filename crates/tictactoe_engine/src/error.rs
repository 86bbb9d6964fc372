//! Error taxonomy for board and session operations.

use derive_more::Display;

/// Error that can occur when validating or applying an operation.
///
/// Every operation that returns one of these leaves the board and the
/// session exactly as they were before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum GameError {
    /// The position is out of range or the cell is already occupied.
    #[display("Invalid move: position {} is out of range or occupied", position)]
    InvalidMove {
        /// Position that was rejected.
        position: usize,
    },

    /// The game already reached a terminal state.
    #[display("Game is already over")]
    GameOver,

    /// The engine was asked to move on a full board.
    #[display("No moves available: the board is full")]
    NoMovesAvailable,

    /// Undo was requested with an empty move history.
    #[display("No moves to undo")]
    NoHistory,

    /// Board size below the minimum.
    #[display("Invalid board size {} (minimum is 3)", size)]
    InvalidSize {
        /// Requested size.
        size: usize,
    },

    /// A board snapshot did not hold size² cells.
    #[display("Invalid board: expected {} cells, got {}", expected, actual)]
    InvalidBoard {
        /// Cell count required by the size.
        expected: usize,
        /// Cell count supplied.
        actual: usize,
    },
}

impl std::error::Error for GameError {}
