//! Game rules for N×N tic-tac-toe.
//!
//! Pure functions over a `Board`. They never mutate and may be called any
//! number of times on the same board with the same result.

pub mod draw;
pub mod win;

pub use draw::is_draw;
pub use win::check_winner;

use crate::board::Board;
use crate::types::Outcome;

/// Evaluates a board for a terminal result.
///
/// A completed line wins (first line in `Board::lines` order); otherwise a
/// full board is a draw; otherwise the game continues and `None` is returned.
pub fn evaluate(board: &Board) -> Option<Outcome> {
    if let Some(winner) = check_winner(board) {
        return Some(Outcome::Winner(winner));
    }
    board.is_full().then_some(Outcome::Draw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    fn board_from(size: usize, marks: &str) -> Board {
        let cells = marks
            .chars()
            .map(|c| match c {
                'X' => Some(Symbol::X),
                'O' => Some(Symbol::O),
                _ => None,
            })
            .collect();
        Board::from_cells(size, cells).unwrap()
    }

    #[test]
    fn test_empty_board_continues() {
        assert_eq!(evaluate(&Board::new(3).unwrap()), None);
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        let board = board_from(3, "XOXXOOOXX");
        assert_eq!(evaluate(&board), Some(Outcome::Draw));
    }

    #[test]
    fn test_win_on_full_board_beats_draw() {
        let board = board_from(3, "XXXOOXXOO");
        assert_eq!(evaluate(&board), Some(Outcome::Winner(Symbol::X)));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let board = board_from(4, "OOOO.X.X..X.....");
        let first = evaluate(&board);
        assert_eq!(first, evaluate(&board));
        assert_eq!(first, Some(Outcome::Winner(Symbol::O)));
    }
}
