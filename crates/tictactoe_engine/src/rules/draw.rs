//! Draw detection logic.

use super::win::check_winner;
use crate::board::Board;

/// A full board with no completed line.
pub fn is_draw(board: &Board) -> bool {
    board.is_full() && check_winner(board).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    #[test]
    fn test_partial_board_not_draw() {
        let mut board = Board::new(3).unwrap();
        board.place(4, Symbol::X).unwrap();
        assert!(!is_draw(&board));
    }

    #[test]
    fn test_draw_detection() {
        let mut board = Board::new(3).unwrap();
        // X O X / X O O / O X X
        let marks = [
            Symbol::X,
            Symbol::O,
            Symbol::X,
            Symbol::X,
            Symbol::O,
            Symbol::O,
            Symbol::O,
            Symbol::X,
            Symbol::X,
        ];
        for (i, symbol) in marks.into_iter().enumerate() {
            board.place(i, symbol).unwrap();
        }
        assert!(is_draw(&board));
    }

    #[test]
    fn test_not_draw_if_winner() {
        let mut board = Board::new(3).unwrap();
        for i in 0..9 {
            board.place(i, Symbol::X).unwrap();
        }
        assert!(!is_draw(&board));
    }
}
