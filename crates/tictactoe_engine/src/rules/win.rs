//! Win detection logic.

use crate::board::Board;
use crate::types::Symbol;

/// Checks if there is a winner on the board.
///
/// Returns `Some(symbol)` for the first line (rows, columns, diagonals)
/// whose cells all hold the same symbol, `None` otherwise.
pub fn check_winner(board: &Board) -> Option<Symbol> {
    board.lines().find_map(|line| {
        let mut cells = line.indices().map(|i| board.get(i));
        let first = cells.next().flatten()?;
        cells.all(|cell| cell == Some(first)).then_some(first)
    })
}
