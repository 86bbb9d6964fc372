//! Square N×N board with row-major cell storage.

use crate::error::GameError;
use crate::types::Symbol;
use serde::Serialize;
use tracing::instrument;

/// N×N tic-tac-toe board.
///
/// Cells are stored row-major: index = row * size + col. Boards are only
/// built through `new` or `from_cells`; snapshots arrive as plain cell
/// vectors and go through `from_cells`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Symbol>>,
}

impl Board {
    /// Smallest supported board.
    pub const MIN_SIZE: usize = 3;

    /// Creates an empty board.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvalidSize` when `size < 3`.
    #[instrument]
    pub fn new(size: usize) -> Result<Self, GameError> {
        if size < Self::MIN_SIZE {
            return Err(GameError::InvalidSize { size });
        }
        Ok(Self {
            size,
            cells: vec![None; size * size],
        })
    }

    /// Builds a board from a row-major snapshot.
    #[instrument(skip(cells), fields(cells = cells.len()))]
    pub fn from_cells(size: usize, cells: Vec<Option<Symbol>>) -> Result<Self, GameError> {
        if size < Self::MIN_SIZE {
            return Err(GameError::InvalidSize { size });
        }
        let expected = size * size;
        if cells.len() != expected {
            return Err(GameError::InvalidBoard {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { size, cells })
    }

    /// Side length of the board.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells (size²).
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Option<Symbol>] {
        &self.cells
    }

    /// Symbol at `index`, `None` when empty or out of range.
    pub fn get(&self, index: usize) -> Option<Symbol> {
        self.cells.get(index).copied().flatten()
    }

    /// Converts a (row, col) pair to a cell index.
    pub fn index_of(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.size && col < self.size).then_some(row * self.size + col)
    }

    /// True iff `index` addresses a cell on this board.
    pub fn is_valid_index(&self, index: usize) -> bool {
        index < self.cells.len()
    }

    /// True iff `index` is valid and holds no symbol.
    pub fn is_empty(&self, index: usize) -> bool {
        matches!(self.cells.get(index), Some(None))
    }

    /// True iff no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Indices of empty cells in ascending order.
    pub fn empty_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.is_none().then_some(i))
            .collect()
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Places `symbol` on an empty cell.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvalidMove` if the index is out of range or the
    /// cell is already occupied. The board is unchanged in that case.
    pub fn place(&mut self, index: usize, symbol: Symbol) -> Result<(), GameError> {
        match self.cells.get_mut(index) {
            Some(cell @ None) => {
                *cell = Some(symbol);
                Ok(())
            }
            _ => Err(GameError::InvalidMove { position: index }),
        }
    }

    /// Empties a cell. Out-of-range indices are ignored.
    pub fn clear(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = None;
        }
    }

    /// Every winning line: rows, then columns, then the two diagonals.
    pub fn lines(&self) -> Lines {
        Lines {
            size: self.size,
            next: 0,
        }
    }

    /// Formats the board as text; empty cells show their index.
    pub fn display(&self) -> String {
        let width = (self.cells.len() - 1).to_string().len();
        let mut result = String::new();
        for row in 0..self.size {
            let rendered: Vec<String> = (0..self.size)
                .map(|col| {
                    let index = row * self.size + col;
                    match self.cells[index] {
                        Some(symbol) => format!("{:>width$}", symbol.to_string()),
                        None => format!("{:>width$}", index),
                    }
                })
                .collect();
            result.push_str(&rendered.join(" | "));
            if row + 1 < self.size {
                result.push('\n');
                result.push_str(&"-".repeat(rendered.len() * (width + 3) - 3));
                result.push('\n');
            }
        }
        result
    }
}

/// A row, column or diagonal of `len` cells starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    start: usize,
    stride: usize,
    len: usize,
}

impl Line {
    /// Cell indices along the line.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..self.len).map(move |i| self.start + i * self.stride)
    }

    /// Number of cells on the line.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }
}

/// Iterator over the `2 * size + 2` lines of a board.
///
/// Cheap to create; call `Board::lines` again to restart.
#[derive(Debug, Clone)]
pub struct Lines {
    size: usize,
    next: usize,
}

impl Iterator for Lines {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        let n = self.size;
        let k = self.next;
        let line = if k < n {
            Line {
                start: k * n,
                stride: 1,
                len: n,
            }
        } else if k < 2 * n {
            Line {
                start: k - n,
                stride: n,
                len: n,
            }
        } else if k == 2 * n {
            Line {
                start: 0,
                stride: n + 1,
                len: n,
            }
        } else if k == 2 * n + 1 {
            Line {
                start: n - 1,
                stride: n - 1,
                len: n,
            }
        } else {
            return None;
        };
        self.next += 1;
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (2 * self.size + 2).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Lines {}
