//! Opponent move selection by depth-bounded minimax.
//!
//! The engine searches a private copy of the caller's board, placing and
//! clearing symbols around each recursive call. Depth shrinks with board
//! size because the branching factor grows as size². Only 3×3 is searched
//! to the end of the game; larger boards score anything past the horizon
//! as neutral, so forced wins or losses beyond it can be missed.
//!
//! Empty cells are shuffled before the root loop and the first strictly best
//! cell wins, so equally scored moves vary from call to call. Pass a seeded
//! RNG to `select_move_with_rng` for a reproducible choice.

use crate::board::Board;
use crate::error::GameError;
use crate::rules;
use crate::types::Symbol;
use derive_new::new;
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Score of an immediate win; deeper wins score less.
pub const WIN_SCORE: i32 = 1000;

/// Deadline is checked once every this many nodes.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Maximum search depth for a board of the given size.
pub fn depth_bound(size: usize) -> usize {
    match size {
        0..=3 => size * size,
        4 => 3,
        5 => 2,
        _ => 1,
    }
}

/// Simple heuristic: the centre cell if free, else the first empty cell.
pub fn fallback_move(board: &Board) -> Result<usize, GameError> {
    let half = board.size() / 2;
    let centre = half * board.size() + half;
    if board.is_empty(centre) {
        return Ok(centre);
    }
    board
        .empty_cells()
        .first()
        .copied()
        .ok_or(GameError::NoMovesAvailable)
}

/// Best root move and its minimax score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct SearchResult {
    /// Board index of the move.
    pub position: usize,
    /// Minimax score from the acting player's point of view.
    pub score: i32,
}

/// Minimax opponent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveEngine {
    budget: Option<Duration>,
}

impl MoveEngine {
    /// Engine without a wall-clock budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that abandons search after `budget` and plays `fallback_move`.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget: Some(budget),
        }
    }

    /// Configured wall-clock budget.
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Chooses a position for `acting` using the thread RNG for tie-breaks.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NoMovesAvailable` on a full board.
    #[instrument(skip(self, board), fields(size = board.size()))]
    pub fn select_move(&self, board: &Board, acting: Symbol) -> Result<usize, GameError> {
        self.select_move_with_rng(board, acting, &mut rand::rng())
    }

    /// Chooses a position for `acting`, shuffling candidates with `rng`.
    pub fn select_move_with_rng<R: Rng + ?Sized>(
        &self,
        board: &Board,
        acting: Symbol,
        rng: &mut R,
    ) -> Result<usize, GameError> {
        let mut candidates = board.empty_cells();
        if candidates.is_empty() {
            return Err(GameError::NoMovesAvailable);
        }
        candidates.shuffle(rng);

        match self.search(board, acting, &candidates) {
            Some(result) => Ok(result.position),
            None => {
                let position = fallback_move(board)?;
                warn!(budget = ?self.budget, position, "Search budget exceeded, using fallback move");
                Ok(position)
            }
        }
    }

    /// Scores every candidate in order; `None` if the budget ran out.
    fn search(&self, board: &Board, acting: Symbol, candidates: &[usize]) -> Option<SearchResult> {
        let mut scratch = board.clone();
        let mut search = Search {
            acting,
            bound: depth_bound(board.size()),
            deadline: self.budget.map(|budget| Instant::now() + budget),
            nodes: 0,
        };

        let mut best: Option<SearchResult> = None;
        for &position in candidates {
            if scratch.place(position, acting).is_err() {
                continue;
            }
            let alpha = best.map_or(i32::MIN, |b| b.score);
            let score = search.score(&mut scratch, 0, false, alpha, i32::MAX);
            scratch.clear(position);

            let score = score.ok()?;
            if best.is_none_or(|b| score > b.score) {
                best = Some(SearchResult::new(position, score));
            }
        }

        if let Some(result) = best {
            debug!(
                position = result.position,
                score = result.score,
                nodes = search.nodes,
                depth_bound = search.bound,
                "Search complete"
            );
        }
        best
    }
}

/// Search was abandoned at the deadline.
struct BudgetExceeded;

/// State for one root-level search.
struct Search {
    acting: Symbol,
    bound: usize,
    deadline: Option<Instant>,
    nodes: u64,
}

impl Search {
    fn tick(&mut self) -> Result<(), BudgetExceeded> {
        let check = self.nodes % DEADLINE_CHECK_INTERVAL == 0;
        self.nodes += 1;
        match self.deadline {
            Some(deadline) if check && Instant::now() >= deadline => Err(BudgetExceeded),
            _ => Ok(()),
        }
    }

    /// Minimax value of `board` for the acting player, with alpha-beta cuts.
    ///
    /// Values outside `(alpha, beta)` are bounds, not exact scores. The board
    /// is restored before returning, including on abort.
    fn score(
        &mut self,
        board: &mut Board,
        depth: usize,
        maximizing: bool,
        mut alpha: i32,
        mut beta: i32,
    ) -> Result<i32, BudgetExceeded> {
        self.tick()?;

        match rules::check_winner(board) {
            Some(winner) if winner == self.acting => return Ok(WIN_SCORE - depth as i32),
            Some(_) => return Ok(depth as i32 - WIN_SCORE),
            None => {}
        }
        if board.is_full() || depth >= self.bound {
            return Ok(0);
        }

        let mover = if maximizing {
            self.acting
        } else {
            self.acting.opponent()
        };
        let mut best = if maximizing { i32::MIN } else { i32::MAX };

        for position in 0..board.cell_count() {
            // Occupied cells are rejected by place.
            if board.place(position, mover).is_err() {
                continue;
            }
            let child = self.score(board, depth + 1, !maximizing, alpha, beta);
            board.clear(position);
            let child = child?;

            if maximizing {
                best = best.max(child);
                alpha = alpha.max(best);
            } else {
                best = best.min(child);
                beta = beta.min(best);
            }
            if alpha >= beta {
                break;
            }
        }
        Ok(best)
    }
}
