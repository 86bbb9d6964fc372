//! Game session: the board plus turn, history and terminal status.
//!
//! `GameSession` is an explicit state machine:
//!
//! - `InProgress` accepts moves; a move either flips the turn or ends the
//!   game in `Won(symbol)` / `Drawn`.
//! - `Won` and `Drawn` reject moves with `GameError::GameOver`.
//! - `undo_last` is the only way out of a terminal state.
//!
//! Every rejected operation leaves the session untouched.

use crate::board::Board;
use crate::error::GameError;
use crate::invariants::{InvariantSet, SessionInvariants};
use crate::rules;
use crate::types::{GameStatus, Move, Outcome, Symbol};
use tracing::{debug, info, instrument};

/// A single game owned by one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    board: Board,
    current_player: Symbol,
    history: Vec<Move>,
    status: GameStatus,
    /// Cells occupied when the session was created from a snapshot.
    preset: usize,
}

impl GameSession {
    /// Creates a session on an empty board.
    #[instrument]
    pub fn new(size: usize, starting_player: Symbol) -> Result<Self, GameError> {
        let board = Board::new(size)?;
        info!(size, starting = %starting_player, "Creating game session");
        Ok(Self {
            board,
            current_player: starting_player,
            history: Vec::new(),
            status: GameStatus::InProgress,
            preset: 0,
        })
    }

    /// Creates a session continuing from an existing board.
    ///
    /// The snapshot is evaluated immediately, so a board that is already won
    /// or full yields a terminal session. Undo never reaches into the snapshot.
    #[instrument(skip(board), fields(size = board.size()))]
    pub fn from_board(board: Board, current_player: Symbol) -> Self {
        let status = GameStatus::from(rules::evaluate(&board));
        let preset = board.occupied();
        info!(preset, status = ?status, "Creating game session from snapshot");
        Self {
            board,
            current_player,
            history: Vec::new(),
            status,
            preset,
        }
    }

    /// Produces a brand-new session, leaving `self` untouched.
    ///
    /// `cells` is an optional row-major snapshot; `player` defaults to `X`.
    #[instrument(skip(self, cells))]
    pub fn reset(
        &self,
        size: usize,
        cells: Option<Vec<Option<Symbol>>>,
        player: Option<Symbol>,
    ) -> Result<Self, GameError> {
        let player = player.unwrap_or(Symbol::X);
        match cells {
            Some(cells) => Ok(Self::from_board(Board::from_cells(size, cells)?, player)),
            None => Self::new(size, player),
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the player to move (the last mover once the game is over).
    pub fn current_player(&self) -> Symbol {
        self.current_player
    }

    /// Returns the moves made in this session, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Returns the session status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// True once the game is won or drawn.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Outcome of a finished game.
    pub fn outcome(&self) -> Option<Outcome> {
        self.status.outcome()
    }

    /// Number of cells occupied before the first move of this session.
    pub fn preset_cells(&self) -> usize {
        self.preset
    }

    /// Checks a move without applying it.
    pub fn validate_move(&self, position: usize) -> Result<(), GameError> {
        if self.is_terminal() {
            return Err(GameError::GameOver);
        }
        if !self.board.is_valid_index(position) || !self.board.is_empty(position) {
            return Err(GameError::InvalidMove { position });
        }
        Ok(())
    }

    /// Places the current player's symbol at `position`.
    ///
    /// # Errors
    ///
    /// - `GameError::GameOver` if the game already ended.
    /// - `GameError::InvalidMove` if the position is out of range or occupied.
    #[instrument(skip(self), fields(player = %self.current_player))]
    pub fn apply_move(&mut self, position: usize) -> Result<GameStatus, GameError> {
        self.validate_move(position)?;

        let player = self.current_player;
        self.board.place(position, player)?;
        self.history.push(Move::new(position, player));

        self.status = GameStatus::from(rules::evaluate(&self.board));
        if !self.status.is_terminal() {
            self.current_player = player.opponent();
        }
        debug_assert!(SessionInvariants::check_all(self).is_ok());

        debug!(position, status = ?self.status, moves = self.history.len(), "Move applied");
        Ok(self.status)
    }

    /// Takes back the most recent move.
    ///
    /// Restores the mover as current player and returns the session to
    /// `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NoHistory` when no move has been made.
    #[instrument(skip(self))]
    pub fn undo_last(&mut self) -> Result<Move, GameError> {
        let last = self.history.pop().ok_or(GameError::NoHistory)?;
        self.board.clear(last.position);
        self.current_player = last.player;
        self.status = GameStatus::InProgress;
        debug_assert!(SessionInvariants::check_all(self).is_ok());

        debug!(undone = %last, moves = self.history.len(), "Move undone");
        Ok(last)
    }
}
