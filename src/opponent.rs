//! Automated opponent: oracle suggestion, validated, else minimax search.

use crate::oracle::{MoveOracle, OracleInfo};
use derive_more::Display;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tictactoe_engine::{Board, GameError, MoveEngine, Symbol};
use tracing::{debug, error, info, instrument, warn};

/// Where an opponent move came from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveSource {
    /// Accepted oracle suggestion.
    #[display("oracle")]
    Oracle,
    /// Minimax engine (or its fallback heuristic).
    #[display("search")]
    Search,
}

/// A selected opponent move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChosenMove {
    /// Board index.
    pub position: usize,
    /// Producer of the move.
    pub source: MoveSource,
}

impl ChosenMove {
    /// True when the oracle's suggestion was used.
    pub fn ai_used(&self) -> bool {
        self.source == MoveSource::Oracle
    }
}

/// Opponent move selection failure.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum OpponentError {
    /// The engine rejected the position.
    #[display("{_0}")]
    Game(GameError),
    /// The blocking search task did not complete.
    #[display("Search task failed: {_0}")]
    SearchTask(String),
}

impl std::error::Error for OpponentError {}

impl From<GameError> for OpponentError {
    fn from(err: GameError) -> Self {
        OpponentError::Game(err)
    }
}

/// Two-stage move selection shared by every connection.
#[derive(Clone)]
pub struct Opponent {
    engine: MoveEngine,
    oracle: Option<Arc<dyn MoveOracle>>,
    oracle_timeout: Duration,
}

impl std::fmt::Debug for Opponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opponent")
            .field("engine", &self.engine)
            .field("oracle", &self.oracle.as_ref().map(|o| o.info()))
            .field("oracle_timeout", &self.oracle_timeout)
            .finish()
    }
}

impl Opponent {
    /// Opponent that always searches.
    pub fn new(engine: MoveEngine) -> Self {
        Self {
            engine,
            oracle: None,
            oracle_timeout: Duration::ZERO,
        }
    }

    /// Consults `oracle` first, waiting at most `timeout` per suggestion.
    pub fn with_oracle(mut self, oracle: Arc<dyn MoveOracle>, timeout: Duration) -> Self {
        self.oracle = Some(oracle);
        self.oracle_timeout = timeout;
        self
    }

    /// Configured oracle, if any.
    pub fn oracle(&self) -> Option<&Arc<dyn MoveOracle>> {
        self.oracle.as_ref()
    }

    /// Oracle description, if one is configured.
    pub fn oracle_info(&self) -> Option<OracleInfo> {
        self.oracle.as_ref().map(|oracle| oracle.info())
    }

    /// Chooses a move for `player`.
    ///
    /// Oracle failures are absorbed; only a full board or a failed search
    /// task is an error.
    #[instrument(skip(self, board), fields(size = board.size()))]
    pub async fn choose(&self, board: &Board, player: Symbol) -> Result<ChosenMove, OpponentError> {
        if board.is_full() {
            return Err(GameError::NoMovesAvailable.into());
        }

        if let Some(position) = self.consult_oracle(board, player).await {
            info!(position, "Using oracle move");
            return Ok(ChosenMove {
                position,
                source: MoveSource::Oracle,
            });
        }

        let position = self.search(board, player).await?;
        info!(position, "Using search move");
        Ok(ChosenMove {
            position,
            source: MoveSource::Search,
        })
    }

    /// Runs the minimax engine on the blocking pool.
    pub async fn search(&self, board: &Board, player: Symbol) -> Result<usize, OpponentError> {
        let engine = self.engine;
        let board = board.clone();
        let result = tokio::task::spawn_blocking(move || engine.select_move(&board, player))
            .await
            .map_err(|e| {
                error!(error = %e, "Search task failed");
                OpponentError::SearchTask(e.to_string())
            })?;
        Ok(result?)
    }

    /// Returns a playable oracle suggestion, or `None` to fall back.
    async fn consult_oracle(&self, board: &Board, player: Symbol) -> Option<usize> {
        let oracle = self.oracle.as_ref()?;
        match tokio::time::timeout(self.oracle_timeout, oracle.suggest(board, player)).await {
            Ok(Ok(position)) if board.is_valid_index(position) && board.is_empty(position) => {
                Some(position)
            }
            Ok(Ok(position)) => {
                warn!(position, "Oracle suggested an unplayable cell, falling back to search");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Oracle failed, falling back to search");
                None
            }
            Err(_) => {
                debug!(timeout = ?self.oracle_timeout, "Oracle timed out, falling back to search");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use async_trait::async_trait;

    struct Fixed(usize);

    #[async_trait]
    impl MoveOracle for Fixed {
        async fn suggest(&self, _board: &Board, _player: Symbol) -> Result<usize, OracleError> {
            Ok(self.0)
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn info(&self) -> OracleInfo {
            OracleInfo {
                provider: "fixed".to_string(),
                model: "test".to_string(),
            }
        }
    }

    fn blocking_board() -> Board {
        let mut board = Board::new(3).unwrap();
        board.place(0, Symbol::O).unwrap();
        board.place(1, Symbol::O).unwrap();
        board.place(4, Symbol::X).unwrap();
        board
    }

    #[tokio::test]
    async fn test_search_without_oracle() {
        let opponent = Opponent::new(MoveEngine::new());
        let chosen = opponent.choose(&blocking_board(), Symbol::X).await.unwrap();
        assert_eq!(chosen.position, 2);
        assert_eq!(chosen.source, MoveSource::Search);
        assert!(!chosen.ai_used());
    }

    #[tokio::test]
    async fn test_valid_oracle_move_is_used() {
        let opponent = Opponent::new(MoveEngine::new())
            .with_oracle(Arc::new(Fixed(8)), Duration::from_secs(1));
        let chosen = opponent.choose(&blocking_board(), Symbol::X).await.unwrap();
        assert_eq!(chosen.position, 8);
        assert!(chosen.ai_used());
    }

    #[tokio::test]
    async fn test_occupied_oracle_move_falls_back() {
        let opponent = Opponent::new(MoveEngine::new())
            .with_oracle(Arc::new(Fixed(4)), Duration::from_secs(1));
        let chosen = opponent.choose(&blocking_board(), Symbol::X).await.unwrap();
        assert_eq!(chosen.position, 2);
        assert_eq!(chosen.source, MoveSource::Search);
    }

    #[tokio::test]
    async fn test_full_board_is_an_error() {
        let cells = [0, 1, 5, 6, 8]
            .iter()
            .fold(vec![Some(Symbol::O); 9], |mut cells, &i| {
                cells[i] = Some(Symbol::X);
                cells
            });
        let board = Board::from_cells(3, cells).unwrap();
        let opponent = Opponent::new(MoveEngine::new());
        assert_eq!(
            opponent.choose(&board, Symbol::X).await,
            Err(OpponentError::Game(GameError::NoMovesAvailable))
        );
    }
}
