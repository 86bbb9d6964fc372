//! Optional move-oracle: an LLM asked to pick the opponent's cell.
//!
//! Suggestions are advisory. The opponent pipeline validates every answer and
//! falls back to the search engine, so nothing here can corrupt a game.

use crate::llm_client::{LlmClient, LlmError};
use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::Serialize;
use tictactoe_engine::{Board, Symbol};
use tracing::{debug, instrument, warn};

const SYSTEM_PROMPT: &str = "You are playing tic-tac-toe. \
Reply with the number of the cell you choose and nothing else.";

/// Provider and model behind an oracle, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleInfo {
    /// Provider name.
    pub provider: String,
    /// Model name.
    pub model: String,
}

/// Source of advisory move suggestions.
#[async_trait]
pub trait MoveOracle: Send + Sync {
    /// Suggests a cell for `player` on `board`.
    async fn suggest(&self, board: &Board, player: Symbol) -> Result<usize, OracleError>;

    /// True if the oracle can currently answer.
    async fn is_available(&self) -> bool;

    /// Provider and model description.
    fn info(&self) -> OracleInfo;
}

/// Oracle backed by an LLM completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmOracle {
    client: LlmClient,
}

impl LlmOracle {
    /// Wraps an LLM client.
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MoveOracle for LlmOracle {
    #[instrument(skip(self, board), fields(size = board.size()))]
    async fn suggest(&self, board: &Board, player: Symbol) -> Result<usize, OracleError> {
        let prompt = build_prompt(board, player);
        let reply = self.client.generate(SYSTEM_PROMPT, &prompt).await?;
        debug!(reply = %reply.trim(), "Oracle replied");
        parse_position(&reply).ok_or_else(|| {
            warn!(reply = %reply.trim(), "Oracle reply had no position");
            OracleError::new(format!("No position in reply: {:?}", reply.trim()))
        })
    }

    async fn is_available(&self) -> bool {
        self.client.is_available().await
    }

    fn info(&self) -> OracleInfo {
        OracleInfo {
            provider: self.client.config().provider().to_string(),
            model: self.client.config().model().clone(),
        }
    }
}

/// Renders the board for the oracle, numbering the empty cells.
pub fn build_prompt(board: &Board, player: Symbol) -> String {
    let size = board.size();
    let empty: Vec<String> = board.empty_cells().iter().map(usize::to_string).collect();
    format!(
        "Board ({size}x{size}, numbers are empty cells):\n{grid}\n\n\
         You play {player}. Get {size} in a row, column or diagonal, and block {opponent}.\n\
         Empty cells: {empty}\n\
         Answer with one cell number.",
        grid = board.display(),
        opponent = player.opponent(),
        empty = empty.join(", "),
    )
}

/// Extracts the first unsigned integer from an oracle reply.
pub fn parse_position(reply: &str) -> Option<usize> {
    reply
        .split(|c: char| !c.is_ascii_digit())
        .find(|token| !token.is_empty())
        .and_then(|token| token.parse().ok())
}

/// Oracle failure. Always absorbed by the opponent pipeline.
#[derive(Debug, Clone, Display, Error)]
#[display("Oracle error: {} at {}:{}", message, file, line)]
pub struct OracleError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl OracleError {
    /// Creates a new oracle error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<LlmError> for OracleError {
    #[track_caller]
    fn from(err: LlmError) -> Self {
        OracleError::new(err.message)
    }
}
