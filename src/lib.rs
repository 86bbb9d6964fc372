//! Tic-tac-toe game server
//!
//! Wraps the `tictactoe_engine` crate in an async service: each WebSocket
//! connection owns one game session, and every player move is answered by an
//! automated opponent.
//!
//! # Architecture
//!
//! - **Registry**: live sessions keyed by connection, removed on disconnect
//! - **Opponent**: optional LLM oracle, validated, else minimax search
//! - **Exchange**: per-message game logic, independent of the transport
//! - **Server**: axum router with the `/game` WebSocket and REST endpoints
//! - **Config**: TOML file with environment overrides
//!
//! # Example
//!
//! ```no_run
//! use tictactoe_server::{AppState, ServerConfig, router};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::load(None)?;
//! let app = router(AppState::from_config(&config));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
mod config;
mod exchange;
mod llm_client;
mod opponent;
mod oracle;
mod protocol;
mod registry;
pub mod server;

// Crate-level exports - Configuration
pub use config::{ConfigError, EngineConfig, OracleConfig, ServerConfig};

// Crate-level exports - LLM client
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};

// Crate-level exports - Oracle and opponent
pub use opponent::{ChosenMove, MoveSource, Opponent, OpponentError};
pub use oracle::{LlmOracle, MoveOracle, OracleError, OracleInfo, build_prompt, parse_position};

// Crate-level exports - Messages
pub use exchange::{Exchange, ExchangeError};
pub use protocol::{ClientMessage, ServerMessage, WireBoard, Winner};

// Crate-level exports - Sessions
pub use registry::{ConnectionId, SessionGuard, SessionRegistry, SessionSummary, SharedSession};

// Crate-level exports - HTTP
pub use server::{ApiError, AppState, router};
