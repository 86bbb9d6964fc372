//! tictactoe_server - unified CLI
//!
//! Serves games over WebSocket and REST, or answers a single board offline.

#![warn(missing_docs)]

use anyhow::{Context, Result};
use clap::Parser;
use tictactoe_engine::{Board, MoveEngine, rules};
use tictactoe_server::cli::{Cli, Command, parse_board};
use tictactoe_server::{ServerConfig, server};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,tictactoe_server=debug,tictactoe_engine=info";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => run_server(config, host, port).await,
        Command::Suggest {
            size,
            board,
            player,
        } => suggest(size, &board, player),
    }
}

/// Run the game server
#[instrument]
async fn run_server(
    config: Option<std::path::PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = ServerConfig::load(config.as_deref())?;
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }

    info!(
        host = %config.host(),
        port = config.port(),
        oracle = config.oracle().is_some(),
        "Starting tictactoe server"
    );
    server::serve(config).await
}

/// Print the engine's move for one board
fn suggest(size: usize, board: &str, player: tictactoe_engine::Symbol) -> Result<()> {
    let cells = parse_board(board).map_err(anyhow::Error::msg)?;
    let board = Board::from_cells(size, cells).context("Invalid board")?;
    if let Some(outcome) = rules::evaluate(&board) {
        println!("Game already over: {}", outcome);
        return Ok(());
    }

    let position = MoveEngine::new()
        .select_move(&board, player)
        .context("No move available")?;
    println!("{}", position);
    Ok(())
}
