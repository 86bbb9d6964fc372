//! Command-line interface for tictactoe_server.

use clap::{Parser, Subcommand};
use tictactoe_engine::Symbol;

/// Tic-tac-toe server with a minimax opponent
#[derive(Parser, Debug)]
#[command(name = "tictactoe_server")]
#[command(about = "Play tic-tac-toe on any N×N board over WebSocket or REST", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server
    Serve {
        /// TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,

        /// Host to bind to (overrides config and SERVER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config and SERVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the engine's move for a board, without a server
    Suggest {
        /// Board side length
        #[arg(short, long, default_value = "3")]
        size: usize,

        /// Comma-separated cells in row-major order, e.g. "X,,O,,X,,,,"
        #[arg(short, long)]
        board: String,

        /// Player to move
        #[arg(long, value_parser = parse_symbol, default_value = "O")]
        player: Symbol,
    },
}

/// Parses `X` or `O`, case-insensitively.
pub fn parse_symbol(value: &str) -> Result<Symbol, String> {
    match value.trim() {
        "X" | "x" => Ok(Symbol::X),
        "O" | "o" => Ok(Symbol::O),
        other => Err(format!("expected X or O, got {:?}", other)),
    }
}

/// Parses a comma-separated board; empty, `.`, `-` and `_` mean an empty cell.
pub fn parse_board(value: &str) -> Result<Vec<Option<Symbol>>, String> {
    value
        .split(',')
        .map(|cell| match cell.trim() {
            "" | "." | "-" | "_" => Ok(None),
            other => parse_symbol(other).map(Some),
        })
        .collect()
}
