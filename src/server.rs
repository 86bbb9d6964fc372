//! HTTP surface: the `/game` WebSocket plus single-shot REST endpoints.

use crate::config::ServerConfig;
use crate::exchange::{Exchange, ExchangeError};
use crate::llm_client::LlmClient;
use crate::opponent::{Opponent, OpponentError};
use crate::oracle::LlmOracle;
use crate::protocol::{ServerMessage, WireBoard, Winner};
use crate::registry::{SessionGuard, SessionRegistry, SessionSummary};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tictactoe_engine::{rules, Board, GameError, MoveEngine, Symbol};
use tracing::{debug, info, instrument, warn};

/// Board size used when a request does not name one.
pub const DEFAULT_BOARD_SIZE: usize = 3;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    registry: SessionRegistry,
    exchange: Arc<Exchange>,
}

impl AppState {
    /// Creates state around an exchange.
    pub fn new(exchange: Exchange) -> Self {
        Self {
            registry: SessionRegistry::new(),
            exchange: Arc::new(exchange),
        }
    }

    /// Builds the opponent and exchange described by `config`.
    ///
    /// An oracle whose API key is missing is skipped with a warning.
    #[instrument(skip(config))]
    pub fn from_config(config: &ServerConfig) -> Self {
        let engine = MoveEngine::with_budget(config.engine().search_budget());
        let mut opponent = Opponent::new(engine);

        if let Some(oracle) = config.oracle() {
            match oracle.create_llm_config(|key| std::env::var(key).ok()) {
                Ok(llm) => {
                    let client = LlmClient::new(llm);
                    opponent = opponent.with_oracle(Arc::new(LlmOracle::new(client)), oracle.timeout());
                }
                Err(e) => warn!(error = %e, "Oracle disabled"),
            }
        }

        let exchange = Exchange::new(opponent, *config.max_board_size())
            .with_legacy_reset(*config.legacy_reset_message());
        Self::new(exchange)
    }

    /// Live sessions.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Message handler.
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/game", get(game_socket))
        .route("/make_move", post(make_move))
        .route("/check_winner", post(check_winner))
        .route("/start_game", post(start_game))
        .route("/health", get(health))
        .route("/oracle-status", get(oracle_status))
        .route("/sessions", get(sessions))
        .with_state(state)
}

/// Binds and serves until the process is stopped.
#[instrument(skip(config), fields(host = %config.host(), port = config.port()))]
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(addr = %listener.local_addr()?, "Server ready");
    axum::serve(listener, app).await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────
//  WebSocket
// ─────────────────────────────────────────────────────────────

/// Query string of the `/game` endpoint.
#[derive(Debug, Deserialize)]
pub struct GameQuery {
    /// Board size; 3 when omitted.
    pub size: Option<usize>,
}

async fn game_socket(
    ws: WebSocketUpgrade,
    Query(query): Query<GameQuery>,
    State(state): State<AppState>,
) -> Response {
    let size = query.size.unwrap_or(DEFAULT_BOARD_SIZE);
    ws.on_upgrade(move |socket| run_connection(socket, state, size))
}

/// Failure that ends a connection.
#[derive(Debug, Display, Error, From)]
enum ConnectionError {
    #[display("WebSocket error: {_0}")]
    Socket(axum::Error),
    #[display("Encoding error: {_0}")]
    Encode(serde_json::Error),
    #[display("{_0}")]
    Exchange(ExchangeError),
}

#[instrument(skip(socket, state))]
async fn run_connection(mut socket: WebSocket, state: AppState, size: usize) {
    let session = match state.exchange.new_session(size) {
        Ok(session) => session,
        Err(message) => {
            warn!(%message, "Rejected connection");
            let _ = send(&mut socket, &ServerMessage::error(message)).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let guard = state.registry.open(session);
    let id = guard.id();
    match drive(&mut socket, &state, &guard).await {
        Ok(()) => info!(connection_id = id, "Client disconnected"),
        Err(e) => {
            warn!(connection_id = id, error = %e, "Closing connection");
            let _ = socket.send(Message::Close(None)).await;
        }
    }
}

/// Sends the opening state, then handles frames until the client leaves.
async fn drive(
    socket: &mut WebSocket,
    state: &AppState,
    guard: &SessionGuard,
) -> Result<(), ConnectionError> {
    let opening = ServerMessage::state(&*guard.session().lock().await, None);
    send(socket, &opening).await?;

    while let Some(frame) = socket.recv().await {
        let replies = match frame? {
            Message::Text(text) => {
                let mut session = guard.session().lock().await;
                state.exchange.handle_text(&mut session, text.as_str()).await?
            }
            Message::Binary(_) => vec![ServerMessage::error("Binary frames are not supported")],
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        for reply in &replies {
            send(socket, reply).await?;
        }
    }
    Ok(())
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ConnectionError> {
    let text = serde_json::to_string(message)?;
    debug!(message = %text, "Sending");
    socket.send(Message::Text(text.into())).await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────
//  REST
// ─────────────────────────────────────────────────────────────

/// Failed REST request, answered with 400 and `{ "error": message }`.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{message}")]
pub struct ApiError {
    /// Reason shown to the client.
    pub message: String,
}

impl ApiError {
    /// Creates an error with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        ApiError::new(err.to_string())
    }
}

impl From<OpponentError> for ApiError {
    fn from(err: OpponentError) -> Self {
        ApiError::new(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.message, "Request rejected");
        let body = serde_json::json!({ "error": self.message });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Body of `POST /make_move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeMoveRequest {
    /// Row-major cells.
    pub board: WireBoard,
    /// Player the server moves for.
    pub current_player: Symbol,
    /// Side length; inferred from the cell count when omitted.
    #[serde(default)]
    pub size: Option<usize>,
}

/// Reply to `POST /make_move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeMoveResponse {
    /// Chosen cell.
    pub position: usize,
    /// Player that moved.
    pub player: Symbol,
    /// Board after the move.
    pub board: WireBoard,
    /// Whether the oracle picked the cell.
    pub ai_used: bool,
}

/// Body of `POST /check_winner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckWinnerRequest {
    /// Row-major cells.
    pub board: WireBoard,
    /// Side length; inferred from the cell count when omitted.
    #[serde(default)]
    pub size: Option<usize>,
}

/// Reply to `POST /start_game`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameResponse {
    /// Empty board.
    pub board: WireBoard,
    /// Always X.
    pub current_player: Symbol,
    /// Side length.
    pub size: usize,
}

/// Reply to `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Live WebSocket sessions.
    pub active_sessions: usize,
    /// Server time.
    pub timestamp: DateTime<Utc>,
}

/// Reply to `GET /oracle-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleStatus {
    /// Whether the oracle can answer right now.
    pub available: bool,
    /// Provider name, if an oracle is configured.
    pub provider: Option<String>,
    /// Model name, if an oracle is configured.
    pub model: Option<String>,
}

/// Builds a board from a REST payload, checking size limits.
fn wire_board(exchange: &Exchange, cells: WireBoard, size: Option<usize>) -> Result<Board, ApiError> {
    let size = size.unwrap_or_else(|| cells.len().isqrt());
    exchange.check_size(size).map_err(ApiError::new)?;
    Ok(Board::from_cells(size, cells)?)
}

async fn make_move(
    State(state): State<AppState>,
    Json(request): Json<MakeMoveRequest>,
) -> Result<Json<MakeMoveResponse>, ApiError> {
    let mut board = wire_board(&state.exchange, request.board, request.size)?;
    if rules::evaluate(&board).is_some() {
        return Err(GameError::GameOver.into());
    }

    let player = request.current_player;
    debug!(%player, size = board.size(), "REST move requested");
    let chosen = state.exchange.opponent().choose(&board, player).await?;
    board.place(chosen.position, player)?;
    info!(position = chosen.position, source = %chosen.source, "REST move");

    Ok(Json(MakeMoveResponse {
        position: chosen.position,
        player,
        board: board.cells().to_vec(),
        ai_used: chosen.ai_used(),
    }))
}

async fn check_winner(
    State(state): State<AppState>,
    Json(request): Json<CheckWinnerRequest>,
) -> Result<Json<Option<Winner>>, ApiError> {
    let board = wire_board(&state.exchange, request.board, request.size)?;
    Ok(Json(rules::evaluate(&board).map(Winner::from)))
}

async fn start_game(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<StartGameResponse>, ApiError> {
    let size = query.size.unwrap_or(DEFAULT_BOARD_SIZE);
    let session = state.exchange.new_session(size).map_err(ApiError::new)?;
    Ok(Json(StartGameResponse {
        board: session.board().cells().to_vec(),
        current_player: session.current_player(),
        size,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        active_sessions: state.registry.len(),
        timestamp: Utc::now(),
    })
}

async fn oracle_status(State(state): State<AppState>) -> Json<OracleStatus> {
    let status = match state.exchange.opponent().oracle() {
        Some(oracle) => {
            let info = oracle.info();
            OracleStatus {
                available: oracle.is_available().await,
                provider: Some(info.provider),
                model: Some(info.model),
            }
        }
        None => OracleStatus {
            available: false,
            provider: None,
            model: None,
        },
    };
    Json(status)
}

async fn sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.registry.summaries())
}
