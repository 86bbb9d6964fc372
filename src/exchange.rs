//! Per-message game logic, independent of the transport.
//!
//! An `Exchange` turns one inbound message into the replies for it, mutating
//! the connection's session along the way. Rejected requests produce an
//! `error` reply and leave the session alone; only internal faults surface as
//! `ExchangeError`, which ends the connection.

use crate::opponent::{Opponent, OpponentError};
use crate::protocol::{ClientMessage, ServerMessage, WireBoard};
use derive_more::Display;
use tictactoe_engine::{Board, GameError, GameSession, Symbol};
use tracing::{debug, error, info, instrument, warn};

/// Internal fault while handling a message.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ExchangeError {
    /// The opponent could not produce a move.
    #[display("Opponent failed: {_0}")]
    Opponent(OpponentError),
    /// The opponent produced a move the session refused.
    #[display("Opponent chose unplayable position {position}: {reason}")]
    Unplayable {
        /// Rejected position.
        position: usize,
        /// Session's reason.
        reason: GameError,
    },
}

impl std::error::Error for ExchangeError {}

impl From<OpponentError> for ExchangeError {
    fn from(err: OpponentError) -> Self {
        ExchangeError::Opponent(err)
    }
}

/// Message handler shared by all connections.
#[derive(Debug, Clone)]
pub struct Exchange {
    opponent: Opponent,
    max_board_size: usize,
    legacy_reset_message: bool,
}

impl Exchange {
    /// Creates a handler allowing boards up to `max_board_size`.
    pub fn new(opponent: Opponent, max_board_size: usize) -> Self {
        Self {
            opponent,
            max_board_size,
            legacy_reset_message: false,
        }
    }

    /// Answers resets with `game_reset` instead of `game_state`.
    pub fn with_legacy_reset(mut self, enabled: bool) -> Self {
        self.legacy_reset_message = enabled;
        self
    }

    /// Opponent used for replies.
    pub fn opponent(&self) -> &Opponent {
        &self.opponent
    }

    /// Largest accepted board size.
    pub fn max_board_size(&self) -> usize {
        self.max_board_size
    }

    /// Rejects sizes the engine cannot build or the server will not host.
    pub fn check_size(&self, size: usize) -> Result<(), String> {
        if size > self.max_board_size {
            return Err(format!(
                "Board size {} exceeds the maximum of {}",
                size, self.max_board_size
            ));
        }
        Board::new(size).map(|_| ()).map_err(|e| e.to_string())
    }

    /// Fresh session on an empty board with X to move.
    pub fn new_session(&self, size: usize) -> Result<GameSession, String> {
        self.check_size(size)?;
        GameSession::new(size, Symbol::X).map_err(|e| e.to_string())
    }

    /// Parses and handles a text frame. Malformed JSON yields an `error` reply.
    pub async fn handle_text(
        &self,
        session: &mut GameSession,
        text: &str,
    ) -> Result<Vec<ServerMessage>, ExchangeError> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle(session, message).await,
            Err(e) => {
                warn!(error = %e, "Malformed client message");
                Ok(vec![ServerMessage::error(format!("Invalid message: {}", e))])
            }
        }
    }

    /// Handles one inbound message.
    #[instrument(skip(self, session), fields(size = session.board().size()))]
    pub async fn handle(
        &self,
        session: &mut GameSession,
        message: ClientMessage,
    ) -> Result<Vec<ServerMessage>, ExchangeError> {
        match message {
            ClientMessage::PlayerMove { position } => self.player_move(session, position).await,
            ClientMessage::ResetGame {
                size,
                board,
                current_player,
            } => Ok(self.reset(session, size, board, current_player)),
            ClientMessage::Undo => Ok(self.undo(session)),
        }
    }

    async fn player_move(
        &self,
        session: &mut GameSession,
        position: i64,
    ) -> Result<Vec<ServerMessage>, ExchangeError> {
        let Ok(position) = usize::try_from(position) else {
            warn!(position, "Negative move position");
            return Ok(vec![ServerMessage::error(format!(
                "Invalid move: position {} is out of range",
                position
            ))]);
        };

        if let Err(e) = session.apply_move(position) {
            warn!(position, error = %e, "Player move rejected");
            return Ok(vec![ServerMessage::error(e.to_string())]);
        }
        if session.is_terminal() {
            info!(position, status = ?session.status(), "Player move ended the game");
            return Ok(Self::with_outcome(session, None));
        }

        let acting = session.current_player();
        let chosen = self.opponent.choose(session.board(), acting).await?;
        session
            .apply_move(chosen.position)
            .map_err(|reason| {
                error!(position = chosen.position, error = %reason, "Opponent move refused");
                ExchangeError::Unplayable {
                    position: chosen.position,
                    reason,
                }
            })?;
        debug!(position = chosen.position, source = %chosen.source, "Opponent moved");

        Ok(Self::with_outcome(session, Some(chosen.ai_used())))
    }

    fn reset(
        &self,
        session: &mut GameSession,
        size: usize,
        board: Option<WireBoard>,
        current_player: Option<Symbol>,
    ) -> Vec<ServerMessage> {
        if let Err(message) = self.check_size(size) {
            warn!(size, "Reset rejected");
            return vec![ServerMessage::error(message)];
        }
        match session.reset(size, board, current_player) {
            Ok(fresh) => {
                *session = fresh;
                info!(size, status = ?session.status(), "Game reset");
                let mut replies = vec![if self.legacy_reset_message {
                    ServerMessage::reset(session)
                } else {
                    ServerMessage::state(session, None)
                }];
                replies.extend(ServerMessage::game_over(session, None));
                replies
            }
            Err(e) => {
                warn!(size, error = %e, "Reset rejected");
                vec![ServerMessage::error(e.to_string())]
            }
        }
    }

    /// Takes back moves until it is the client's turn again.
    ///
    /// The client made the session's first move, so its symbol is the first
    /// mover's. That is one move after a game the client ended, two otherwise.
    fn undo(&self, session: &mut GameSession) -> Vec<ServerMessage> {
        let Some(client) = session.history().first().map(|m| m.player) else {
            return vec![ServerMessage::error(GameError::NoHistory.to_string())];
        };
        let mut undone = 0;
        while let Ok(last) = session.undo_last() {
            undone += 1;
            if last.player == client {
                break;
            }
        }
        info!(undone, moves = session.history().len(), "Undo");
        vec![ServerMessage::state(session, None)]
    }

    fn with_outcome(session: &GameSession, ai_used: Option<bool>) -> Vec<ServerMessage> {
        let mut replies = vec![ServerMessage::state(session, ai_used)];
        replies.extend(ServerMessage::game_over(session, ai_used));
        replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_engine::{GameStatus, MoveEngine};

    fn exchange() -> Exchange {
        Exchange::new(Opponent::new(MoveEngine::new()), 6)
    }

    #[tokio::test]
    async fn test_move_gets_reply() {
        let exchange = exchange();
        let mut session = exchange.new_session(3).unwrap();
        let replies = exchange
            .handle(&mut session, ClientMessage::PlayerMove { position: 0 })
            .await
            .unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.current_player(), Symbol::X);
        match &replies[0] {
            ServerMessage::GameState { ai_used, .. } => assert_eq!(*ai_used, Some(false)),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_occupied_cell_is_an_error_reply() {
        let exchange = exchange();
        let mut session = exchange.new_session(3).unwrap();
        exchange
            .handle(&mut session, ClientMessage::PlayerMove { position: 4 })
            .await
            .unwrap();
        let before = session.clone();
        let replies = exchange
            .handle(&mut session, ClientMessage::PlayerMove { position: 4 })
            .await
            .unwrap();
        assert!(matches!(replies[0], ServerMessage::Error { .. }));
        assert_eq!(session, before);
    }

    #[tokio::test]
    async fn test_negative_position_is_rejected() {
        let exchange = exchange();
        let mut session = exchange.new_session(3).unwrap();
        let replies = exchange
            .handle(&mut session, ClientMessage::PlayerMove { position: -1 })
            .await
            .unwrap();
        assert!(matches!(replies[0], ServerMessage::Error { .. }));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_keeps_session() {
        let exchange = exchange();
        let mut session = exchange.new_session(3).unwrap();
        let replies = exchange.handle_text(&mut session, "{not json").await.unwrap();
        assert!(matches!(replies[0], ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn test_winning_move_skips_opponent() {
        let exchange = exchange();
        let mut session = exchange.new_session(3).unwrap();
        let x = Some(Symbol::X);
        let o = Some(Symbol::O);
        let snapshot = vec![x, x, None, o, o, None, None, None, None];
        exchange.reset(&mut session, 3, Some(snapshot), Some(Symbol::X));
        let replies = exchange
            .handle(&mut session, ClientMessage::PlayerMove { position: 2 })
            .await
            .unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(session.status(), GameStatus::Won(Symbol::X));
        assert!(matches!(replies[1], ServerMessage::GameOver { ai_used: None, .. }));
    }

    #[tokio::test]
    async fn test_undo_restores_client_turn() {
        let exchange = exchange();
        let mut session = exchange.new_session(3).unwrap();
        exchange
            .handle(&mut session, ClientMessage::PlayerMove { position: 0 })
            .await
            .unwrap();
        let replies = exchange.handle(&mut session, ClientMessage::Undo).await.unwrap();
        assert!(session.history().is_empty());
        assert_eq!(session.current_player(), Symbol::X);
        assert!(matches!(replies[0], ServerMessage::GameState { .. }));

        let replies = exchange.handle(&mut session, ClientMessage::Undo).await.unwrap();
        assert!(matches!(replies[0], ServerMessage::Error { .. }));
    }

    #[test]
    fn test_size_limits() {
        let exchange = exchange();
        assert!(exchange.check_size(3).is_ok());
        assert!(exchange.check_size(6).is_ok());
        assert!(exchange.check_size(7).is_err());
        assert!(exchange.check_size(2).is_err());
    }

    #[test]
    fn test_legacy_reset_reply() {
        let exchange = exchange().with_legacy_reset(true);
        let mut session = exchange.new_session(3).unwrap();
        let replies = exchange.reset(&mut session, 4, None, None);
        assert!(matches!(replies[0], ServerMessage::GameReset { .. }));
        assert_eq!(session.board().size(), 4);
    }
}
