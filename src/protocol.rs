//! JSON messages exchanged over the game WebSocket.
//!
//! Every message is an object tagged by `"type"`. Boards travel as row-major
//! arrays of `null`, `"X"` or `"O"`.

use serde::{Deserialize, Serialize};
use tictactoe_engine::{GameSession, Outcome, Symbol};

/// Wire form of a board.
pub type WireBoard = Vec<Option<Symbol>>;

/// Client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Play a cell for the current player.
    PlayerMove {
        /// Signed on the wire so negative positions get a proper error.
        position: i64,
    },
    /// Start a new game, optionally from a snapshot.
    ResetGame {
        /// Board side length.
        size: usize,
        /// Row-major snapshot of length size².
        #[serde(default)]
        board: Option<WireBoard>,
        /// Player to move; X when omitted.
        #[serde(default)]
        current_player: Option<Symbol>,
    },
    /// Take back the last exchange.
    Undo,
}

/// Game result as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    /// X completed a line.
    X,
    /// O completed a line.
    O,
    /// Board filled without a line.
    Tie,
}

impl From<Outcome> for Winner {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Winner(Symbol::X) => Winner::X,
            Outcome::Winner(Symbol::O) => Winner::O,
            Outcome::Draw => Winner::Tie,
        }
    }
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Current board and turn.
    GameState {
        /// Row-major cells.
        board: WireBoard,
        /// Player to move.
        current_player: Symbol,
        /// Board side length.
        size: usize,
        /// Whether the opponent's last move came from the oracle.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ai_used: Option<bool>,
    },
    /// The game has ended.
    GameOver {
        /// Winning symbol or `Tie`.
        winner: Winner,
        /// Final board.
        board: WireBoard,
        /// Whether the opponent's last move came from the oracle.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ai_used: Option<bool>,
    },
    /// Request rejected; the session is unchanged.
    Error {
        /// Human-readable reason.
        message: String,
    },
    /// Older clients expect this after a reset instead of `game_state`.
    GameReset {
        /// Row-major cells.
        board: WireBoard,
    },
}

impl ServerMessage {
    /// Snapshot of the session's board and turn.
    pub fn state(session: &GameSession, ai_used: Option<bool>) -> Self {
        ServerMessage::GameState {
            board: session.board().cells().to_vec(),
            current_player: session.current_player(),
            size: session.board().size(),
            ai_used,
        }
    }

    /// Terminal notice, or `None` while the game is in progress.
    pub fn game_over(session: &GameSession, ai_used: Option<bool>) -> Option<Self> {
        session.outcome().map(|outcome| ServerMessage::GameOver {
            winner: outcome.into(),
            board: session.board().cells().to_vec(),
            ai_used,
        })
    }

    /// Legacy reset notice.
    pub fn reset(session: &GameSession) -> Self {
        ServerMessage::GameReset {
            board: session.board().cells().to_vec(),
        }
    }

    /// Rejection notice.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_inbound_messages() {
        let mv: ClientMessage =
            serde_json::from_value(json!({"type": "player_move", "position": 4})).unwrap();
        assert_eq!(mv, ClientMessage::PlayerMove { position: 4 });

        let reset: ClientMessage = serde_json::from_value(json!({
            "type": "reset_game",
            "size": 3,
            "board": ["X", null, null, null, "O", null, null, null, null],
            "current_player": "X"
        }))
        .unwrap();
        match reset {
            ClientMessage::ResetGame {
                size,
                board,
                current_player,
            } => {
                assert_eq!(size, 3);
                assert_eq!(board.unwrap()[4], Some(Symbol::O));
                assert_eq!(current_player, Some(Symbol::X));
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let undo: ClientMessage = serde_json::from_value(json!({"type": "undo"})).unwrap();
        assert_eq!(undo, ClientMessage::Undo);
    }

    #[test]
    fn test_reset_fields_are_optional() {
        let reset: ClientMessage =
            serde_json::from_value(json!({"type": "reset_game", "size": 5})).unwrap();
        assert_eq!(
            reset,
            ClientMessage::ResetGame {
                size: 5,
                board: None,
                current_player: None
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "resign"})).is_err());
        assert!(serde_json::from_value::<ClientMessage>(json!({"position": 1})).is_err());
    }

    #[test]
    fn test_state_message_shape() {
        let mut session = GameSession::new(3, Symbol::X).unwrap();
        session.apply_move(0).unwrap();
        let value = serde_json::to_value(ServerMessage::state(&session, None)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "game_state",
                "board": ["X", null, null, null, null, null, null, null, null],
                "current_player": "O",
                "size": 3
            })
        );
        let value = serde_json::to_value(ServerMessage::state(&session, Some(false))).unwrap();
        assert_eq!(value["ai_used"], json!(false));
    }

    #[test]
    fn test_game_over_reports_tie() {
        let mut session = GameSession::new(3, Symbol::X).unwrap();
        for position in [0, 1, 2, 4, 3, 5, 7, 6, 8] {
            session.apply_move(position).unwrap();
        }
        let value = serde_json::to_value(ServerMessage::game_over(&session, None).unwrap()).unwrap();
        assert_eq!(value["type"], "game_over");
        assert_eq!(value["winner"], "Tie");
    }

    #[test]
    fn test_no_game_over_while_in_progress() {
        let session = GameSession::new(4, Symbol::O).unwrap();
        assert!(ServerMessage::game_over(&session, None).is_none());
    }
}
