//! Wire protocol shared between the server and its clients. Every frame is
//! a JSON object `{"type": ..., "payload": ...}` with a kebab-case type tag.

use connect_core::board::{Board, Color};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinMatchmaking { username: String },
    MakeMove { game_id: Uuid, column: i32 },
    ReconnectGame { username: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    MatchmakingStatus {
        status: String,
        message: String,
    },
    GameStarted(GameStartedPayload),
    MoveAccepted(MovePayload),
    OpponentMoved(MovePayload),
    GameOver(GameOverPayload),
    OpponentDisconnected {
        time_remaining: u64,
    },
    OpponentReconnected {
        message: String,
    },
    GameRestored(GameRestoredPayload),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStartedPayload {
    pub game_id: Uuid,
    pub opponent: String,
    pub your_color: Color,
    pub current_turn: Color,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePayload {
    pub column: usize,
    pub row: usize,
    pub color: Color,
    /// Absent on the final move of a game.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_turn: Option<Color>,
    pub board: Board,
    pub move_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOverReason {
    Win,
    Draw,
    Forfeit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOverPayload {
    pub winner: Option<String>,
    pub reason: GameOverReason,
    pub board: Board,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRestoredPayload {
    pub game_id: Uuid,
    pub board: Board,
    pub current_turn: Color,
    pub move_count: u32,
    pub your_color: Color,
    pub opponent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn roundtrip(msg: &ServerMessage) -> ServerMessage {
        let encoded = serde_json::to_string(msg).unwrap();
        serde_json::from_str(&encoded).unwrap()
    }

    #[test]
    fn envelope_shape() {
        let msg = ServerMessage::MatchmakingStatus {
            status: "searching".into(),
            message: "Looking for opponent...".into(),
        };
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "matchmaking-status");
        assert_eq!(value["payload"]["status"], "searching");
    }

    #[test]
    fn board_serializes_as_integer_matrix() {
        let mut board = Board::new();
        board.drop_disc(0, Color::Red);
        board.drop_disc(0, Color::Yellow);

        let value: Value = serde_json::to_value(board).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[5][0], 1);
        assert_eq!(rows[4][0], 2);
        assert_eq!(rows[3][0], 0);
    }

    #[test]
    fn colors_are_lowercase_strings() {
        assert_eq!(serde_json::to_value(Color::Red).unwrap(), json!("red"));
        assert_eq!(serde_json::to_value(Color::Yellow).unwrap(), json!("yellow"));
    }

    #[test]
    fn client_messages_decode() {
        let game_id = Uuid::new_v4();
        let frame =
            format!(r#"{{"type":"make-move","payload":{{"game_id":"{game_id}","column":3}}}}"#);
        match serde_json::from_str::<ClientMessage>(&frame).unwrap() {
            ClientMessage::MakeMove { game_id: id, column } => {
                assert_eq!(id, game_id);
                assert_eq!(column, 3);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let frame = r#"{"type":"join-matchmaking","payload":{"username":"alice"}}"#;
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(frame).unwrap(),
            ClientMessage::JoinMatchmaking { .. }
        ));

        let frame = r#"{"type":"reconnect-game","payload":{"username":"alice"}}"#;
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(frame).unwrap(),
            ClientMessage::ReconnectGame { .. }
        ));
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"make-move"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
        assert!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"unknown","payload":{}}"#).is_err()
        );
    }

    #[test]
    fn server_messages_roundtrip() {
        let game_id = Uuid::new_v4();
        let mut board = Board::new();
        board.drop_disc(3, Color::Red);

        let messages = [
            ServerMessage::GameStarted(GameStartedPayload {
                game_id,
                opponent: "Bot".into(),
                your_color: Color::Red,
                current_turn: Color::Red,
                is_bot: true,
            }),
            ServerMessage::MoveAccepted(MovePayload {
                column: 3,
                row: 5,
                color: Color::Red,
                next_turn: Some(Color::Yellow),
                board,
                move_number: 1,
            }),
            ServerMessage::GameOver(GameOverPayload {
                winner: None,
                reason: GameOverReason::Draw,
                board,
                duration_seconds: 77,
            }),
            ServerMessage::OpponentDisconnected { time_remaining: 30 },
            ServerMessage::GameRestored(GameRestoredPayload {
                game_id,
                board,
                current_turn: Color::Yellow,
                move_count: 1,
                your_color: Color::Yellow,
                opponent: "alice".into(),
            }),
            ServerMessage::Error(ErrorPayload {
                message: "not your turn".into(),
                code: Some("NOT_YOUR_TURN".into()),
            }),
        ];

        for msg in &messages {
            let back = roundtrip(msg);
            assert_eq!(
                serde_json::to_value(msg).unwrap(),
                serde_json::to_value(&back).unwrap()
            );
        }
    }

    #[test]
    fn final_move_omits_next_turn() {
        let payload = MovePayload {
            column: 0,
            row: 5,
            color: Color::Red,
            next_turn: None,
            board: Board::new(),
            move_number: 7,
        };
        let value: Value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("next_turn").is_none());
    }
}
