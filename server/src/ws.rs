use crate::error::GameError;
use crate::game_manager::{error_message, AppState};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use shared::{ClientMessage, ErrorPayload, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// One serial reader per socket. Outbound traffic goes through an unbounded
/// channel drained by a forwarder task, so fan-out from other tasks never
/// touches the socket directly.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    let socket_id = Uuid::new_v4();
    let mut username: Option<String> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        if let Some(name) = &username {
            if !state.check_rate_limit(name) {
                continue;
            }
        }

        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(msg) => msg,
            Err(_) => {
                let _ = tx.send(ServerMessage::Error(ErrorPayload {
                    message: "invalid message format".to_owned(),
                    code: None,
                }));
                continue;
            }
        };

        match client_msg {
            ClientMessage::JoinMatchmaking { username: name } => {
                if state.handle_join(&name, tx.clone(), socket_id).await {
                    username = Some(name);
                }
            }
            ClientMessage::MakeMove { game_id, column } => match &username {
                Some(name) => state.handle_make_move(name, game_id, column).await,
                None => {
                    let _ = tx.send(error_message(&GameError::NotInGame));
                }
            },
            ClientMessage::ReconnectGame { username: name } => {
                if state.handle_reconnect(&name, tx.clone(), socket_id).await {
                    username = Some(name);
                }
            }
        }
    }

    // Read error or close: treat as a disconnect.
    if let Some(name) = username {
        state.handle_disconnection(&name).await;
    }
}
