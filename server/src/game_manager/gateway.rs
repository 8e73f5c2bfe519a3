use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use connect_core::board::Color;
use shared::{ErrorPayload, GameRestoredPayload, GameStartedPayload, ServerMessage};
use uuid::Uuid;

use crate::error::GameError;
use crate::game_manager::{
    AppState, DisconnectRecord, GameSession, JoinOutcome, Participant, Tx, WaitingEntry,
};
use crate::store::GameStatus;

pub const BOT_DISPLAY_NAME: &str = "Bot";
const BOT_MOVE_DELAY: Duration = Duration::from_millis(500);
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;

pub fn error_message(err: &GameError) -> ServerMessage {
    ServerMessage::Error(ErrorPayload {
        message: err.to_string(),
        code: Some(err.code().to_owned()),
    })
}

fn searching_status() -> ServerMessage {
    ServerMessage::MatchmakingStatus {
        status: "searching".to_owned(),
        message: "Looking for opponent...".to_owned(),
    }
}

impl AppState {
    /// Entry point for `join-matchmaking`. Returns whether the socket is
    /// now bound to `username` (errors that reach an already-bound name
    /// still leave it bound).
    pub async fn handle_join(self: &Arc<Self>, username: &str, tx: Tx, socket_id: Uuid) -> bool {
        if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
            let _ = tx.send(error_message(&GameError::InvalidUsername));
            return false;
        }
        if self.player_games.contains_key(username) {
            let _ = tx.send(error_message(&GameError::AlreadyInGame));
            return false;
        }

        self.bind(username, tx, socket_id);

        match self.matchmaker.join(username, socket_id).await {
            Err(err) => {
                self.send_error(username, &err);
                true
            }
            Ok(JoinOutcome::Paired { red, yellow }) => {
                self.send_to(username, searching_status());
                let state = Arc::clone(self);
                tokio::spawn(async move {
                    state.start_pvp_game(red, yellow).await;
                });
                true
            }
            Ok(JoinOutcome::Queued) => {
                self.send_to(username, searching_status());
                self.spawn_queue_timer(username.to_owned());
                true
            }
        }
    }

    /// Falls back to an adversary match if the player is still waiting when
    /// the timer fires.
    fn spawn_queue_timer(self: &Arc<Self>, username: String) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(state.config.matchmaking_timeout).await;
            if let Some(entry) = state.matchmaker.take_if_waiting(&username).await {
                tracing::info!(username = %username, "matchmaking timed out, starting bot game");
                state.start_bot_game(entry).await;
            }
        });
    }

    async fn start_pvp_game(self: &Arc<Self>, red: WaitingEntry, yellow: WaitingEntry) {
        let player1 = Participant {
            player_id: red.player_id,
            username: red.username.clone(),
            color: Color::Red,
            is_bot: false,
            socket_id: Some(red.socket_id),
        };
        let player2 = Participant {
            player_id: yellow.player_id,
            username: yellow.username.clone(),
            color: Color::Yellow,
            is_bot: false,
            socket_id: Some(yellow.socket_id),
        };

        match self.registry.create_game(player1, player2).await {
            Err(err) => {
                tracing::error!(error = %err, "failed to create game");
                self.send_error(&red.username, &err);
                self.send_error(&yellow.username, &err);
            }
            Ok(session) => {
                self.player_games
                    .insert(red.username.clone(), session.game_id);
                self.player_games
                    .insert(yellow.username.clone(), session.game_id);

                self.send_to(
                    &red.username,
                    ServerMessage::GameStarted(GameStartedPayload {
                        game_id: session.game_id,
                        opponent: yellow.username.clone(),
                        your_color: Color::Red,
                        current_turn: Color::Red,
                        is_bot: false,
                    }),
                );
                self.send_to(
                    &yellow.username,
                    ServerMessage::GameStarted(GameStartedPayload {
                        game_id: session.game_id,
                        opponent: red.username.clone(),
                        your_color: Color::Yellow,
                        current_turn: Color::Red,
                        is_bot: false,
                    }),
                );
            }
        }
    }

    async fn start_bot_game(self: &Arc<Self>, entry: WaitingEntry) {
        let bot = match self.matchmaker.register_adversary().await {
            Ok(bot) => bot,
            Err(err) => {
                tracing::error!(error = %err, "failed to create bot player");
                self.send_error(&entry.username, &err);
                return;
            }
        };

        let player1 = Participant {
            player_id: entry.player_id,
            username: entry.username.clone(),
            color: Color::Red,
            is_bot: false,
            socket_id: Some(entry.socket_id),
        };
        let player2 = Participant {
            player_id: bot.id,
            username: BOT_DISPLAY_NAME.to_owned(),
            color: Color::Yellow,
            is_bot: true,
            socket_id: None,
        };

        match self.registry.create_game(player1, player2).await {
            Err(err) => {
                tracing::error!(error = %err, "failed to create bot game");
                self.send_error(&entry.username, &err);
            }
            Ok(session) => {
                self.player_games
                    .insert(entry.username.clone(), session.game_id);
                self.send_to(
                    &entry.username,
                    ServerMessage::GameStarted(GameStartedPayload {
                        game_id: session.game_id,
                        opponent: BOT_DISPLAY_NAME.to_owned(),
                        your_color: Color::Red,
                        current_turn: Color::Red,
                        is_bot: true,
                    }),
                );
            }
        }
    }

    pub async fn handle_make_move(self: &Arc<Self>, username: &str, game_id: Uuid, column: i32) {
        let session = match self.registry.snapshot(game_id).await {
            Ok(session) => session,
            Err(err) => {
                self.send_error(username, &err);
                return;
            }
        };
        let actor_id = match session.participant(username) {
            Some(actor) => actor.player_id,
            None => {
                self.send_error(username, &GameError::NotInGame);
                return;
            }
        };

        match self.registry.apply_move(game_id, actor_id, column).await {
            Err(err) => self.send_error(username, &err),
            Ok((mv, game_over)) => {
                self.send_to(username, ServerMessage::MoveAccepted(mv.clone()));

                let opponent = session.opponent_of(username).cloned();
                if let Some(opp) = &opponent {
                    if !opp.is_bot {
                        self.send_to(&opp.username, ServerMessage::OpponentMoved(mv.clone()));
                    }
                }

                if let Some(over) = game_over {
                    self.send_to(username, ServerMessage::GameOver(over.clone()));
                    if let Some(opp) = &opponent {
                        if !opp.is_bot {
                            self.send_to(&opp.username, ServerMessage::GameOver(over));
                        }
                    }
                    self.clear_game(&session);
                    return;
                }

                if session.player2.is_bot && mv.next_turn == Some(session.player2.color) {
                    self.spawn_bot_move(session, username.to_owned());
                }
            }
        }
    }

    /// The short pause keeps the bot's reply from feeling instantaneous.
    fn spawn_bot_move(self: &Arc<Self>, session: GameSession, human: String) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(BOT_MOVE_DELAY).await;
            match state.registry.apply_adversary_move(session.game_id).await {
                Err(err) => {
                    tracing::warn!(game_id = %session.game_id, error = %err, "bot move failed");
                }
                Ok((mv, game_over)) => {
                    state.send_to(&human, ServerMessage::OpponentMoved(mv));
                    if let Some(over) = game_over {
                        state.send_to(&human, ServerMessage::GameOver(over));
                        state.clear_game(&session);
                    }
                }
            }
        });
    }

    /// Entry point for `reconnect-game`. Returns whether the socket is now
    /// bound to `username`.
    pub async fn handle_reconnect(self: &Arc<Self>, username: &str, tx: Tx, socket_id: Uuid) -> bool {
        let Some(record) = self.reconnects.peek(username) else {
            let _ = tx.send(error_message(&GameError::NothingToRestore));
            return false;
        };
        let session = match self.registry.snapshot(record.game_id).await {
            Ok(session) if session.status == GameStatus::Active => session,
            _ => {
                let _ = tx.send(error_message(&GameError::NothingToRestore));
                return false;
            }
        };
        let (your_color, opponent) = match session.participant(username) {
            Some(me) => (me.color, session.opponent_of(username).cloned()),
            None => {
                let _ = tx.send(error_message(&GameError::NotInGame));
                return false;
            }
        };

        // Removing the record is what cancels the forfeit timer. If the
        // timer raced us here and took it first, the forfeit stands.
        if self.reconnects.take(username).is_none() {
            let _ = tx.send(error_message(&GameError::NothingToRestore));
            return false;
        }
        self.bind(username, tx, socket_id);
        self.player_games.insert(username.to_owned(), session.game_id);

        tracing::info!(username = %username, game_id = %session.game_id, "player reconnected");
        self.send_to(
            username,
            ServerMessage::GameRestored(GameRestoredPayload {
                game_id: session.game_id,
                board: session.board,
                current_turn: session.current_turn,
                move_count: session.move_count,
                your_color,
                opponent: opponent
                    .as_ref()
                    .map(|o| o.username.clone())
                    .unwrap_or_default(),
            }),
        );
        if let Some(opp) = opponent {
            if !opp.is_bot {
                self.send_to(
                    &opp.username,
                    ServerMessage::OpponentReconnected {
                        message: format!("{username} has reconnected"),
                    },
                );
            }
        }
        true
    }

    /// Socket read error for a bound name. In-game players get a grace
    /// window before the forfeit; waiting players just leave the queue.
    /// The game lookup happens before the queue check so a just-started
    /// game cannot be raced out of.
    pub async fn handle_disconnection(self: &Arc<Self>, username: &str) {
        self.connections.remove(username);

        let game_id = self.player_games.get(username).map(|entry| *entry.value());
        let Some(game_id) = game_id else {
            self.matchmaker.leave(username).await;
            return;
        };

        match self.registry.snapshot(game_id).await {
            Ok(session) if session.status == GameStatus::Active => {
                let Some(me) = session.participant(username) else {
                    return;
                };
                self.reconnects.track(DisconnectRecord {
                    player_id: me.player_id,
                    username: username.to_owned(),
                    game_id,
                    disconnected_at: Utc::now(),
                });
                self.spawn_forfeit_timer(username.to_owned());

                if let Some(opp) = session.opponent_of(username) {
                    if !opp.is_bot {
                        self.send_to(
                            &opp.username,
                            ServerMessage::OpponentDisconnected {
                                time_remaining: self.config.reconnection_timeout.as_secs(),
                            },
                        );
                    }
                }
            }
            _ => {
                // The game already ended; drop the stale mapping.
                self.player_games.remove(username);
            }
        }
    }

    fn spawn_forfeit_timer(self: &Arc<Self>, username: String) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(state.config.reconnection_timeout).await;
            // A reconnect in the meantime removed the record.
            let Some(record) = state.reconnects.take(&username) else {
                return;
            };
            match state.registry.forfeit(record.game_id, record.player_id).await {
                Err(err) => {
                    tracing::warn!(game_id = %record.game_id, error = %err, "forfeit skipped");
                }
                Ok(over) => {
                    tracing::info!(
                        username = %username,
                        game_id = %record.game_id,
                        offline_secs = (Utc::now() - record.disconnected_at).num_seconds(),
                        "player forfeited after reconnect window"
                    );
                    state.player_games.remove(&record.username);
                    if let Some(winner) = over.winner.clone() {
                        state.player_games.remove(&winner);
                        state.send_to(&winner, ServerMessage::GameOver(over));
                    }
                }
            }
        });
    }

    fn clear_game(&self, session: &GameSession) {
        for participant in [&session.player1, &session.player2] {
            if !participant.is_bot {
                self.player_games.remove(&participant.username);
            }
        }
    }

    fn send_error(&self, username: &str, err: &GameError) {
        self.send_to(username, error_message(err));
    }
}
