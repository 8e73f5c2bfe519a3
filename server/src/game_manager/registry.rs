use std::sync::Arc;

use chrono::{DateTime, Utc};
use connect_core::board::{Board, Color};
use connect_core::engine::Engine;
use dashmap::DashMap;
use shared::{GameOverPayload, GameOverReason, MovePayload};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::GameError;
use crate::events::{publish_best_effort, EventSink, GameEvent};
use crate::store::{GameStatus, Store};

#[derive(Debug, Clone)]
pub struct Participant {
    pub player_id: i32,
    pub username: String,
    pub color: Color,
    pub is_bot: bool,
    pub socket_id: Option<Uuid>,
}

/// Authoritative in-memory state of one game. Distinct from the persisted
/// game row: the row survives, the session is dropped once the game ends.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub game_id: Uuid,
    pub player1: Participant,
    pub player2: Participant,
    pub board: Board,
    pub current_turn: Color,
    pub status: GameStatus,
    pub winner: Option<String>,
    pub move_count: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GameSession {
    pub fn participant(&self, username: &str) -> Option<&Participant> {
        [&self.player1, &self.player2]
            .into_iter()
            .find(|p| p.username == username)
    }

    pub fn opponent_of(&self, username: &str) -> Option<&Participant> {
        if self.player1.username == username {
            Some(&self.player2)
        } else if self.player2.username == username {
            Some(&self.player1)
        } else {
            None
        }
    }

    fn mover(&self) -> &Participant {
        if self.current_turn == self.player1.color {
            &self.player1
        } else {
            &self.player2
        }
    }
}

/// Owns the map of active games. Each game sits behind its own lock, held
/// for the whole read-validate-mutate sequence of a move so that no two
/// concurrent moves can both land on the same move number.
pub struct GameRegistry {
    games: DashMap<Uuid, RwLock<GameSession>>,
    store: Arc<dyn Store>,
    events: Option<Arc<dyn EventSink>>,
    engine: Engine,
}

impl GameRegistry {
    pub fn new(store: Arc<dyn Store>, events: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            games: DashMap::new(),
            store,
            events,
            engine: Engine::new(),
        }
    }

    /// Creates and registers a game. Red is `player1`. Persistence failure
    /// here propagates: without a game row there is nothing to play.
    pub async fn create_game(
        &self,
        player1: Participant,
        player2: Participant,
    ) -> Result<GameSession, GameError> {
        let game_id = Uuid::new_v4();
        let player2_id = (!player2.is_bot).then_some(player2.player_id);
        self.store
            .create_game(game_id, player1.player_id, player2_id, player2.is_bot)
            .await?;

        let session = GameSession {
            game_id,
            player1,
            player2,
            board: Board::new(),
            current_turn: Color::Red,
            status: GameStatus::Active,
            winner: None,
            move_count: 0,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.games.insert(game_id, RwLock::new(session.clone()));

        tracing::info!(
            game_id = %game_id,
            player1 = %session.player1.username,
            player2 = %session.player2.username,
            vs_bot = session.player2.is_bot,
            sockets = ?(session.player1.socket_id, session.player2.socket_id),
            "game created"
        );
        publish_best_effort(
            &self.events,
            GameEvent::GameStarted {
                timestamp: Utc::now(),
                game_id,
                player1: session.player1.username.clone(),
                player2: session.player2.username.clone(),
                is_bot: session.player2.is_bot,
            },
        )
        .await;

        Ok(session)
    }

    pub async fn snapshot(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        let entry = self.games.get(&game_id).ok_or(GameError::GameNotFound)?;
        let game = entry.read().await;
        Ok(game.clone())
    }

    pub async fn apply_move(
        &self,
        game_id: Uuid,
        player_id: i32,
        column: i32,
    ) -> Result<(MovePayload, Option<GameOverPayload>), GameError> {
        let (result, ended) = {
            let entry = self.games.get(&game_id).ok_or(GameError::GameNotFound)?;
            let mut game = entry.write().await;

            if game.status != GameStatus::Active {
                return Err(GameError::GameNotActive);
            }
            let mover = game.mover().clone();
            if mover.player_id != player_id {
                return Err(GameError::NotYourTurn);
            }
            let col = usize::try_from(column).map_err(|_| GameError::InvalidMove)?;
            if !game.board.is_valid_move(col) {
                return Err(GameError::InvalidMove);
            }

            let result = self.advance(&mut game, &mover, col).await?;
            let ended = game.status != GameStatus::Active;
            (result, ended)
        };

        if ended {
            self.games.remove(&game_id);
        }
        Ok(result)
    }

    /// Same flow as [`apply_move`](Self::apply_move), but the search picks
    /// the column. The search runs under the game's lock; only this game
    /// waits on it.
    pub async fn apply_adversary_move(
        &self,
        game_id: Uuid,
    ) -> Result<(MovePayload, Option<GameOverPayload>), GameError> {
        let (result, ended) = {
            let entry = self.games.get(&game_id).ok_or(GameError::GameNotFound)?;
            let mut game = entry.write().await;

            if game.status != GameStatus::Active {
                return Err(GameError::GameNotActive);
            }
            if !game.player2.is_bot {
                return Err(GameError::NotABotGame);
            }
            if game.current_turn != game.player2.color {
                return Err(GameError::NotYourTurn);
            }

            let col = self.engine.best_move(&game.board);
            if !game.board.is_valid_move(col) {
                return Err(GameError::InvalidMove);
            }
            let mover = game.player2.clone();

            let result = self.advance(&mut game, &mover, col).await?;
            let ended = game.status != GameStatus::Active;
            (result, ended)
        };

        if ended {
            self.games.remove(&game_id);
        }
        Ok(result)
    }

    /// Ends an active game in the opponent's favor. Forfeiting a game that
    /// already finished (or never existed) is an error, not a transition.
    pub async fn forfeit(
        &self,
        game_id: Uuid,
        loser_id: i32,
    ) -> Result<GameOverPayload, GameError> {
        let game_over = {
            let entry = self.games.get(&game_id).ok_or(GameError::GameNotFound)?;
            let mut game = entry.write().await;

            if game.status != GameStatus::Active {
                return Err(GameError::GameNotActive);
            }
            let winner = if game.player1.player_id == loser_id {
                game.player2.clone()
            } else if game.player2.player_id == loser_id {
                game.player1.clone()
            } else {
                return Err(GameError::NotInGame);
            };

            self.finalize(&mut game, Some(&winner), GameOverReason::Forfeit)
                .await
        };

        self.games.remove(&game_id);
        Ok(game_over)
    }

    /// Drops the disc and advances the turn machine: count, record,
    /// publish, then win / draw / toggle.
    async fn advance(
        &self,
        game: &mut GameSession,
        mover: &Participant,
        col: usize,
    ) -> Result<(MovePayload, Option<GameOverPayload>), GameError> {
        let row = game
            .board
            .drop_disc(col, mover.color)
            .ok_or(GameError::InvalidMove)?;
        game.move_count += 1;

        if let Err(err) = self
            .store
            .record_move(game.game_id, mover.player_id, col, row, game.move_count)
            .await
        {
            tracing::warn!(game_id = %game.game_id, error = %err, "failed to record move");
        }
        publish_best_effort(
            &self.events,
            GameEvent::MoveMade {
                timestamp: Utc::now(),
                game_id: game.game_id,
                player: mover.username.clone(),
                column: col,
                move_number: game.move_count,
            },
        )
        .await;

        if game.board.check_win(row, col) {
            let game_over = self.finalize(game, Some(mover), GameOverReason::Win).await;
            let payload = MovePayload {
                column: col,
                row,
                color: mover.color,
                next_turn: None,
                board: game.board,
                move_number: game.move_count,
            };
            return Ok((payload, Some(game_over)));
        }
        if game.board.is_full() {
            let game_over = self.finalize(game, None, GameOverReason::Draw).await;
            let payload = MovePayload {
                column: col,
                row,
                color: mover.color,
                next_turn: None,
                board: game.board,
                move_number: game.move_count,
            };
            return Ok((payload, Some(game_over)));
        }

        game.current_turn = game.current_turn.opposite();
        let payload = MovePayload {
            column: col,
            row,
            color: mover.color,
            next_turn: Some(game.current_turn),
            board: game.board,
            move_number: game.move_count,
        };
        Ok((payload, None))
    }

    /// The in-memory transition is authoritative; the store write is
    /// best-effort.
    async fn finalize(
        &self,
        game: &mut GameSession,
        winner: Option<&Participant>,
        reason: GameOverReason,
    ) -> GameOverPayload {
        let completed_at = Utc::now();
        game.completed_at = Some(completed_at);
        game.status = match reason {
            GameOverReason::Win => GameStatus::Completed,
            GameOverReason::Draw => GameStatus::Draw,
            GameOverReason::Forfeit => GameStatus::Forfeited,
        };
        game.winner = winner.map(|p| p.username.clone());
        let duration = (completed_at - game.started_at).num_seconds().max(0) as u64;

        if let Err(err) = self
            .store
            .finalize_game(
                game.game_id,
                winner.map(|p| p.player_id),
                game.status,
                game.move_count,
                game.started_at,
            )
            .await
        {
            tracing::warn!(game_id = %game.game_id, error = %err, "failed to finalize game");
        }
        publish_best_effort(
            &self.events,
            GameEvent::GameCompleted {
                timestamp: Utc::now(),
                game_id: game.game_id,
                winner: game.winner.clone(),
                reason,
                duration_seconds: duration,
                total_moves: game.move_count,
            },
        )
        .await;

        tracing::info!(
            game_id = %game.game_id,
            status = game.status.as_str(),
            winner = game.winner.as_deref().unwrap_or("-"),
            moves = game.move_count,
            "game finished"
        );

        GameOverPayload {
            winner: game.winner.clone(),
            reason,
            board: game.board,
            duration_seconds: duration,
        }
    }
}
