use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlayerRecord {
    pub id: i32,
    pub username: String,
    pub games_played: i32,
    pub games_won: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub id: i32,
    pub username: String,
    pub games_won: i32,
    pub games_played: i32,
    pub win_rate: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Active,
    Completed,
    Forfeited,
    Draw,
}

impl GameStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Forfeited => "forfeited",
            Self::Draw => "draw",
        }
    }
}

/// Narrow persistence contract of the session layer. `game_id` is chosen by
/// the caller and passed through.
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_player(&self, username: &str) -> Result<PlayerRecord, StoreError>;

    async fn get_player_by_name(&self, username: &str)
        -> Result<Option<PlayerRecord>, StoreError>;

    async fn create_game(
        &self,
        game_id: Uuid,
        player1_id: i32,
        player2_id: Option<i32>,
        vs_bot: bool,
    ) -> Result<(), StoreError>;

    async fn record_move(
        &self,
        game_id: Uuid,
        player_id: i32,
        column: usize,
        row: usize,
        move_number: u32,
    ) -> Result<(), StoreError>;

    async fn finalize_game(
        &self,
        game_id: Uuid,
        winner_id: Option<i32>,
        status: GameStatus,
        total_moves: u32,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn read_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(25)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in [
            "CREATE TABLE IF NOT EXISTS players (
                id SERIAL PRIMARY KEY,
                username VARCHAR(50) NOT NULL UNIQUE,
                games_played INTEGER NOT NULL DEFAULT 0,
                games_won INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            "CREATE TABLE IF NOT EXISTS games (
                id UUID PRIMARY KEY,
                player1_id INTEGER NOT NULL REFERENCES players(id),
                player2_id INTEGER REFERENCES players(id),
                player2_is_bot BOOLEAN NOT NULL DEFAULT FALSE,
                winner_id INTEGER REFERENCES players(id),
                status VARCHAR(16) NOT NULL,
                duration_seconds INTEGER,
                total_moves INTEGER NOT NULL DEFAULT 0,
                started_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            "CREATE TABLE IF NOT EXISTS game_moves (
                id SERIAL PRIMARY KEY,
                game_id UUID NOT NULL REFERENCES games(id),
                player_id INTEGER NOT NULL REFERENCES players(id),
                column_index INTEGER NOT NULL,
                row_index INTEGER NOT NULL,
                move_number INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            "CREATE OR REPLACE VIEW leaderboard AS
                SELECT id, username, games_won, games_played,
                    CASE WHEN games_played = 0 THEN 0::float8
                         ELSE (games_won::float8 * 100.0 / games_played::float8)
                    END AS win_rate,
                    created_at
                FROM players
                ORDER BY games_won DESC, win_rate DESC",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_player(&self, username: &str) -> Result<PlayerRecord, StoreError> {
        let player = sqlx::query_as::<_, PlayerRecord>(
            "INSERT INTO players (username)
             VALUES ($1)
             ON CONFLICT (username) DO UPDATE SET updated_at = NOW()
             RETURNING id, username, games_played, games_won, created_at, updated_at",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(player)
    }

    async fn get_player_by_name(
        &self,
        username: &str,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        let player = sqlx::query_as::<_, PlayerRecord>(
            "SELECT id, username, games_played, games_won, created_at, updated_at
             FROM players WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(player)
    }

    async fn create_game(
        &self,
        game_id: Uuid,
        player1_id: i32,
        player2_id: Option<i32>,
        vs_bot: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO games (id, player1_id, player2_id, player2_is_bot, status, started_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(game_id)
        .bind(player1_id)
        .bind(player2_id)
        .bind(vs_bot)
        .bind(GameStatus::Active.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_move(
        &self,
        game_id: Uuid,
        player_id: i32,
        column: usize,
        row: usize,
        move_number: u32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO game_moves (game_id, player_id, column_index, row_index, move_number)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(game_id)
        .bind(player_id)
        .bind(column as i32)
        .bind(row as i32)
        .bind(move_number as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize_game(
        &self,
        game_id: Uuid,
        winner_id: Option<i32>,
        status: GameStatus,
        total_moves: u32,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let duration = (Utc::now() - started_at).num_seconds().max(0) as i32;
        sqlx::query(
            "UPDATE games
             SET winner_id = $1, status = $2, total_moves = $3,
                 duration_seconds = $4, completed_at = NOW()
             WHERE id = $5",
        )
        .bind(winner_id)
        .bind(status.as_str())
        .bind(total_moves as i32)
        .bind(duration)
        .bind(game_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "UPDATE players
             SET games_played = games_played + 1, updated_at = NOW()
             WHERE id IN (
                 SELECT player1_id FROM games WHERE id = $1
                 UNION
                 SELECT player2_id FROM games WHERE id = $1 AND player2_id IS NOT NULL
             )",
        )
        .bind(game_id)
        .execute(&self.pool)
        .await?;

        if let Some(winner_id) = winner_id {
            sqlx::query(
                "UPDATE players SET games_won = games_won + 1, updated_at = NOW() WHERE id = $1",
            )
            .bind(winner_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn read_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT id, username, games_won, games_played, win_rate, created_at
             FROM leaderboard LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

/// Store used when no database is configured, and by the test suite. Keeps
/// just enough state to honor the contract.
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI32,
    players: DashMap<String, PlayerRecord>,
    games: DashMap<Uuid, MemoryGame>,
    moves: DashMap<Uuid, Vec<RecordedMove>>,
}

#[derive(Debug, Clone)]
struct MemoryGame {
    player1_id: i32,
    player2_id: Option<i32>,
    winner_id: Option<i32>,
    status: GameStatus,
}

#[derive(Debug, Clone)]
pub struct RecordedMove {
    pub player_id: i32,
    pub column: usize,
    pub row: usize,
    pub move_number: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_counters(&self, game: &MemoryGame) {
        let mut ids = vec![game.player1_id];
        ids.extend(game.player2_id);
        for mut player in self.players.iter_mut() {
            if ids.contains(&player.id) {
                player.games_played += 1;
                if game.winner_id == Some(player.id) {
                    player.games_won += 1;
                }
            }
        }
    }

    #[cfg(test)]
    pub fn recorded_moves(&self, game_id: Uuid) -> Vec<RecordedMove> {
        self.moves
            .get(&game_id)
            .map(|moves| moves.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_player(&self, username: &str) -> Result<PlayerRecord, StoreError> {
        let record = self
            .players
            .entry(username.to_owned())
            .or_insert_with(|| {
                let now = Utc::now();
                PlayerRecord {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                    username: username.to_owned(),
                    games_played: 0,
                    games_won: 0,
                    created_at: now,
                    updated_at: now,
                }
            })
            .clone();
        Ok(record)
    }

    async fn get_player_by_name(
        &self,
        username: &str,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        Ok(self.players.get(username).map(|record| record.clone()))
    }

    async fn create_game(
        &self,
        game_id: Uuid,
        player1_id: i32,
        player2_id: Option<i32>,
        _vs_bot: bool,
    ) -> Result<(), StoreError> {
        self.games.insert(
            game_id,
            MemoryGame {
                player1_id,
                player2_id,
                winner_id: None,
                status: GameStatus::Active,
            },
        );
        Ok(())
    }

    async fn record_move(
        &self,
        game_id: Uuid,
        player_id: i32,
        column: usize,
        row: usize,
        move_number: u32,
    ) -> Result<(), StoreError> {
        self.moves.entry(game_id).or_default().push(RecordedMove {
            player_id,
            column,
            row,
            move_number,
        });
        Ok(())
    }

    async fn finalize_game(
        &self,
        game_id: Uuid,
        winner_id: Option<i32>,
        status: GameStatus,
        _total_moves: u32,
        _started_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(mut game) = self.games.get_mut(&game_id) {
            game.winner_id = winner_id;
            game.status = status;
            let snapshot = game.clone();
            drop(game);
            self.bump_counters(&snapshot);
        }
        Ok(())
    }

    async fn read_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|player| LeaderboardEntry {
                id: player.id,
                username: player.username.clone(),
                games_won: player.games_won,
                games_played: player.games_played,
                win_rate: if player.games_played == 0 {
                    0.0
                } else {
                    f64::from(player.games_won) * 100.0 / f64::from(player.games_played)
                },
                created_at: player.created_at,
            })
            .collect();
        entries.sort_by(|a, b| b.games_won.cmp(&a.games_won));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}
