use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::GameError;
use crate::store::{PlayerRecord, Store};

#[derive(Debug, Clone)]
pub struct WaitingEntry {
    pub username: String,
    pub player_id: i32,
    pub socket_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

pub enum JoinOutcome {
    /// The head of the queue was waiting: it plays red, the new arrival
    /// yellow.
    Paired { red: WaitingEntry, yellow: WaitingEntry },
    Queued,
}

/// FIFO wait queue. Pairing is strictly head-of-line: whoever waited
/// longest plays the next arrival.
pub struct Matchmaker {
    queue: Mutex<VecDeque<WaitingEntry>>,
    store: Arc<dyn Store>,
}

impl Matchmaker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            store,
        }
    }

    pub async fn join(&self, username: &str, socket_id: Uuid) -> Result<JoinOutcome, GameError> {
        let mut queue = self.queue.lock().await;
        if queue.iter().any(|entry| entry.username == username) {
            return Err(GameError::AlreadyInQueue);
        }

        let player = match self.store.get_player_by_name(username).await? {
            Some(player) => player,
            None => self.store.upsert_player(username).await?,
        };
        let entry = WaitingEntry {
            username: username.to_owned(),
            player_id: player.id,
            socket_id,
            joined_at: Utc::now(),
        };

        if let Some(head) = queue.pop_front() {
            tracing::info!(
                player1 = %head.username,
                player2 = %entry.username,
                waited_ms = (Utc::now() - head.joined_at).num_milliseconds(),
                "players matched"
            );
            Ok(JoinOutcome::Paired {
                red: head,
                yellow: entry,
            })
        } else {
            tracing::info!(username = %username, "player joined matchmaking queue");
            queue.push_back(entry);
            Ok(JoinOutcome::Queued)
        }
    }

    /// Removes and returns the entry if the player is still waiting. This
    /// is the timeout's cancellation check: a player who was paired or who
    /// left is simply no longer here.
    pub async fn take_if_waiting(&self, username: &str) -> Option<WaitingEntry> {
        let mut queue = self.queue.lock().await;
        let position = queue.iter().position(|entry| entry.username == username)?;
        queue.remove(position)
    }

    pub async fn leave(&self, username: &str) {
        let mut queue = self.queue.lock().await;
        if let Some(position) = queue.iter().position(|entry| entry.username == username) {
            queue.remove(position);
            tracing::info!(username = %username, "player left matchmaking queue");
        }
    }

    /// The adversary gets its own uniquely-named player row so finished bot
    /// games can still record a winner id.
    pub async fn register_adversary(&self) -> Result<PlayerRecord, GameError> {
        let name = format!("Bot_{}", Utc::now().format("%Y%m%d%H%M%S%3f"));
        Ok(self.store.upsert_player(&name).await?)
    }
}
