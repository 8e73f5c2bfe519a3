use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// One record per participant whose socket dropped while their game was
/// active. Removed on reconnect, or by the forfeit timer.
#[derive(Debug, Clone)]
pub struct DisconnectRecord {
    pub player_id: i32,
    pub username: String,
    pub game_id: Uuid,
    pub disconnected_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ReconnectTracker {
    disconnected: DashMap<String, DisconnectRecord>,
}

impl ReconnectTracker {
    pub fn track(&self, record: DisconnectRecord) {
        tracing::info!(
            username = %record.username,
            game_id = %record.game_id,
            "player disconnected mid-game"
        );
        self.disconnected.insert(record.username.clone(), record);
    }

    pub fn peek(&self, username: &str) -> Option<DisconnectRecord> {
        self.disconnected.get(username).map(|record| record.clone())
    }

    /// Removes the record. The forfeit timer and the reconnect path both
    /// race through here; whoever wins decides the game's fate.
    pub fn take(&self, username: &str) -> Option<DisconnectRecord> {
        self.disconnected.remove(username).map(|(_, record)| record)
    }
}
