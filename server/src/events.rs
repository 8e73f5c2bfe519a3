use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::GameOverReason;
use thiserror::Error;
use uuid::Uuid;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Transport(String),
}

/// Analytics records emitted at the three lifecycle points of a game.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    #[serde(rename = "GAME_STARTED")]
    GameStarted {
        timestamp: DateTime<Utc>,
        game_id: Uuid,
        player1: String,
        player2: String,
        is_bot: bool,
    },
    #[serde(rename = "MOVE_MADE")]
    MoveMade {
        timestamp: DateTime<Utc>,
        game_id: Uuid,
        player: String,
        column: usize,
        move_number: u32,
    },
    #[serde(rename = "GAME_COMPLETED")]
    GameCompleted {
        timestamp: DateTime<Utc>,
        game_id: Uuid,
        winner: Option<String>,
        reason: GameOverReason,
        duration_seconds: u64,
        total_moves: u32,
    },
}

/// Fire-and-forget publisher for [`GameEvent`] records. Downstream
/// aggregation is a separate deployment; the server never depends on a
/// publish succeeding.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &GameEvent) -> Result<(), SinkError>;
}

/// Writes event records to the structured log, where the deployment's log
/// pipeline can pick them up.
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn publish(&self, event: &GameEvent) -> Result<(), SinkError> {
        let record = serde_json::to_string(event)?;
        tracing::info!(target: "game_events", event = %record, "event published");
        Ok(())
    }
}

/// Publishes with a bounded deadline; failures are logged, never surfaced.
pub async fn publish_best_effort(sink: &Option<Arc<dyn EventSink>>, event: GameEvent) {
    let Some(sink) = sink else { return };
    match tokio::time::timeout(PUBLISH_TIMEOUT, sink.publish(&event)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!(error = %err, "failed to publish event"),
        Err(_) => tracing::error!("event publish timed out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_a_type_discriminator() {
        let event = GameEvent::GameCompleted {
            timestamp: Utc::now(),
            game_id: Uuid::new_v4(),
            winner: Some("alice".into()),
            reason: GameOverReason::Win,
            duration_seconds: 42,
            total_moves: 7,
        };
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "GAME_COMPLETED");
        assert_eq!(value["winner"], "alice");
        assert_eq!(value["reason"], "win");
    }
}
