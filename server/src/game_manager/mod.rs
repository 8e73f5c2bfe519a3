use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use shared::ServerMessage;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::Config;
use crate::events::EventSink;
use crate::store::Store;

mod gateway;
pub mod matchmaker;
pub mod reconnect;
pub mod registry;

pub use gateway::error_message;
pub use matchmaker::{JoinOutcome, Matchmaker, WaitingEntry};
pub use reconnect::{DisconnectRecord, ReconnectTracker};
pub use registry::{GameRegistry, GameSession, Participant};

pub type Tx = mpsc::UnboundedSender<ServerMessage>;

pub struct Connection {
    pub tx: Tx,
    pub socket_id: Uuid,
    pub last_msg_at: Instant,
}

/// Shared state behind every socket: the connection and player-game maps
/// the gateway owns, plus the matchmaker, registry and disconnect tracker.
pub struct AppState {
    pub config: Config,
    pub connections: DashMap<String, Connection>,
    pub player_games: DashMap<String, Uuid>,
    pub registry: GameRegistry,
    pub matchmaker: Matchmaker,
    pub reconnects: ReconnectTracker,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>, events: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            config,
            connections: DashMap::new(),
            player_games: DashMap::new(),
            registry: GameRegistry::new(Arc::clone(&store), events),
            matchmaker: Matchmaker::new(Arc::clone(&store)),
            reconnects: ReconnectTracker::default(),
            store,
        }
    }

    pub fn bind(&self, username: &str, tx: Tx, socket_id: Uuid) {
        tracing::debug!(username = %username, socket_id = %socket_id, "socket bound");
        self.connections.insert(
            username.to_owned(),
            Connection {
                tx,
                socket_id,
                last_msg_at: Instant::now(),
            },
        );
    }

    /// Best-effort fan-out: an absent or closed socket just drops the
    /// message.
    pub fn send_to(&self, username: &str, msg: ServerMessage) {
        if let Some(conn) = self.connections.get(username) {
            let _ = conn.tx.send(msg);
        }
    }

    pub fn check_rate_limit(&self, username: &str) -> bool {
        if let Some(mut conn) = self.connections.get_mut(username) {
            let now = Instant::now();
            if now.duration_since(conn.last_msg_at).as_secs_f32() < 0.1 {
                // Allow max 10 messages per second
                return false;
            }
            conn.last_msg_at = now;
            true
        } else {
            false
        }
    }
}
