use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc};

use config::Config;
use events::{EventSink, LogSink};
use game_manager::AppState;
use store::{MemoryStore, PgStore, Store};
use ws::ws_handler;

mod config;
mod error;
mod events;
mod game_manager;
mod http;
mod store;
mod ws;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    tracing::info!(env = %config.env, port = config.port, "starting connect-four server");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .expect("Failed to connect to database");
            store
                .ensure_schema()
                .await
                .expect("Failed to initialize database schema");
            tracing::info!("database connected");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let events: Option<Arc<dyn EventSink>> = if config.event_brokers.is_empty() {
        tracing::info!("event stream disabled (no brokers configured)");
        None
    } else {
        tracing::info!(
            brokers = ?config.event_brokers,
            topic = %config.event_topic,
            auth = !(config.event_username.is_empty() || config.event_password.is_empty()),
            "event stream enabled"
        );
        Some(Arc::new(LogSink))
    };

    let port = config.port;
    let state = Arc::new(AppState::new(config, store, events));

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(http::health))
        .route("/api/leaderboard", get(http::leaderboard))
        .route("/api/player/:username", get(http::player_stats))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
