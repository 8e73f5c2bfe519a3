use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration, read once at startup from the environment (and a
/// local `.env` file when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub env: String,
    pub database_url: Option<String>,
    pub matchmaking_timeout: Duration,
    pub reconnection_timeout: Duration,
    pub event_brokers: Vec<String>,
    pub event_topic: String,
    pub event_username: String,
    pub event_password: String,
}

impl Config {
    pub fn load() -> Self {
        dotenv::dotenv().ok();

        Self {
            port: env_or("PORT", 8080),
            env: env::var("ENV").unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            matchmaking_timeout: Duration::from_secs(env_or("MATCHMAKING_TIMEOUT", 10)),
            reconnection_timeout: Duration::from_secs(env_or("RECONNECTION_TIMEOUT", 30)),
            event_brokers: env::var("EVENT_BROKERS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|broker| !broker.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            event_topic: env::var("EVENT_TOPIC").unwrap_or_else(|_| "game.events".to_string()),
            event_username: env::var("EVENT_USERNAME").unwrap_or_default(),
            event_password: env::var("EVENT_PASSWORD").unwrap_or_default(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
