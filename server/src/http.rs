use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::game_manager::AppState;

const LEADERBOARD_LIMIT: i64 = 10;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "connect-four" }))
}

pub async fn leaderboard(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    match state.store.read_leaderboard(LEADERBOARD_LIMIT).await {
        Ok(entries) => Ok(Json(json!({ "leaderboard": entries }))),
        Err(err) => {
            tracing::error!(error = %err, "failed to read leaderboard");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn player_stats(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    match state.store.get_player_by_name(&username).await {
        Ok(Some(player)) => Ok(Json(json!({ "player": player }))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(err) => {
            tracing::error!(error = %err, username = %username, "failed to load player");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
