// src/handlers/mod.rs

pub mod catalog;
pub mod leaderboard;
pub mod me;
pub mod quiz;

use axum::{Json, response::IntoResponse};
use serde_json::json;

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
