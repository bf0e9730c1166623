// src/handlers/leaderboard.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{error::AppError, models::identity::Identity, state::AppState};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// Top players by total score, plus where the caller stands.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let response = state
        .leaderboard
        .leaderboard_for(&identity, query.limit)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch leaderboard: {}", e);
            AppError::from(e)
        })?;

    Ok(Json(response))
}
