// src/handlers/me.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use crate::{error::AppError, models::identity::Identity, state::AppState};

/// The caller's category scores, total score and rank.
pub async fn get_scores(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let overview = state.coordinator.score_overview(&identity).await?;
    Ok(Json(overview))
}

/// Today's suggested category. 204 when there is nothing to suggest.
pub async fn get_recommendation(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    let recommendation = state
        .recommendations
        .daily_recommendation(&identity, today)
        .await?;

    match recommendation {
        Some(rec) => Ok(Json(rec).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}
