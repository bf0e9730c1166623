// src/handlers/catalog.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        identity::Identity,
        level::Level,
        progress::{LevelScore, ScoreOverview},
    },
    services::Completion,
    state::AppState,
};

/// DTO for `/api/categories/{id}/levels`.
#[derive(Debug, Serialize)]
pub struct CategoryLevels {
    pub category_id: String,
    pub levels: Vec<Level>,
    /// The caller's latest result per level; all `available` when anonymous.
    pub scores: Vec<LevelScore>,
}

/// Lists all categories, ordered by name.
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories = state.content.list_categories().await.map_err(|e| {
        tracing::error!("Failed to fetch categories: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(categories))
}

/// Levels of a category with the caller's scores.
pub async fn list_levels(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let levels = state.content.list_levels(&category_id).await?;
    if levels.is_empty() {
        return Err(AppError::NotFound(format!(
            "Category '{}' has no levels",
            category_id
        )));
    }

    let scores = state
        .coordinator
        .latest_level_scores(&identity, &category_id)
        .await?;

    Ok(Json(CategoryLevels {
        category_id,
        levels,
        scores,
    }))
}

/// Sets up the caller's level rows for a category. Safe to call repeatedly.
pub async fn initialize_progress(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if state.content.list_levels(&category_id).await?.is_empty() {
        return Err(AppError::NotFound(format!(
            "Category '{}' has no levels",
            category_id
        )));
    }

    let overview = match state
        .coordinator
        .initialize_category_progress(&identity, &category_id)
        .await?
    {
        Completion::Applied(overview) => overview,
        Completion::Skipped => ScoreOverview::default(),
    };

    Ok(Json(overview))
}
