// src/models/recommendation.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'daily_recommendations' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyRecommendation {
    #[serde(skip)]
    pub user_id: Uuid,
    pub category_id: String,
    pub reason: String,
    pub recommendation_date: NaiveDate,
}
