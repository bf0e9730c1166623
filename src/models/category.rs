// src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quiz_categories' table in the database.
/// Reference data, maintained outside this service.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    /// Slug identifier, e.g. "math".
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
}
