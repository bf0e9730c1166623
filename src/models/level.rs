// src/models/level.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quiz_levels' table in the database.
///
/// Levels of one category form a chain by consecutive `level_number`:
/// the successor of level N is level N+1 of the same category.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Level {
    pub id: String,
    pub category_id: String,
    pub level_number: i32,
    pub name: String,
    /// 'easy', 'medium' or 'hard'.
    pub difficulty: String,
    pub questions_count: i32,
    pub max_points: i32,
}

impl Level {
    /// Identifier convention used by the bundled catalog: `<category>-<number>`.
    pub fn slug(category_id: &str, level_number: i32) -> String {
        format!("{}-{}", category_id, level_number)
    }
}
