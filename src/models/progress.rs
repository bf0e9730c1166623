// src/models/progress.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::QuizError;

/// Status of a user's progress on one level.
///
/// Ordered: a stored status only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelStatus {
    Locked,
    Current,
    Completed,
}

impl LevelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelStatus::Locked => "locked",
            LevelStatus::Current => "current",
            LevelStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for LevelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LevelStatus {
    type Error = QuizError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "locked" => Ok(LevelStatus::Locked),
            "current" => Ok(LevelStatus::Current),
            "completed" => Ok(LevelStatus::Completed),
            other => Err(QuizError::PersistenceFailure(format!(
                "unknown level status '{}'",
                other
            ))),
        }
    }
}

/// Represents the 'user_level_progress' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelProgress {
    pub user_id: Uuid,
    pub level_id: String,
    #[sqlx(try_from = "String")]
    pub status: LevelStatus,
    /// Points of the stored attempt.
    pub score: i32,
    pub max_score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Values written by a keyed (user, level) upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelProgressWrite {
    pub level_id: String,
    pub status: LevelStatus,
    pub score: i32,
    pub max_score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LevelProgressWrite {
    /// A finished attempt on `level_id`.
    pub fn completed(
        level_id: &str,
        score: i32,
        max_score: i32,
        correct_answers: i32,
        total_questions: i32,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            level_id: level_id.to_string(),
            status: LevelStatus::Completed,
            score,
            max_score,
            correct_answers,
            total_questions,
            completed_at: Some(completed_at),
        }
    }

    /// An empty row with the given status (unlocking and initialization).
    pub fn empty(level_id: &str, status: LevelStatus) -> Self {
        Self {
            level_id: level_id.to_string(),
            status,
            score: 0,
            max_score: 0,
            correct_answers: 0,
            total_questions: 0,
            completed_at: None,
        }
    }

    pub fn into_progress(self, user_id: Uuid) -> LevelProgress {
        LevelProgress {
            user_id,
            level_id: self.level_id,
            status: self.status,
            score: self.score,
            max_score: self.max_score,
            correct_answers: self.correct_answers,
            total_questions: self.total_questions,
            completed_at: self.completed_at,
        }
    }
}

/// How a replayed level's stored result is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    /// Replaying overwrites the stored result.
    #[default]
    LastWrite,
    /// The stored result is replaced only by a strictly higher score.
    BestScore,
}

impl ReplayPolicy {
    /// Whether `incoming` should replace `existing` under this policy.
    pub fn replaces(&self, existing: &LevelProgress, incoming: &LevelProgressWrite) -> bool {
        match self {
            ReplayPolicy::LastWrite => true,
            ReplayPolicy::BestScore => {
                existing.status != LevelStatus::Completed || incoming.score > existing.score
            }
        }
    }
}

/// Represents the 'user_category_scores' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryScore {
    pub user_id: Uuid,
    pub category_id: String,
    pub total_score: i64,
    pub levels_completed: i32,
    pub last_played_at: Option<DateTime<Utc>>,
}

/// Represents the 'user_total_scores' table in the database.
/// `global_rank` is maintained outside this service.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotalScore {
    pub user_id: Uuid,
    pub total_score: i64,
    pub global_rank: Option<i32>,
}

/// Status shown for a level on the category page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelDisplayStatus {
    Available,
    Current,
    Completed,
}

/// A level joined with the user's latest result on it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LevelScore {
    pub level_id: String,
    pub level_number: i32,
    pub name: String,
    pub points: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub status: LevelDisplayStatus,
}

/// Aggregates of one user, returned after completions and by `/api/me/scores`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct ScoreOverview {
    pub category_scores: Vec<CategoryScore>,
    pub total_score: i64,
    pub global_rank: Option<i32>,
}
