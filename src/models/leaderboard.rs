// src/models/leaderboard.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Shown when a user has no profile display name.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown User";

/// Row joined from `user_total_scores` and `profiles`.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub total_score: i64,
    pub global_rank: Option<i32>,
    pub display_name: Option<String>,
}

/// Aggregated struct for displaying the leaderboard.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub total_score: i64,
    pub global_rank: Option<i32>,
    pub display_name: String,
}

impl From<LeaderboardRow> for LeaderboardEntry {
    fn from(row: LeaderboardRow) -> Self {
        Self {
            user_id: row.user_id,
            total_score: row.total_score,
            global_rank: row.global_rank,
            display_name: row
                .display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string()),
        }
    }
}

/// Where the requesting user sits relative to the leaderboard window.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Standing {
    /// 1-based position inside the window of `out_of` entries.
    Ranked {
        position: usize,
        out_of: usize,
        entry: LeaderboardEntry,
    },
    /// Outside the window (or no score yet).
    NotYetRanked { user_id: Uuid, total_score: i64 },
}

/// DTO for `/api/leaderboard`.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    pub you: Option<Standing>,
}
