// src/store/mod.rs

//! Persistence seams: read-only content and per-user progress.

pub mod catalog;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{
        category::Category,
        leaderboard::LeaderboardRow,
        level::Level,
        progress::{CategoryScore, LevelProgress, LevelProgressWrite, ReplayPolicy, TotalScore},
        recommendation::DailyRecommendation,
    },
};

pub use catalog::Catalog;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Categories and levels.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Levels of a category ordered by `level_number` ascending.
    async fn list_levels(&self, category_id: &str) -> Result<Vec<Level>, StoreError>;

    async fn get_level(&self, level_id: &str) -> Result<Option<Level>, StoreError>;

    async fn find_level_by_number(
        &self,
        category_id: &str,
        level_number: i32,
    ) -> Result<Option<Level>, StoreError>;
}

/// Every write a completion performs, applied in one transaction by
/// [`ProgressStore::apply_completion`].
#[derive(Debug, Clone)]
pub struct CompletionPlan {
    pub category_id: String,
    /// Result row for the played level, if the attempt had one.
    pub progress: Option<LevelProgressWrite>,
    pub replay_policy: ReplayPolicy,
    /// Level to create as `current` or promote from `locked`.
    pub unlock: Option<String>,
    /// Points added to the category and total aggregates.
    pub accumulate: Option<i64>,
    /// Level ids of the category in order, used when the category row is
    /// initialized inside the transaction.
    pub category_levels: Vec<String>,
    pub played_at: DateTime<Utc>,
}

/// Per-user progress, aggregates and leaderboard reads.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// All of the user's level rows belonging to `category_id`.
    async fn get_level_progress(
        &self,
        user_id: Uuid,
        category_id: &str,
    ) -> Result<Vec<LevelProgress>, StoreError>;

    async fn get_level_progress_for_level(
        &self,
        user_id: Uuid,
        level_id: &str,
    ) -> Result<Option<LevelProgress>, StoreError>;

    /// Keyed (user, level) upsert. Never moves a status backwards; under
    /// [`ReplayPolicy::BestScore`] a completed row is only replaced by a higher score.
    async fn upsert_level_progress(
        &self,
        user_id: Uuid,
        write: &LevelProgressWrite,
        policy: ReplayPolicy,
    ) -> Result<(), StoreError>;

    /// Inserts the row unless one exists. Returns whether it was inserted.
    async fn insert_level_progress_if_absent(
        &self,
        user_id: Uuid,
        write: &LevelProgressWrite,
    ) -> Result<bool, StoreError>;

    /// `locked` → `current`. Returns whether a row changed.
    async fn promote_locked_level(&self, user_id: Uuid, level_id: &str) -> Result<bool, StoreError>;

    /// Creates the category aggregate row and level rows (first level
    /// `current`, the rest `locked`) where missing.
    async fn initialize_category_progress(
        &self,
        user_id: Uuid,
        category_id: &str,
        level_ids: &[String],
    ) -> Result<(), StoreError>;

    async fn get_category_score(
        &self,
        user_id: Uuid,
        category_id: &str,
    ) -> Result<Option<CategoryScore>, StoreError>;

    async fn list_category_scores(&self, user_id: Uuid) -> Result<Vec<CategoryScore>, StoreError>;

    async fn upsert_category_score(&self, score: &CategoryScore) -> Result<(), StoreError>;

    async fn get_total_score(&self, user_id: Uuid) -> Result<Option<TotalScore>, StoreError>;

    async fn upsert_total_score(&self, user_id: Uuid, total_score: i64) -> Result<(), StoreError>;

    /// Ordered by total score descending, then stored rank ascending.
    async fn fetch_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardRow>, StoreError>;

    /// Applies a whole completion atomically; aggregates are incremented in place.
    async fn apply_completion(&self, user_id: Uuid, plan: &CompletionPlan) -> Result<(), StoreError>;

    async fn get_recommendation(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyRecommendation>, StoreError>;

    async fn save_recommendation(&self, rec: &DailyRecommendation) -> Result<(), StoreError>;
}
