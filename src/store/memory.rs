// src/store/memory.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Catalog, CompletionPlan, ContentStore, ProgressStore};
use crate::{
    error::StoreError,
    models::{
        category::Category,
        leaderboard::LeaderboardRow,
        level::Level,
        progress::{
            CategoryScore, LevelProgress, LevelProgressWrite, LevelStatus, ReplayPolicy, TotalScore,
        },
        recommendation::DailyRecommendation,
    },
};

/// Unlimited writes.
const NO_WRITE_LIMIT: i64 = -1;

#[derive(Default)]
struct Inner {
    categories: Vec<Category>,
    levels: Vec<Level>,
    progress: HashMap<(Uuid, String), LevelProgress>,
    category_scores: HashMap<(Uuid, String), CategoryScore>,
    totals: HashMap<Uuid, TotalScore>,
    profiles: HashMap<Uuid, String>,
    recommendations: HashMap<(Uuid, NaiveDate), DailyRecommendation>,
}

/// Process-local store backing demo mode and the test suite.
///
/// A single lock guards all tables, so `apply_completion` is atomic.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    write_budget: AtomicI64,
}

impl MemoryStore {
    pub fn new(catalog: &Catalog) -> Self {
        let mut levels = catalog.levels.clone();
        levels.sort_by(|a, b| {
            a.category_id
                .cmp(&b.category_id)
                .then(a.level_number.cmp(&b.level_number))
        });

        Self {
            inner: RwLock::new(Inner {
                categories: catalog.categories.clone(),
                levels,
                ..Inner::default()
            }),
            write_budget: AtomicI64::new(NO_WRITE_LIMIT),
        }
    }

    pub async fn set_display_name(&self, user_id: Uuid, name: &str) {
        self.inner
            .write()
            .await
            .profiles
            .insert(user_id, name.to_string());
    }

    /// Ranks are assigned outside the service; this stands in for that job.
    pub async fn set_global_rank(&self, user_id: Uuid, rank: i32) {
        let mut inner = self.inner.write().await;
        let total = inner.totals.entry(user_id).or_insert(TotalScore {
            user_id,
            total_score: 0,
            global_rank: None,
        });
        total.global_rank = Some(rank);
    }

    /// Lets the next `writes` write calls succeed, then fails every write.
    /// `None` removes the limit.
    pub fn set_write_budget(&self, writes: Option<usize>) {
        let value = writes.map(|w| w as i64).unwrap_or(NO_WRITE_LIMIT);
        self.write_budget.store(value, Ordering::SeqCst);
    }

    fn take_write(&self) -> Result<(), StoreError> {
        self.write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| match budget {
                NO_WRITE_LIMIT => Some(budget),
                0 => None,
                n => Some(n - 1),
            })
            .map(|_| ())
            .map_err(|_| StoreError::Unavailable("write rejected".to_string()))
    }
}

impl Inner {
    fn level(&self, level_id: &str) -> Option<&Level> {
        self.levels.iter().find(|l| l.id == level_id)
    }

    fn upsert_progress(&mut self, user_id: Uuid, write: &LevelProgressWrite, policy: ReplayPolicy) {
        let key = (user_id, write.level_id.clone());
        match self.progress.get_mut(&key) {
            None => {
                self.progress.insert(key, write.clone().into_progress(user_id));
            }
            Some(existing) => {
                if !policy.replaces(existing, write) {
                    return;
                }
                let status = existing.status.max(write.status);
                *existing = write.clone().into_progress(user_id);
                existing.status = status;
            }
        }
    }

    fn insert_progress_if_absent(&mut self, user_id: Uuid, write: &LevelProgressWrite) -> bool {
        let key = (user_id, write.level_id.clone());
        if self.progress.contains_key(&key) {
            return false;
        }
        self.progress.insert(key, write.clone().into_progress(user_id));
        true
    }

    fn promote_locked(&mut self, user_id: Uuid, level_id: &str) -> bool {
        match self.progress.get_mut(&(user_id, level_id.to_string())) {
            Some(row) if row.status == LevelStatus::Locked => {
                row.status = LevelStatus::Current;
                true
            }
            _ => false,
        }
    }

    fn initialize_category(&mut self, user_id: Uuid, category_id: &str, level_ids: &[String]) {
        self.category_scores
            .entry((user_id, category_id.to_string()))
            .or_insert_with(|| CategoryScore {
                user_id,
                category_id: category_id.to_string(),
                total_score: 0,
                levels_completed: 0,
                last_played_at: None,
            });

        for (idx, level_id) in level_ids.iter().enumerate() {
            let status = if idx == 0 {
                LevelStatus::Current
            } else {
                LevelStatus::Locked
            };
            self.insert_progress_if_absent(user_id, &LevelProgressWrite::empty(level_id, status));
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.inner.read().await.categories.clone())
    }

    async fn list_levels(&self, category_id: &str) -> Result<Vec<Level>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .levels
            .iter()
            .filter(|l| l.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn get_level(&self, level_id: &str) -> Result<Option<Level>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .levels
            .iter()
            .find(|l| l.id == level_id)
            .cloned())
    }

    async fn find_level_by_number(
        &self,
        category_id: &str,
        level_number: i32,
    ) -> Result<Option<Level>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .levels
            .iter()
            .find(|l| l.category_id == category_id && l.level_number == level_number)
            .cloned())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_level_progress(
        &self,
        user_id: Uuid,
        category_id: &str,
    ) -> Result<Vec<LevelProgress>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<(i32, LevelProgress)> = inner
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                let level = inner.level(&p.level_id)?;
                (level.category_id == category_id).then(|| (level.level_number, p.clone()))
            })
            .collect();
        rows.sort_by_key(|(number, _)| *number);
        Ok(rows.into_iter().map(|(_, p)| p).collect())
    }

    async fn get_level_progress_for_level(
        &self,
        user_id: Uuid,
        level_id: &str,
    ) -> Result<Option<LevelProgress>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .progress
            .get(&(user_id, level_id.to_string()))
            .cloned())
    }

    async fn upsert_level_progress(
        &self,
        user_id: Uuid,
        write: &LevelProgressWrite,
        policy: ReplayPolicy,
    ) -> Result<(), StoreError> {
        self.take_write()?;
        self.inner
            .write()
            .await
            .upsert_progress(user_id, write, policy);
        Ok(())
    }

    async fn insert_level_progress_if_absent(
        &self,
        user_id: Uuid,
        write: &LevelProgressWrite,
    ) -> Result<bool, StoreError> {
        self.take_write()?;
        Ok(self
            .inner
            .write()
            .await
            .insert_progress_if_absent(user_id, write))
    }

    async fn promote_locked_level(&self, user_id: Uuid, level_id: &str) -> Result<bool, StoreError> {
        self.take_write()?;
        Ok(self.inner.write().await.promote_locked(user_id, level_id))
    }

    async fn initialize_category_progress(
        &self,
        user_id: Uuid,
        category_id: &str,
        level_ids: &[String],
    ) -> Result<(), StoreError> {
        self.take_write()?;
        self.inner
            .write()
            .await
            .initialize_category(user_id, category_id, level_ids);
        Ok(())
    }

    async fn get_category_score(
        &self,
        user_id: Uuid,
        category_id: &str,
    ) -> Result<Option<CategoryScore>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .category_scores
            .get(&(user_id, category_id.to_string()))
            .cloned())
    }

    async fn list_category_scores(&self, user_id: Uuid) -> Result<Vec<CategoryScore>, StoreError> {
        let mut scores: Vec<CategoryScore> = self
            .inner
            .read()
            .await
            .category_scores
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        scores.sort_by(|a, b| a.category_id.cmp(&b.category_id));
        Ok(scores)
    }

    async fn upsert_category_score(&self, score: &CategoryScore) -> Result<(), StoreError> {
        self.take_write()?;
        self.inner
            .write()
            .await
            .category_scores
            .insert((score.user_id, score.category_id.clone()), score.clone());
        Ok(())
    }

    async fn get_total_score(&self, user_id: Uuid) -> Result<Option<TotalScore>, StoreError> {
        Ok(self.inner.read().await.totals.get(&user_id).cloned())
    }

    async fn upsert_total_score(&self, user_id: Uuid, total_score: i64) -> Result<(), StoreError> {
        self.take_write()?;
        let mut inner = self.inner.write().await;
        let row = inner.totals.entry(user_id).or_insert(TotalScore {
            user_id,
            total_score: 0,
            global_rank: None,
        });
        row.total_score = total_score;
        Ok(())
    }

    async fn fetch_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardRow>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<LeaderboardRow> = inner
            .totals
            .values()
            .map(|t| LeaderboardRow {
                user_id: t.user_id,
                total_score: t.total_score,
                global_rank: t.global_rank,
                display_name: inner.profiles.get(&t.user_id).cloned(),
            })
            .collect();

        // Score descending, then stored rank ascending with unranked rows last.
        rows.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| match (a.global_rank, b.global_rank) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn apply_completion(&self, user_id: Uuid, plan: &CompletionPlan) -> Result<(), StoreError> {
        self.take_write()?;
        let mut inner = self.inner.write().await;

        if let Some(write) = &plan.progress {
            inner.upsert_progress(user_id, write, plan.replay_policy);
        }

        if let Some(next) = &plan.unlock {
            let created = inner
                .insert_progress_if_absent(user_id, &LevelProgressWrite::empty(next, LevelStatus::Current));
            if !created {
                inner.promote_locked(user_id, next);
            }
        }

        if let Some(points) = plan.accumulate {
            let key = (user_id, plan.category_id.clone());
            if !inner.category_scores.contains_key(&key) {
                inner.initialize_category(user_id, &plan.category_id, &plan.category_levels);
            }
            if let Some(row) = inner.category_scores.get_mut(&key) {
                row.total_score += points;
                row.levels_completed += 1;
                row.last_played_at = Some(plan.played_at);
            }

            let total = inner.totals.entry(user_id).or_insert(TotalScore {
                user_id,
                total_score: 0,
                global_rank: None,
            });
            total.total_score += points;
        }

        Ok(())
    }

    async fn get_recommendation(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyRecommendation>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .recommendations
            .get(&(user_id, date))
            .cloned())
    }

    async fn save_recommendation(&self, rec: &DailyRecommendation) -> Result<(), StoreError> {
        self.take_write()?;
        self.inner
            .write()
            .await
            .recommendations
            .entry((rec.user_id, rec.recommendation_date))
            .or_insert_with(|| rec.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store() -> MemoryStore {
        MemoryStore::new(&Catalog::bundled().unwrap())
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = store();
        let user = Uuid::new_v4();
        let write = LevelProgressWrite::completed("math-1", 80, 5, 4, 5, Utc::now());

        store
            .upsert_level_progress(user, &write, ReplayPolicy::LastWrite)
            .await
            .unwrap();
        let first = store.get_level_progress_for_level(user, "math-1").await.unwrap();
        store
            .upsert_level_progress(user, &write, ReplayPolicy::LastWrite)
            .await
            .unwrap();
        let second = store.get_level_progress_for_level(user, "math-1").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_upsert_never_regresses_status() {
        let store = store();
        let user = Uuid::new_v4();
        let done = LevelProgressWrite::completed("math-1", 80, 5, 4, 5, Utc::now());
        store
            .upsert_level_progress(user, &done, ReplayPolicy::LastWrite)
            .await
            .unwrap();
        store
            .upsert_level_progress(
                user,
                &LevelProgressWrite::empty("math-1", LevelStatus::Locked),
                ReplayPolicy::LastWrite,
            )
            .await
            .unwrap();

        let row = store
            .get_level_progress_for_level(user, "math-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, LevelStatus::Completed);
    }

    #[tokio::test]
    async fn test_initialize_creates_first_current_rest_locked() {
        let store = store();
        let user = Uuid::new_v4();
        let ids: Vec<String> = vec!["math-1".into(), "math-2".into(), "math-3".into()];
        store
            .initialize_category_progress(user, "math", &ids)
            .await
            .unwrap();

        let rows = store.get_level_progress(user, "math").await.unwrap();
        let statuses: Vec<LevelStatus> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![LevelStatus::Current, LevelStatus::Locked, LevelStatus::Locked]
        );
        let score = store.get_category_score(user, "math").await.unwrap().unwrap();
        assert_eq!(score.total_score, 0);
    }

    #[tokio::test]
    async fn test_write_budget_rejects_writes() {
        let store = store();
        store.set_write_budget(Some(1));
        let user = Uuid::new_v4();
        assert!(store.upsert_total_score(user, 10).await.is_ok());
        assert!(store.upsert_total_score(user, 20).await.is_err());
        store.set_write_budget(None);
        assert!(store.upsert_total_score(user, 30).await.is_ok());
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_score_then_rank() {
        let store = store();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.upsert_total_score(a, 100).await.unwrap();
        store.upsert_total_score(b, 300).await.unwrap();
        store.upsert_total_score(c, 100).await.unwrap();
        store.set_global_rank(c, 2).await;
        store.set_global_rank(a, 3).await;

        let rows = store.fetch_leaderboard(10).await.unwrap();
        let order: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
        assert_eq!(order, vec![b, c, a]);
    }
}
