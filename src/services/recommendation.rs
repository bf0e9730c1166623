// src/services/recommendation.rs

use std::sync::Arc;

use chrono::NaiveDate;
use rand::seq::IndexedRandom;

use crate::{
    error::QuizError,
    models::{
        category::Category, identity::Identity, progress::CategoryScore,
        recommendation::DailyRecommendation,
    },
    store::{ContentStore, ProgressStore},
};

pub const NEW_CATEGORY_REASON: &str = "Try something new today!";
pub const CONTINUE_REASON: &str = "Continue your progress!";

/// One suggested category per user per day.
#[derive(Clone)]
pub struct RecommendationService {
    content: Arc<dyn ContentStore>,
    progress: Arc<dyn ProgressStore>,
}

impl RecommendationService {
    pub fn new(content: Arc<dyn ContentStore>, progress: Arc<dyn ProgressStore>) -> Self {
        Self { content, progress }
    }

    /// Returns the stored pick for `today`, or makes and stores a new one.
    pub async fn daily_recommendation(
        &self,
        identity: &Identity,
        today: NaiveDate,
    ) -> Result<Option<DailyRecommendation>, QuizError> {
        let user_id = identity.user_id().ok_or(QuizError::IdentityMissing)?;

        if let Some(existing) = self.progress.get_recommendation(user_id, today).await? {
            return Ok(Some(existing));
        }

        let categories = self.content.list_categories().await?;
        let scores = self.progress.list_category_scores(user_id).await?;

        let Some((category_id, reason)) = pick_category(&categories, &scores) else {
            return Ok(None);
        };

        let rec = DailyRecommendation {
            user_id,
            category_id,
            reason: reason.to_string(),
            recommendation_date: today,
        };
        self.progress.save_recommendation(&rec).await?;

        // A concurrent first request may have stored its pick before ours.
        let stored = self
            .progress
            .get_recommendation(user_id, today)
            .await?
            .unwrap_or(rec);
        tracing::debug!("Recommended {} to user {}", stored.category_id, user_id);

        Ok(Some(stored))
    }
}

/// A random unplayed category, else the played one with the fewest levels
/// completed.
pub fn pick_category(
    categories: &[Category],
    scores: &[CategoryScore],
) -> Option<(String, &'static str)> {
    let unplayed: Vec<&Category> = categories
        .iter()
        .filter(|c| !scores.iter().any(|s| s.category_id == c.id))
        .collect();

    if let Some(category) = unplayed.choose(&mut rand::rng()) {
        return Some((category.id.clone(), NEW_CATEGORY_REASON));
    }

    // First minimum wins on ties.
    let lowest = scores.iter().reduce(|min, s| {
        if s.levels_completed < min.levels_completed {
            s
        } else {
            min
        }
    })?;

    categories
        .iter()
        .find(|c| c.id == lowest.category_id)
        .map(|c| (c.id.clone(), CONTINUE_REASON))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::store::{Catalog, MemoryStore};

    fn category(id: &str) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_string(),
            icon: "*".to_string(),
            color: "#000".to_string(),
        }
    }

    fn score(category_id: &str, levels_completed: i32) -> CategoryScore {
        CategoryScore {
            user_id: Uuid::nil(),
            category_id: category_id.to_string(),
            total_score: 0,
            levels_completed,
            last_played_at: None,
        }
    }

    #[test]
    fn test_prefers_unplayed_category() {
        let categories = [category("math"), category("history")];
        let picked = pick_category(&categories, &[score("math", 4)]);
        assert_eq!(picked, Some(("history".to_string(), NEW_CATEGORY_REASON)));
    }

    #[test]
    fn test_falls_back_to_least_progress() {
        let categories = [category("math"), category("history"), category("art")];
        let scores = [score("math", 4), score("history", 1), score("art", 1)];
        assert_eq!(
            pick_category(&categories, &scores),
            Some(("history".to_string(), CONTINUE_REASON))
        );
    }

    #[test]
    fn test_no_categories_no_pick() {
        assert_eq!(pick_category(&[], &[]), None);
    }

    #[tokio::test]
    async fn test_recommendation_is_stable_for_the_day() {
        let store = Arc::new(MemoryStore::new(&Catalog::bundled().unwrap()));
        let service = RecommendationService::new(store.clone(), store.clone());
        let user = Identity::User(Uuid::new_v4());
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let first = service.daily_recommendation(&user, today).await.unwrap().unwrap();
        assert_eq!(first.reason, NEW_CATEGORY_REASON);
        for _ in 0..5 {
            let again = service.daily_recommendation(&user, today).await.unwrap().unwrap();
            assert_eq!(again.category_id, first.category_id);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_requests_agree() {
        for _ in 0..10 {
            let store = Arc::new(MemoryStore::new(&Catalog::bundled().unwrap()));
            let service = RecommendationService::new(store.clone(), store.clone());
            let user = Identity::User(Uuid::new_v4());
            let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let service = service.clone();
                    tokio::spawn(async move { service.daily_recommendation(&user, today).await })
                })
                .collect();

            let mut picks = Vec::new();
            for handle in handles {
                picks.push(handle.await.unwrap().unwrap().unwrap().category_id);
            }
            let stored = store
                .get_recommendation(user.user_id().unwrap(), today)
                .await
                .unwrap()
                .unwrap();
            assert!(picks.iter().all(|p| *p == stored.category_id), "{:?}", picks);
        }
    }

    #[tokio::test]
    async fn test_anonymous_needs_identity() {
        let store = Arc::new(MemoryStore::new(&Catalog::bundled().unwrap()));
        let service = RecommendationService::new(store.clone(), store);
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(
            service.daily_recommendation(&Identity::Anonymous, today).await,
            Err(QuizError::IdentityMissing)
        );
    }
}
