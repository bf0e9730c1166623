// src/services/leaderboard.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::QuizError,
    models::{
        identity::Identity,
        leaderboard::{LeaderboardEntry, LeaderboardResponse, Standing},
    },
    store::ProgressStore,
};

/// Largest window a caller may ask for.
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Read-only ranking over total scores.
#[derive(Clone)]
pub struct LeaderboardAggregator {
    progress: Arc<dyn ProgressStore>,
    default_limit: i64,
}

impl LeaderboardAggregator {
    pub fn new(progress: Arc<dyn ProgressStore>, default_limit: i64) -> Self {
        Self {
            progress,
            default_limit,
        }
    }

    /// Top `limit` entries, highest total first. Ties keep the stored rank
    /// order, unranked last.
    pub async fn fetch_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, QuizError> {
        let rows = self.progress.fetch_leaderboard(limit).await?;
        Ok(rows.into_iter().map(LeaderboardEntry::from).collect())
    }

    /// Where `identity` sits relative to `entries`. `None` for anonymous
    /// callers.
    pub async fn standing(
        &self,
        identity: &Identity,
        entries: &[LeaderboardEntry],
    ) -> Result<Option<Standing>, QuizError> {
        let Some(user_id) = identity.user_id() else {
            return Ok(None);
        };

        if let Some((position, out_of)) = position_in(entries, user_id) {
            return Ok(Some(Standing::Ranked {
                position,
                out_of,
                entry: entries[position - 1].clone(),
            }));
        }

        let total_score = self
            .progress
            .get_total_score(user_id)
            .await?
            .map(|t| t.total_score)
            .unwrap_or(0);

        Ok(Some(Standing::NotYetRanked {
            user_id,
            total_score,
        }))
    }

    /// Window plus the caller's standing. `limit` falls back to the
    /// configured default and is clamped to `1..=MAX_LEADERBOARD_LIMIT`.
    pub async fn leaderboard_for(
        &self,
        identity: &Identity,
        limit: Option<i64>,
    ) -> Result<LeaderboardResponse, QuizError> {
        let limit = limit
            .unwrap_or(self.default_limit)
            .clamp(1, MAX_LEADERBOARD_LIMIT);
        let entries = self.fetch_leaderboard(limit).await?;
        let you = self.standing(identity, &entries).await?;
        Ok(LeaderboardResponse { entries, you })
    }
}

/// 1-based position of `user_id` and the window size.
pub fn position_in(entries: &[LeaderboardEntry], user_id: Uuid) -> Option<(usize, usize)> {
    entries
        .iter()
        .position(|e| e.user_id == user_id)
        .map(|idx| (idx + 1, entries.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::leaderboard::UNKNOWN_DISPLAY_NAME,
        store::{Catalog, MemoryStore},
    };

    async fn seeded() -> (Arc<MemoryStore>, LeaderboardAggregator, Vec<Uuid>) {
        let store = Arc::new(MemoryStore::new(&Catalog::bundled().unwrap()));
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        store.upsert_total_score(users[0], 300).await.unwrap();
        store.upsert_total_score(users[1], 500).await.unwrap();
        store.upsert_total_score(users[2], 300).await.unwrap();
        store.set_global_rank(users[2], 2).await;
        store.set_global_rank(users[1], 1).await;
        store.set_display_name(users[1], "Ada").await;

        let aggregator = LeaderboardAggregator::new(store.clone(), 50);
        (store, aggregator, users)
    }

    #[tokio::test]
    async fn test_order_and_placeholder_names() {
        let (_, aggregator, users) = seeded().await;
        let entries = aggregator.fetch_leaderboard(10).await.unwrap();

        let order: Vec<Uuid> = entries.iter().map(|e| e.user_id).collect();
        // Tied at 300: the ranked user comes before the unranked one.
        assert_eq!(order, vec![users[1], users[2], users[0]]);
        assert_eq!(entries[0].display_name, "Ada");
        assert_eq!(entries[1].display_name, UNKNOWN_DISPLAY_NAME);
    }

    #[tokio::test]
    async fn test_standing_inside_window() {
        let (_, aggregator, users) = seeded().await;
        let response = aggregator
            .leaderboard_for(&Identity::User(users[2]), None)
            .await
            .unwrap();

        match response.you {
            Some(Standing::Ranked {
                position, out_of, ..
            }) => assert_eq!((position, out_of), (2, 3)),
            other => panic!("unexpected standing {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_standing_outside_window() {
        let (_, aggregator, users) = seeded().await;
        let response = aggregator
            .leaderboard_for(&Identity::User(users[0]), Some(1))
            .await
            .unwrap();
        assert_eq!(response.entries.len(), 1);
        assert_eq!(
            response.you,
            Some(Standing::NotYetRanked {
                user_id: users[0],
                total_score: 300
            })
        );

        let newcomer = Uuid::new_v4();
        let response = aggregator
            .leaderboard_for(&Identity::User(newcomer), None)
            .await
            .unwrap();
        assert_eq!(
            response.you,
            Some(Standing::NotYetRanked {
                user_id: newcomer,
                total_score: 0
            })
        );
    }

    #[tokio::test]
    async fn test_anonymous_has_no_standing() {
        let (_, aggregator, _) = seeded().await;
        let response = aggregator
            .leaderboard_for(&Identity::Anonymous, Some(0))
            .await
            .unwrap();
        assert!(response.you.is_none());
        // Zero is clamped up to one row.
        assert_eq!(response.entries.len(), 1);
    }
}
