use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;

use crate::{
    config::Config,
    engine::{SessionRegistry, SessionSettings},
    questions::QuestionSource,
    services::{LeaderboardAggregator, ProgressionCoordinator, RecommendationService},
    store::{ContentStore, ProgressStore},
};

#[derive(Clone)]
pub struct AppState {
    pub content: Arc<dyn ContentStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub questions: Arc<dyn QuestionSource>,
    pub sessions: Arc<SessionRegistry>,
    pub coordinator: ProgressionCoordinator,
    pub leaderboard: LeaderboardAggregator,
    pub recommendations: RecommendationService,
    pub config: Config,
}

impl AppState {
    /// Wires the services over the given stores.
    pub fn new(
        config: Config,
        content: Arc<dyn ContentStore>,
        progress: Arc<dyn ProgressStore>,
        questions: Arc<dyn QuestionSource>,
    ) -> Self {
        let coordinator = ProgressionCoordinator::new(
            content.clone(),
            progress.clone(),
            config.completion_strategy,
            config.replay_policy,
            config.free_play_points_per_question,
        );
        let leaderboard = LeaderboardAggregator::new(progress.clone(), config.leaderboard_limit);
        let recommendations = RecommendationService::new(content.clone(), progress.clone());
        let sessions = Arc::new(SessionRegistry::new(
            Duration::from_millis(config.tick_interval_ms),
            Duration::from_secs(config.session_ttl_seconds),
        ));

        Self {
            content,
            progress,
            questions,
            sessions,
            coordinator,
            leaderboard,
            recommendations,
            config,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            time_limit: self.config.question_time_limit,
            questions_per_attempt: self.config.questions_per_attempt,
            points_per_question: self.config.free_play_points_per_question,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
