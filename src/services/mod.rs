// src/services/mod.rs

//! Operations over the stores that outlive a single request.

pub mod leaderboard;
pub mod progression;
pub mod recommendation;

pub use leaderboard::LeaderboardAggregator;
pub use progression::{Completion, CompletionStrategy, ProgressionCoordinator};
pub use recommendation::RecommendationService;
