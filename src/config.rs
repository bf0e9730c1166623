// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

use crate::{models::progress::ReplayPolicy, services::progression::CompletionStrategy};

/// Seconds a player gets for each question.
pub const QUESTION_TIME_LIMIT: u32 = 30;
/// Questions drawn for one attempt.
pub const QUESTIONS_PER_ATTEMPT: usize = 5;
/// Points per correct answer in free-play mode.
pub const FREE_PLAY_POINTS_PER_QUESTION: i32 = 50;
/// Rows returned by the leaderboard.
pub const LEADERBOARD_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` runs on the bundled in-memory catalog.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub question_time_limit: u32,
    pub questions_per_attempt: usize,
    pub free_play_points_per_question: i32,
    pub leaderboard_limit: i64,
    /// Length of one countdown unit.
    pub tick_interval_ms: u64,
    pub session_ttl_seconds: u64,
    pub completion_strategy: CompletionStrategy,
    pub replay_policy: ReplayPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            question_time_limit: parse_or("QUESTION_TIME_LIMIT", QUESTION_TIME_LIMIT),
            questions_per_attempt: parse_or("QUESTIONS_PER_ATTEMPT", QUESTIONS_PER_ATTEMPT),
            free_play_points_per_question: parse_or(
                "FREE_PLAY_POINTS_PER_QUESTION",
                FREE_PLAY_POINTS_PER_QUESTION,
            ),
            leaderboard_limit: parse_or("LEADERBOARD_LIMIT", LEADERBOARD_LIMIT),
            tick_interval_ms: parse_or("TICK_INTERVAL_MS", 1000),
            session_ttl_seconds: parse_or("SESSION_TTL_SECONDS", 3600),
            completion_strategy: parse_or("COMPLETION_STRATEGY", CompletionStrategy::default()),
            replay_policy: parse_or("REPLAY_POLICY", ReplayPolicy::default()),
        }
    }

    /// Defaults for everything except the secret; used by tests and tools.
    pub fn with_secret(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            rust_log: "error".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            question_time_limit: QUESTION_TIME_LIMIT,
            questions_per_attempt: QUESTIONS_PER_ATTEMPT,
            free_play_points_per_question: FREE_PLAY_POINTS_PER_QUESTION,
            leaderboard_limit: LEADERBOARD_LIMIT,
            tick_interval_ms: 1000,
            session_ttl_seconds: 3600,
            completion_strategy: CompletionStrategy::default(),
            replay_policy: ReplayPolicy::default(),
        }
    }
}

/// Reads `key` and parses it, keeping `default` when unset or malformed.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl FromStr for ReplayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_write" => Ok(ReplayPolicy::LastWrite),
            "best_score" => Ok(ReplayPolicy::BestScore),
            other => Err(format!("unknown replay policy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_policy_parses() {
        assert_eq!("best_score".parse::<ReplayPolicy>(), Ok(ReplayPolicy::BestScore));
        assert_eq!("last_write".parse::<ReplayPolicy>(), Ok(ReplayPolicy::LastWrite));
        assert!("highest".parse::<ReplayPolicy>().is_err());
    }

    #[test]
    fn test_defaults_match_game_rules() {
        let config = Config::with_secret("s");
        assert_eq!(config.question_time_limit, 30);
        assert_eq!(config.questions_per_attempt, 5);
        assert_eq!(config.free_play_points_per_question, 50);
        assert_eq!(config.replay_policy, ReplayPolicy::LastWrite);
        assert_eq!(config.completion_strategy, CompletionStrategy::Atomic);
    }
}
