// src/engine/scoring.rs

use serde::{Deserialize, Serialize};

/// How an attempt was started. Each mode has its own scoring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttemptMode {
    /// Sequential level play, scored on a 0-100 scale.
    #[default]
    Level,
    /// Category-wide play, scored per correct answer.
    FreePlay,
}

/// Converts a correct-count into points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringPolicy {
    /// `round(correct / total * 100)`.
    Percentage,
    /// `correct * points`.
    PerQuestion { points: i32 },
}

impl ScoringPolicy {
    pub fn for_mode(mode: AttemptMode, points_per_question: i32) -> Self {
        match mode {
            AttemptMode::Level => ScoringPolicy::Percentage,
            AttemptMode::FreePlay => ScoringPolicy::PerQuestion {
                points: points_per_question,
            },
        }
    }

    pub fn points(&self, correct: usize, total: usize) -> i32 {
        match self {
            ScoringPolicy::Percentage => percentage(correct, total),
            ScoringPolicy::PerQuestion { points } => correct as i32 * points,
        }
    }

    /// Highest score reachable with `total` questions.
    pub fn max_points(&self, total: usize) -> i32 {
        self.points(total, total)
    }
}

/// `round(correct / total * 100)`; zero questions score zero.
pub fn percentage(correct: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_scoring_scales_to_hundred() {
        let policy = ScoringPolicy::for_mode(AttemptMode::Level, 50);
        assert_eq!(policy.points(4, 5), 80);
        assert_eq!(policy.points(5, 5), 100);
        assert_eq!(policy.points(0, 5), 0);
        // 2/3 = 66.67 rounds up
        assert_eq!(policy.points(2, 3), 67);
    }

    #[test]
    fn test_free_play_scoring_is_per_question() {
        let policy = ScoringPolicy::for_mode(AttemptMode::FreePlay, 50);
        assert_eq!(policy.points(3, 5), 150);
        assert_eq!(policy.max_points(5), 250);
    }

    #[test]
    fn test_percentage_half_rounds_up() {
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(0, 0), 0);
    }
}
