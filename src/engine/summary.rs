// src/engine/summary.rs

use serde::Serialize;

use super::{scoring::percentage, session::AttemptOutcome};

/// Headline band of a finished attempt, by percentage correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Excellent,
    Great,
    Good,
    KeepTrying,
}

impl PerformanceTier {
    pub fn from_percentage(percentage: i32) -> Self {
        match percentage {
            p if p >= 90 => PerformanceTier::Excellent,
            p if p >= 70 => PerformanceTier::Great,
            p if p >= 50 => PerformanceTier::Good,
            _ => PerformanceTier::KeepTrying,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "Excellent!",
            PerformanceTier::Great => "Great!",
            PerformanceTier::Good => "Good!",
            PerformanceTier::KeepTrying => "Keep trying!",
        }
    }
}

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 21st, 112th.
pub fn ordinal_suffix(n: usize) -> &'static str {
    if (11..=13).contains(&(n % 100)) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

pub fn placement_line(position: usize, out_of: usize) -> String {
    format!(
        "You placed {}{} out of {} players",
        position,
        ordinal_suffix(position),
        out_of
    )
}

/// Results screen of a finished attempt.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttemptSummary {
    pub correct_answers: usize,
    pub total_questions: usize,
    pub percentage: i32,
    pub points: i32,
    pub tier: PerformanceTier,
    pub headline: &'static str,
    /// Level to offer as "next level", if the played one has a successor.
    pub next_level_id: Option<String>,
    /// Set when the player appears in the leaderboard window.
    pub placement: Option<String>,
    pub share_text: String,
}

impl AttemptSummary {
    /// `placement` is the player's 1-based leaderboard position and the
    /// window size.
    pub fn new(
        outcome: &AttemptOutcome,
        next_level_id: Option<String>,
        placement: Option<(usize, usize)>,
    ) -> Self {
        let percentage = percentage(outcome.correct_answers, outcome.total_questions);
        let tier = PerformanceTier::from_percentage(percentage);

        Self {
            correct_answers: outcome.correct_answers,
            total_questions: outcome.total_questions,
            percentage,
            points: outcome.points,
            tier,
            headline: tier.headline(),
            next_level_id,
            placement: placement.map(|(position, out_of)| placement_line(position, out_of)),
            share_text: format!(
                "I scored {}/{} ({}%)!",
                outcome.correct_answers, outcome.total_questions, percentage
            ),
        }
    }
}
