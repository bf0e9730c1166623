// src/models/session.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::{AnswerRecord, AttemptMode, AttemptSummary, QuizSession, SessionState},
    models::{progress::ScoreOverview, question::PublicQuestion},
};

/// DTO for starting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(min = 1, max = 64, message = "Category id must be 1 to 64 characters."))]
    pub category_id: String,

    #[validate(length(min = 1, max = 64, message = "Level id must be 1 to 64 characters."))]
    pub level_id: Option<String>,

    #[serde(default)]
    pub mode: AttemptMode,
}

/// DTO for answering the current question.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub option: i32,
}

/// What the client sees of a session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: &'static str,
    pub mode: AttemptMode,
    pub category_id: String,
    pub level_id: Option<String>,
    /// 0-based cursor.
    pub question_index: usize,
    pub total_questions: usize,
    pub time_left: u32,
    pub correct_count: usize,
    /// The current question, without its answer.
    pub question: Option<PublicQuestion>,
    /// Present while the session is in feedback.
    pub feedback: Option<AnswerRecord>,
    pub error: Option<String>,
}

impl SessionView {
    pub fn new(session_id: Uuid, session: &QuizSession) -> Self {
        let error = match session.state() {
            SessionState::Error(msg) => Some(msg.clone()),
            SessionState::ContentUnavailable => {
                Some("No questions are available for this selection.".to_string())
            }
            _ => None,
        };

        Self {
            session_id,
            state: session.state().name(),
            mode: session.mode(),
            category_id: session.scope().category_id.clone(),
            level_id: session.scope().level_id.clone(),
            question_index: session.cursor(),
            total_questions: session.total_questions(),
            time_left: session.time_left(),
            correct_count: session.correct_count(),
            question: session.current_question().map(PublicQuestion::from),
            feedback: session.feedback().cloned(),
            error,
        }
    }
}

/// Result block attached when an attempt finishes.
#[derive(Debug, Serialize)]
pub struct AttemptResult {
    pub summary: AttemptSummary,
    /// Whether durable progress was recorded.
    pub persisted: bool,
    /// Shown to the player when progress was not saved.
    pub notice: Option<String>,
    pub scores: Option<ScoreOverview>,
}

/// Response of `POST /sessions/{id}/next`.
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    #[serde(flatten)]
    pub session: SessionView,
    pub result: Option<AttemptResult>,
}
