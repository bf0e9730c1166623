// src/engine/mod.rs

//! Quiz session engine: one attempt, question by question.

pub mod registry;
pub mod scoring;
pub mod session;
pub mod summary;

pub use registry::SessionRegistry;
pub use scoring::{AttemptMode, ScoringPolicy};
pub use session::{
    AnswerRecord, AttemptOutcome, AttemptScope, NO_SELECTION, QuizSession, Selection,
    SessionSettings, SessionState,
};
pub use summary::{AttemptSummary, PerformanceTier};
