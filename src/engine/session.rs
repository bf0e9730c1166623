// src/engine/session.rs

use serde::{Serialize, Serializer};

use super::scoring::{AttemptMode, ScoringPolicy};
use crate::{
    error::QuizError,
    models::question::{OPTION_COUNT, Question},
    questions::QuestionSource,
};

/// Wire value recorded when the countdown expires without an answer.
/// Never equal to a valid option index.
pub const NO_SELECTION: i8 = -1;

/// What the player chose for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Choice(u8),
    TimedOut,
}

impl Selection {
    pub fn index(&self) -> i8 {
        match self {
            Selection::Choice(i) => *i as i8,
            Selection::TimedOut => NO_SELECTION,
        }
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.index())
    }
}

/// Lifecycle of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Ready,
    Answering,
    Feedback,
    Finished,
    /// No questions exist for the selection. Terminal.
    ContentUnavailable,
    /// The question source failed. Terminal.
    Error(String),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Answering => "answering",
            SessionState::Feedback => "feedback",
            SessionState::Finished => "finished",
            SessionState::ContentUnavailable => "content_unavailable",
            SessionState::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Finished | SessionState::ContentUnavailable | SessionState::Error(_)
        )
    }
}

/// Category and optional level an attempt draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptScope {
    pub category_id: String,
    pub level_id: Option<String>,
}

/// Outcome of one answered (or timed out) question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub selection: Selection,
    pub correct_answer: u8,
    pub is_correct: bool,
}

/// Result of a finished attempt, handed to the progression coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptOutcome {
    pub scope: AttemptScope,
    pub mode: AttemptMode,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub points: i32,
    pub max_points: i32,
    pub answers: Vec<AnswerRecord>,
}

/// Tunables of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub time_limit: u32,
    pub questions_per_attempt: usize,
    pub points_per_question: i32,
}

/// One attempt, question by question.
///
/// Pure state machine: time only passes through [`QuizSession::tick`], so the
/// caller owns the clock.
#[derive(Debug, Clone)]
pub struct QuizSession {
    scope: AttemptScope,
    mode: AttemptMode,
    scoring: ScoringPolicy,
    settings: SessionSettings,
    state: SessionState,
    questions: Vec<Question>,
    cursor: usize,
    answers: Vec<AnswerRecord>,
    correct_count: usize,
    time_left: u32,
}

impl QuizSession {
    pub fn new(scope: AttemptScope, mode: AttemptMode, settings: SessionSettings) -> Self {
        Self {
            scope,
            mode,
            scoring: ScoringPolicy::for_mode(mode, settings.points_per_question),
            settings,
            state: SessionState::Loading,
            questions: Vec::new(),
            cursor: 0,
            answers: Vec::new(),
            correct_count: 0,
            time_left: settings.time_limit,
        }
    }

    /// `Loading` → `Ready`, `ContentUnavailable` or `Error`.
    pub async fn load(&mut self, source: &dyn QuestionSource) -> &SessionState {
        if self.state != SessionState::Loading {
            return &self.state;
        }

        let result = source
            .fetch_questions(
                &self.scope.category_id,
                self.scope.level_id.as_deref(),
                self.settings.questions_per_attempt,
            )
            .await;

        self.state = match result {
            Err(e) => {
                tracing::error!(
                    "Failed to load questions for {:?}: {}",
                    self.scope,
                    e
                );
                SessionState::Error(e.to_string())
            }
            Ok(questions) if questions.is_empty() => {
                tracing::info!("No questions available for {:?}", self.scope);
                SessionState::ContentUnavailable
            }
            Ok(mut questions) => {
                questions.truncate(self.settings.questions_per_attempt);
                self.questions = questions;
                self.cursor = 0;
                SessionState::Ready
            }
        };

        &self.state
    }

    /// `Ready` → `Answering` on the first question.
    pub fn start(&mut self) -> Result<(), QuizError> {
        self.expect_state(SessionState::Ready)?;
        self.enter_question(0);
        Ok(())
    }

    /// One time unit passes. Returns `true` when this tick expired the
    /// question. Ignored outside `Answering`.
    pub fn tick(&mut self) -> bool {
        if self.state != SessionState::Answering {
            return false;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.record(Selection::TimedOut);
            return true;
        }
        false
    }

    /// Answers the current question with option `option`.
    pub fn select(&mut self, option: i32) -> Result<&AnswerRecord, QuizError> {
        self.expect_state(SessionState::Answering)?;
        if !(0..OPTION_COUNT as i32).contains(&option) {
            return Err(QuizError::InvalidOption(option));
        }
        Ok(self.record(Selection::Choice(option as u8)))
    }

    /// `Feedback` → next question, or `Finished` after the last one.
    pub fn advance(&mut self) -> Result<Option<AttemptOutcome>, QuizError> {
        self.expect_state(SessionState::Feedback)?;

        if self.cursor + 1 < self.questions.len() {
            self.enter_question(self.cursor + 1);
            return Ok(None);
        }

        self.state = SessionState::Finished;
        let total = self.questions.len();
        Ok(Some(AttemptOutcome {
            scope: self.scope.clone(),
            mode: self.mode,
            correct_answers: self.correct_count,
            total_questions: total,
            points: self.scoring.points(self.correct_count, total),
            max_points: self.scoring.max_points(total),
            answers: self.answers.clone(),
        }))
    }

    /// Discards the attempt. Nothing it recorded is persisted.
    pub fn abandon(self) {
        tracing::info!(
            "Abandoned attempt on {:?} at question {} of {} ({})",
            self.scope,
            self.cursor + 1,
            self.questions.len(),
            self.state.name()
        );
    }

    fn enter_question(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.time_left = self.settings.time_limit;
        self.state = SessionState::Answering;
    }

    fn record(&mut self, selection: Selection) -> &AnswerRecord {
        let question = &self.questions[self.cursor];
        let is_correct = selection == Selection::Choice(question.correct_answer);
        if is_correct {
            self.correct_count += 1;
        }
        self.answers.push(AnswerRecord {
            question_id: question.id.clone(),
            selection,
            correct_answer: question.correct_answer,
            is_correct,
        });
        self.state = SessionState::Feedback;
        &self.answers[self.answers.len() - 1]
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), QuizError> {
        match &self.state {
            state if *state == expected => Ok(()),
            SessionState::ContentUnavailable => Err(QuizError::ContentUnavailable),
            state => Err(QuizError::InvalidTransition(state.name())),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn scope(&self) -> &AttemptScope {
        &self.scope
    }

    pub fn mode(&self) -> AttemptMode {
        self.mode
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Question under the cursor, once loaded.
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::Answering | SessionState::Feedback | SessionState::Ready => {
                self.questions.get(self.cursor)
            }
            _ => None,
        }
    }

    /// Feedback for the current question.
    pub fn feedback(&self) -> Option<&AnswerRecord> {
        if self.state == SessionState::Feedback {
            self.answers.last()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::StoreError;

    const SETTINGS: SessionSettings = SessionSettings {
        time_limit: 30,
        questions_per_attempt: 5,
        points_per_question: 50,
    };

    /// Five questions whose correct answer is `i % 4`.
    struct FixedSource {
        count: usize,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(count: usize) -> Self {
            Self {
                count,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QuestionSource for FixedSource {
        async fn fetch_questions(
            &self,
            category_id: &str,
            level_id: Option<&str>,
            _count: usize,
        ) -> Result<Vec<Question>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.count)
                .map(|i| {
                    Question::new(
                        format!("q{}", i),
                        category_id,
                        level_id.map(str::to_string),
                        format!("Question {}", i),
                        vec!["A".into(), "B".into(), "C".into(), "D".into()],
                        (i % 4) as i64,
                    )
                    .unwrap()
                })
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl QuestionSource for FailingSource {
        async fn fetch_questions(
            &self,
            _category_id: &str,
            _level_id: Option<&str>,
            _count: usize,
        ) -> Result<Vec<Question>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    fn scope(level: Option<&str>) -> AttemptScope {
        AttemptScope {
            category_id: "math".to_string(),
            level_id: level.map(str::to_string),
        }
    }

    async fn started(mode: AttemptMode, questions: usize) -> QuizSession {
        let mut session = QuizSession::new(scope(Some("math-2")), mode, SETTINGS);
        session.load(&FixedSource::new(questions)).await;
        session.start().unwrap();
        session
    }

    #[tokio::test]
    async fn test_five_questions_take_five_feedback_cycles() {
        let mut session = started(AttemptMode::Level, 5).await;
        let mut cycles = 0;

        loop {
            assert_eq!(session.state(), &SessionState::Answering);
            session.select(0).unwrap();
            assert_eq!(session.state(), &SessionState::Feedback);
            cycles += 1;
            if session.advance().unwrap().is_some() {
                break;
            }
        }

        assert_eq!(cycles, 5);
        assert_eq!(session.state(), &SessionState::Finished);
    }

    #[tokio::test]
    async fn test_level_scenario_four_correct_one_timeout() {
        let mut session = started(AttemptMode::Level, 5).await;

        for i in 0..4 {
            session.select((i % 4) as i32).unwrap();
            session.advance().unwrap();
        }
        for _ in 0..SETTINGS.time_limit {
            session.tick();
        }
        let feedback = session.feedback().unwrap();
        assert_eq!(feedback.selection, Selection::TimedOut);
        assert!(!feedback.is_correct);

        let outcome = session.advance().unwrap().unwrap();
        assert_eq!(outcome.correct_answers, 4);
        assert_eq!(outcome.total_questions, 5);
        assert_eq!(outcome.points, 80);
    }

    #[tokio::test]
    async fn test_correct_count_matches_answer_log() {
        let mut session = started(AttemptMode::FreePlay, 5).await;
        // Correct, wrong, correct, timeout, wrong.
        let plan = [Some(0), Some(0), Some(2), None, Some(1)];
        for choice in plan {
            match choice {
                Some(c) => {
                    session.select(c).unwrap();
                }
                None => while !session.tick() {},
            }
            session.advance().unwrap();
        }

        assert_eq!(session.state(), &SessionState::Finished);
        assert_eq!(session.correct_count(), 2);
        let matches = session
            .answers
            .iter()
            .filter(|a| a.selection.index() == a.correct_answer as i8)
            .count();
        assert_eq!(matches, session.correct_count());
    }

    #[tokio::test]
    async fn test_free_play_scores_fifty_per_answer() {
        let mut session = started(AttemptMode::FreePlay, 5).await;
        for i in 0..5 {
            // First three right, last two wrong.
            let choice = if i < 3 { i % 4 } else { (i + 1) % 4 };
            session.select(choice as i32).unwrap();
            let outcome = session.advance().unwrap();
            if let Some(outcome) = outcome {
                assert_eq!(outcome.points, 150);
                assert_eq!(outcome.max_points, 250);
            }
        }
    }

    #[tokio::test]
    async fn test_feedback_counts_once_and_freezes_timer() {
        let mut session = started(AttemptMode::Level, 5).await;
        session.select(0).unwrap();

        assert!(matches!(
            session.select(0),
            Err(QuizError::InvalidTransition("feedback"))
        ));
        let before = session.time_left();
        assert!(!session.tick());
        assert_eq!(session.time_left(), before);
        assert_eq!(session.correct_count(), 1);
    }

    #[tokio::test]
    async fn test_timer_resets_on_next_question() {
        let mut session = started(AttemptMode::Level, 5).await;
        for _ in 0..10 {
            session.tick();
        }
        assert_eq!(session.time_left(), 20);
        session.select(1).unwrap();
        session.advance().unwrap();
        assert_eq!(session.time_left(), 30);
        assert_eq!(session.cursor(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_option_is_rejected() {
        let mut session = started(AttemptMode::Level, 5).await;
        assert_eq!(session.select(4), Err(QuizError::InvalidOption(4)));
        assert_eq!(session.select(-1), Err(QuizError::InvalidOption(-1)));
        assert_eq!(session.state(), &SessionState::Answering);
    }

    #[tokio::test]
    async fn test_empty_content_never_answers() {
        let mut session = QuizSession::new(scope(Some("science-9")), AttemptMode::Level, SETTINGS);
        let state = session.load(&FixedSource::new(0)).await.clone();

        assert_eq!(state, SessionState::ContentUnavailable);
        assert_eq!(session.start(), Err(QuizError::ContentUnavailable));
        assert_eq!(session.select(0).unwrap_err(), QuizError::ContentUnavailable);
        assert!(!session.tick());
        assert!(session.current_question().is_none());
    }

    #[tokio::test]
    async fn test_source_failure_enters_error() {
        let mut session = QuizSession::new(scope(None), AttemptMode::FreePlay, SETTINGS);
        session.load(&FailingSource).await;

        assert!(matches!(session.state(), SessionState::Error(_)));
        assert!(session.state().is_terminal());
    }

    #[tokio::test]
    async fn test_load_runs_once() {
        let source = FixedSource::new(5);
        let mut session = QuizSession::new(scope(None), AttemptMode::FreePlay, SETTINGS);
        session.load(&source).await;
        session.load(&source).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sentinel_is_outside_option_range() {
        assert!(!(0..OPTION_COUNT as i8).contains(&NO_SELECTION));
        assert_eq!(Selection::TimedOut.index(), -1);
        assert_eq!(serde_json::to_string(&Selection::TimedOut).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Selection::Choice(2)).unwrap(), "2");
    }
}
