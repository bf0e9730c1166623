// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::error::QuizError;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Canonical multiple-choice question.
///
/// Every question source converts its native shape into this type, so the
/// session engine only ever sees one schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub category_id: String,
    pub level_id: Option<String>,
    pub text: String,
    pub options: [String; OPTION_COUNT],
    /// Index of the correct option, always in `0..OPTION_COUNT`.
    pub correct_answer: u8,
}

impl Question {
    /// Builds a question, rejecting anything that is not exactly four options
    /// with a correct index pointing at one of them.
    pub fn new(
        id: impl Into<String>,
        category_id: impl Into<String>,
        level_id: Option<String>,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: i64,
    ) -> Result<Self, QuizError> {
        let id = id.into();
        let options: [String; OPTION_COUNT] = options.try_into().map_err(|o: Vec<String>| {
            QuizError::InvalidQuestion(format!(
                "question {} has {} options, expected {}",
                id,
                o.len(),
                OPTION_COUNT
            ))
        })?;

        if !(0..OPTION_COUNT as i64).contains(&correct_answer) {
            return Err(QuizError::InvalidQuestion(format!(
                "question {} has correct answer index {}",
                id, correct_answer
            )));
        }

        Ok(Self {
            id,
            category_id: category_id.into(),
            level_id,
            text: text.into(),
            options,
            correct_answer: correct_answer as u8,
        })
    }
}

/// Row shape of the 'quiz_questions' table.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: String,
    pub category_id: String,
    pub level_id: Option<String>,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: i32,
}

impl TryFrom<QuestionRow> for Question {
    type Error = QuizError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Question::new(
            row.id,
            row.category_id,
            row.level_id,
            row.question_text,
            vec![row.option_a, row.option_b, row.option_c, row.option_d],
            row.correct_answer as i64,
        )
    }
}

/// DTO for sending a question to the client (excludes the correct answer).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    pub options: [String; OPTION_COUNT],
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}
