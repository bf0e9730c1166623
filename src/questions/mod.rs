// src/questions/mod.rs

pub mod bank;

use async_trait::async_trait;

use crate::{error::StoreError, models::question::Question};

pub use bank::StaticQuestionBank;

/// Supplies the questions of one attempt.
///
/// * With a level: that level's questions in a fixed order, so a replay
///   shows the same set.
/// * Without a level: a fresh random sample of the whole category, drawn
///   without replacement.
///
/// No matching content is an empty vector, not an error.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch_questions(
        &self,
        category_id: &str,
        level_id: Option<&str>,
        count: usize,
    ) -> Result<Vec<Question>, StoreError>;
}
