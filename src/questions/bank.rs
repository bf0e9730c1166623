// src/questions/bank.rs

use std::collections::HashMap;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use super::QuestionSource;
use crate::{error::StoreError, models::question::Question, store::Catalog};

/// In-memory question bank keyed by category.
///
/// Level questions are the ones stamped with that level id, in bank order.
pub struct StaticQuestionBank {
    by_category: HashMap<String, Vec<Question>>,
}

impl StaticQuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        let mut by_category: HashMap<String, Vec<Question>> = HashMap::new();
        for q in questions {
            by_category.entry(q.category_id.clone()).or_default().push(q);
        }
        Self { by_category }
    }

    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self::new(catalog.questions.clone())
    }

    fn level_questions(&self, category_id: &str, level_id: &str, count: usize) -> Vec<Question> {
        let Some(questions) = self.by_category.get(category_id) else {
            return Vec::new();
        };

        questions
            .iter()
            .filter(|q| q.level_id.as_deref() == Some(level_id))
            .take(count)
            .cloned()
            .collect()
    }

    fn random_sample(&self, category_id: &str, count: usize) -> Vec<Question> {
        let Some(questions) = self.by_category.get(category_id) else {
            return Vec::new();
        };

        // Shuffling the whole pool then cutting it draws without replacement.
        let mut sample = questions.clone();
        sample.shuffle(&mut rand::rng());
        sample.truncate(count);
        sample
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionBank {
    async fn fetch_questions(
        &self,
        category_id: &str,
        level_id: Option<&str>,
        count: usize,
    ) -> Result<Vec<Question>, StoreError> {
        let questions = match level_id {
            Some(level_id) => self.level_questions(category_id, level_id, count),
            None => self.random_sample(category_id, count),
        };
        tracing::debug!(
            "Question bank returned {} questions for {}/{:?}",
            questions.len(),
            category_id,
            level_id
        );
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn bank() -> StaticQuestionBank {
        StaticQuestionBank::from_catalog(&Catalog::bundled().unwrap())
    }

    #[tokio::test]
    async fn test_level_questions_are_deterministic() {
        let bank = bank();
        let first = bank.fetch_questions("math", Some("math-2"), 5).await.unwrap();
        let again = bank.fetch_questions("math", Some("math-2"), 5).await.unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(first, again);
        assert!(first.iter().all(|q| q.level_id.as_deref() == Some("math-2")));
    }

    #[tokio::test]
    async fn test_random_sample_has_no_duplicates() {
        let bank = bank();
        let sample = bank.fetch_questions("math", None, 5).await.unwrap();

        assert_eq!(sample.len(), 5);
        let ids: HashSet<&str> = sample.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), 5);
        assert!(sample.iter().all(|q| q.category_id == "math"));
    }

    #[tokio::test]
    async fn test_missing_content_is_empty_not_error() {
        let bank = bank();
        assert!(bank
            .fetch_questions("science", Some("science-9"), 5)
            .await
            .unwrap()
            .is_empty());
        assert!(bank.fetch_questions("cooking", None, 5).await.unwrap().is_empty());
        assert!(bank
            .fetch_questions("math", Some("history-1"), 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_huge_level_number_is_empty() {
        let bank = bank();
        for level_id in ["math-18446744073709551615", "math-14757395258967641294", "math-0"] {
            assert!(
                bank.fetch_questions("math", Some(level_id), 5)
                    .await
                    .unwrap()
                    .is_empty(),
                "{} should have no questions",
                level_id
            );
        }
    }

    #[tokio::test]
    async fn test_sample_is_capped_by_pool_size() {
        let q = |id: &str| {
            Question::new(id, "tiny", None, "?", vec!["a".into(), "b".into(), "c".into(), "d".into()], 0)
                .unwrap()
        };
        let bank = StaticQuestionBank::new(vec![q("t1"), q("t2")]);
        assert_eq!(bank.fetch_questions("tiny", None, 5).await.unwrap().len(), 2);
    }
}
