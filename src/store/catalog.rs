// src/store/catalog.rs

use serde::Deserialize;

use crate::{
    config::QUESTIONS_PER_ATTEMPT,
    error::QuizError,
    models::{category::Category, level::Level, question::Question},
};

const BUNDLED_CATALOG: &str = include_str!("../../data/catalog.json");

/// Points a level is worth in the bundled catalog.
const LEVEL_MAX_POINTS: i32 = 100;

/// Content used when no database is configured: categories, levels and the
/// static question bank.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub categories: Vec<Category>,
    pub levels: Vec<Level>,
    pub questions: Vec<Question>,
}

#[derive(Deserialize)]
struct CatalogFile {
    categories: Vec<CategoryEntry>,
}

#[derive(Deserialize)]
struct CategoryEntry {
    id: String,
    name: String,
    icon: String,
    color: String,
    levels: Vec<LevelEntry>,
    questions: Vec<BankQuestion>,
}

#[derive(Deserialize)]
struct LevelEntry {
    name: String,
    difficulty: String,
}

/// Question shape used by the bundled bank.
#[derive(Deserialize)]
struct BankQuestion {
    question: String,
    options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    correct_answer: i64,
}

impl Catalog {
    /// The catalog shipped in `data/catalog.json`.
    pub fn bundled() -> Result<Self, QuizError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Parses a catalog file. Questions are assigned to levels in slices of
    /// five: questions 1-5 belong to level 1, 6-10 to level 2, and so on.
    pub fn from_json(raw: &str) -> Result<Self, QuizError> {
        let file: CatalogFile = serde_json::from_str(raw)
            .map_err(|e| QuizError::InvalidQuestion(format!("catalog: {}", e)))?;

        let mut catalog = Catalog::default();

        for entry in file.categories {
            for (idx, level) in entry.levels.iter().enumerate() {
                let number = idx as i32 + 1;
                catalog.levels.push(Level {
                    id: Level::slug(&entry.id, number),
                    category_id: entry.id.clone(),
                    level_number: number,
                    name: level.name.clone(),
                    difficulty: level.difficulty.clone(),
                    questions_count: QUESTIONS_PER_ATTEMPT as i32,
                    max_points: LEVEL_MAX_POINTS,
                });
            }

            for (idx, q) in entry.questions.into_iter().enumerate() {
                let number = (idx / QUESTIONS_PER_ATTEMPT) as i32 + 1;
                let level_id = (number as usize <= entry.levels.len())
                    .then(|| Level::slug(&entry.id, number));

                catalog.questions.push(Question::new(
                    format!("{}-q{}", entry.id, idx + 1),
                    entry.id.clone(),
                    level_id,
                    q.question,
                    q.options,
                    q.correct_answer,
                )?);
            }

            catalog.categories.push(Category {
                id: entry.id,
                name: entry.name,
                icon: entry.icon,
                color: entry.color,
            });
        }

        catalog.categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(catalog)
    }
}
