// src/services/progression.rs

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    engine::{AttemptMode, AttemptOutcome},
    error::{QuizError, StoreError},
    models::{
        identity::Identity,
        progress::{
            LevelDisplayStatus, LevelProgressWrite, LevelScore, LevelStatus, ReplayPolicy,
            ScoreOverview,
        },
    },
    store::{CompletionPlan, ContentStore, ProgressStore},
};

/// How the writes of one completion reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionStrategy {
    /// One store transaction; aggregates incremented in place.
    #[default]
    Atomic,
    /// One store call per step; aggregates read, summed and written back.
    /// Concurrent completions for the same user can lose an increment.
    Orchestrated,
}

impl FromStr for CompletionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(CompletionStrategy::Atomic),
            "orchestrated" => Ok(CompletionStrategy::Orchestrated),
            other => Err(format!("unknown completion strategy '{}'", other)),
        }
    }
}

/// Result of a coordinator write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Anonymous caller; nothing was written.
    Skipped,
    /// Writes applied; the user's aggregates as re-read afterwards.
    Applied(ScoreOverview),
}

/// Turns finished attempts into durable progress.
#[derive(Clone)]
pub struct ProgressionCoordinator {
    content: Arc<dyn ContentStore>,
    progress: Arc<dyn ProgressStore>,
    strategy: CompletionStrategy,
    replay_policy: ReplayPolicy,
    points_per_question: i32,
}

impl ProgressionCoordinator {
    pub fn new(
        content: Arc<dyn ContentStore>,
        progress: Arc<dyn ProgressStore>,
        strategy: CompletionStrategy,
        replay_policy: ReplayPolicy,
        points_per_question: i32,
    ) -> Self {
        Self {
            content,
            progress,
            strategy,
            replay_policy,
            points_per_question,
        }
    }

    pub fn strategy(&self) -> CompletionStrategy {
        self.strategy
    }

    /// Marks `level_id` completed and unlocks its successor.
    ///
    /// Aggregates are re-read, not accumulated.
    pub async fn complete_level(
        &self,
        identity: &Identity,
        level_id: &str,
        points: i32,
        correct_answers: i32,
        total_questions: i32,
    ) -> Result<Completion, QuizError> {
        let Some(user_id) = self.user_or_skip(identity, "complete_level") else {
            return Ok(Completion::Skipped);
        };

        let mut plan = self
            .level_plan(level_id, points, total_questions, correct_answers, total_questions)
            .await?;
        plan.accumulate = None;

        self.execute(user_id, &plan).await?;
        self.overview_for(user_id).await.map(Completion::Applied)
    }

    /// Records a result and adds `score` to the category and total aggregates.
    ///
    /// With no `level_id` (free play without a level) no level row is written.
    #[allow(clippy::too_many_arguments)]
    pub async fn save_category_progress(
        &self,
        identity: &Identity,
        category_id: &str,
        level_id: Option<&str>,
        score: i32,
        max_score: i32,
        correct_answers: i32,
        total_questions: i32,
    ) -> Result<Completion, QuizError> {
        let Some(user_id) = self.user_or_skip(identity, "save_category_progress") else {
            return Ok(Completion::Skipped);
        };

        let now = Utc::now();
        let plan = CompletionPlan {
            category_id: category_id.to_string(),
            progress: level_id.map(|level_id| {
                LevelProgressWrite::completed(
                    level_id,
                    score,
                    max_score,
                    correct_answers,
                    total_questions,
                    now,
                )
            }),
            replay_policy: self.replay_policy,
            unlock: None,
            accumulate: Some(score as i64),
            category_levels: self.level_ids(category_id).await?,
            played_at: now,
        };

        self.execute(user_id, &plan).await?;
        self.overview_for(user_id).await.map(Completion::Applied)
    }

    /// Persists a finished attempt according to its mode.
    ///
    /// Level mode completes the level, unlocks its successor and accumulates
    /// the points. Free play accumulates `correct * reward` points.
    pub async fn finish_attempt(
        &self,
        identity: &Identity,
        outcome: &AttemptOutcome,
    ) -> Result<Completion, QuizError> {
        let correct = outcome.correct_answers as i32;
        let total = outcome.total_questions as i32;

        match (outcome.mode, outcome.scope.level_id.as_deref()) {
            (AttemptMode::Level, Some(level_id)) => {
                let Some(user_id) = self.user_or_skip(identity, "finish_attempt") else {
                    return Ok(Completion::Skipped);
                };
                let plan = self
                    .level_plan(level_id, outcome.points, total, correct, total)
                    .await?;
                self.execute(user_id, &plan).await?;
                self.overview_for(user_id).await.map(Completion::Applied)
            }
            (AttemptMode::Level, None) => Err(QuizError::LevelNotFound(String::new())),
            (AttemptMode::FreePlay, level_id) => {
                self.save_category_progress(
                    identity,
                    &outcome.scope.category_id,
                    level_id,
                    outcome.points,
                    total * self.points_per_question,
                    correct,
                    total,
                )
                .await
            }
        }
    }

    /// Creates the category row and level rows (first `current`, rest
    /// `locked`) where missing. Existing rows are left alone.
    pub async fn initialize_category_progress(
        &self,
        identity: &Identity,
        category_id: &str,
    ) -> Result<Completion, QuizError> {
        let Some(user_id) = self.user_or_skip(identity, "initialize_category_progress") else {
            return Ok(Completion::Skipped);
        };

        let level_ids = self.level_ids(category_id).await?;
        self.progress
            .initialize_category_progress(user_id, category_id, &level_ids)
            .await
            .map_err(|e| persistence_failure("initialize_category_progress", e))?;

        self.overview_for(user_id).await.map(Completion::Applied)
    }

    /// Every level of the category with the caller's latest result on it.
    pub async fn latest_level_scores(
        &self,
        identity: &Identity,
        category_id: &str,
    ) -> Result<Vec<LevelScore>, QuizError> {
        let levels = self.content.list_levels(category_id).await?;

        let rows = match identity.user_id() {
            Some(user_id) => self.progress.get_level_progress(user_id, category_id).await?,
            None => Vec::new(),
        };
        let by_level: HashMap<&str, _> = rows.iter().map(|p| (p.level_id.as_str(), p)).collect();

        Ok(levels
            .iter()
            .map(|level| {
                let row = by_level.get(level.id.as_str());
                let status = match row {
                    Some(p)
                        if p.status == LevelStatus::Completed
                            || p.score > 0
                            || p.correct_answers > 0 =>
                    {
                        LevelDisplayStatus::Completed
                    }
                    Some(p) if p.status == LevelStatus::Current => LevelDisplayStatus::Current,
                    _ => LevelDisplayStatus::Available,
                };

                LevelScore {
                    level_id: level.id.clone(),
                    level_number: level.level_number,
                    name: level.name.clone(),
                    points: row.map(|p| p.score).unwrap_or(0),
                    correct_answers: row.map(|p| p.correct_answers).unwrap_or(0),
                    total_questions: row
                        .map(|p| p.total_questions)
                        .filter(|t| *t > 0)
                        .unwrap_or(level.questions_count),
                    status,
                }
            })
            .collect())
    }

    /// The caller's category scores and total.
    pub async fn score_overview(&self, identity: &Identity) -> Result<ScoreOverview, QuizError> {
        let user_id = identity.user_id().ok_or(QuizError::IdentityMissing)?;
        self.overview_for(user_id).await
    }

    /// Id of the level after `level_id` in its category, if any.
    pub async fn next_level_id(&self, level_id: &str) -> Result<Option<String>, QuizError> {
        let Some(level) = self.content.get_level(level_id).await? else {
            return Ok(None);
        };
        Ok(self
            .content
            .find_level_by_number(&level.category_id, level.level_number + 1)
            .await?
            .map(|next| next.id))
    }

    fn user_or_skip(&self, identity: &Identity, operation: &str) -> Option<Uuid> {
        let user_id = identity.user_id();
        if user_id.is_none() {
            tracing::debug!("Skipping {} for anonymous player", operation);
        }
        user_id
    }

    /// Completion of a level plus the successor to unlock.
    async fn level_plan(
        &self,
        level_id: &str,
        points: i32,
        max_score: i32,
        correct_answers: i32,
        total_questions: i32,
    ) -> Result<CompletionPlan, QuizError> {
        let level = self
            .content
            .get_level(level_id)
            .await?
            .ok_or_else(|| QuizError::LevelNotFound(level_id.to_string()))?;

        let next = self
            .content
            .find_level_by_number(&level.category_id, level.level_number + 1)
            .await?;

        let now = Utc::now();
        Ok(CompletionPlan {
            category_id: level.category_id.clone(),
            progress: Some(LevelProgressWrite::completed(
                level_id,
                points,
                max_score,
                correct_answers,
                total_questions,
                now,
            )),
            replay_policy: self.replay_policy,
            unlock: next.map(|l| l.id),
            accumulate: Some(points as i64),
            category_levels: self.level_ids(&level.category_id).await?,
            played_at: now,
        })
    }

    async fn level_ids(&self, category_id: &str) -> Result<Vec<String>, QuizError> {
        Ok(self
            .content
            .list_levels(category_id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect())
    }

    async fn execute(&self, user_id: Uuid, plan: &CompletionPlan) -> Result<(), QuizError> {
        let result = match self.strategy {
            CompletionStrategy::Atomic => self.progress.apply_completion(user_id, plan).await,
            CompletionStrategy::Orchestrated => self.run_steps(user_id, plan).await,
        };
        result.map_err(|e| persistence_failure("completion", e))?;

        tracing::info!(
            "Recorded completion for user {} in {} (level: {:?}, points: {:?})",
            user_id,
            plan.category_id,
            plan.progress.as_ref().map(|p| p.level_id.as_str()),
            plan.accumulate
        );
        Ok(())
    }

    /// The plan as independent store calls. A failure stops the sequence and
    /// leaves earlier steps applied; each step is safe to repeat.
    async fn run_steps(&self, user_id: Uuid, plan: &CompletionPlan) -> Result<(), StoreError> {
        if let Some(write) = &plan.progress {
            self.progress
                .upsert_level_progress(user_id, write, plan.replay_policy)
                .await?;
        }

        if let Some(next) = &plan.unlock {
            let created = self
                .progress
                .insert_level_progress_if_absent(
                    user_id,
                    &LevelProgressWrite::empty(next, LevelStatus::Current),
                )
                .await?;
            if !created {
                self.progress.promote_locked_level(user_id, next).await?;
            }
        }

        let Some(points) = plan.accumulate else {
            return Ok(());
        };

        let existing = match self
            .progress
            .get_category_score(user_id, &plan.category_id)
            .await?
        {
            Some(row) => Some(row),
            None => {
                self.progress
                    .initialize_category_progress(user_id, &plan.category_id, &plan.category_levels)
                    .await?;
                self.progress
                    .get_category_score(user_id, &plan.category_id)
                    .await?
            }
        };
        let mut category = existing.ok_or_else(|| {
            StoreError::Corrupt(format!(
                "category score for {} missing after initialization",
                plan.category_id
            ))
        })?;

        category.total_score += points;
        category.levels_completed += 1;
        category.last_played_at = Some(plan.played_at);
        self.progress.upsert_category_score(&category).await?;

        let total = self
            .progress
            .get_total_score(user_id)
            .await?
            .map(|t| t.total_score)
            .unwrap_or(0);
        self.progress
            .upsert_total_score(user_id, total + points)
            .await?;

        Ok(())
    }

    async fn overview_for(&self, user_id: Uuid) -> Result<ScoreOverview, QuizError> {
        let category_scores = self.progress.list_category_scores(user_id).await?;
        let total = self.progress.get_total_score(user_id).await?;

        Ok(ScoreOverview {
            category_scores,
            total_score: total.as_ref().map(|t| t.total_score).unwrap_or(0),
            global_rank: total.and_then(|t| t.global_rank),
        })
    }
}

fn persistence_failure(operation: &str, err: StoreError) -> QuizError {
    tracing::error!("Failed to persist {}: {}", operation, err);
    QuizError::from(err)
}
