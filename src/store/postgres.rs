// src/store/postgres.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{CompletionPlan, ContentStore, ProgressStore};
use crate::{
    error::StoreError,
    models::{
        category::Category,
        leaderboard::LeaderboardRow,
        level::Level,
        progress::{
            CategoryScore, LevelProgress, LevelProgressWrite, LevelStatus, ReplayPolicy, TotalScore,
        },
        question::{Question, QuestionRow},
        recommendation::DailyRecommendation,
    },
    questions::QuestionSource,
};

/// Postgres-backed content, question and progress store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LEVEL_COLUMNS: &str =
    "id, category_id, level_number, name, difficulty, questions_count, max_points";

const PROGRESS_COLUMNS: &str = "p.user_id, p.level_id, p.status, p.score, p.max_score, \
     p.correct_answers, p.total_questions, p.completed_at";

async fn upsert_progress<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    write: &LevelProgressWrite,
    policy: ReplayPolicy,
) -> Result<(), sqlx::Error> {
    // Status never moves backwards; best-score replays skip lower results.
    sqlx::query(
        r#"
        INSERT INTO user_level_progress
            (user_id, level_id, status, score, max_score, correct_answers, total_questions, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, level_id) DO UPDATE SET
            status = CASE
                WHEN user_level_progress.status = 'completed' THEN 'completed'
                WHEN user_level_progress.status = 'current' AND EXCLUDED.status = 'locked' THEN 'current'
                ELSE EXCLUDED.status
            END,
            score = EXCLUDED.score,
            max_score = EXCLUDED.max_score,
            correct_answers = EXCLUDED.correct_answers,
            total_questions = EXCLUDED.total_questions,
            completed_at = EXCLUDED.completed_at,
            updated_at = NOW()
        WHERE NOT $9
           OR user_level_progress.status <> 'completed'
           OR EXCLUDED.score > user_level_progress.score
        "#,
    )
    .bind(user_id)
    .bind(&write.level_id)
    .bind(write.status.as_str())
    .bind(write.score)
    .bind(write.max_score)
    .bind(write.correct_answers)
    .bind(write.total_questions)
    .bind(write.completed_at)
    .bind(policy == ReplayPolicy::BestScore)
    .execute(executor)
    .await?;

    Ok(())
}

async fn insert_progress_if_absent<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    write: &LevelProgressWrite,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO user_level_progress
            (user_id, level_id, status, score, max_score, correct_answers, total_questions, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, level_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(&write.level_id)
    .bind(write.status.as_str())
    .bind(write.score)
    .bind(write.max_score)
    .bind(write.correct_answers)
    .bind(write.total_questions)
    .bind(write.completed_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn promote_locked<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    level_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_level_progress
        SET status = 'current', updated_at = NOW()
        WHERE user_id = $1 AND level_id = $2 AND status = 'locked'
        "#,
    )
    .bind(user_id)
    .bind(level_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn category_row_exists<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    category_id: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT total_score FROM user_category_scores WHERE user_id = $1 AND category_id = $2",
    )
    .bind(user_id)
    .bind(category_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.is_some())
}

async fn initialize_category_scores<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    category_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_category_scores (user_id, category_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, category_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .execute(executor)
    .await?;

    Ok(())
}

async fn initialize_level_rows<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    level_ids: &[String],
) -> Result<(), sqlx::Error> {
    // First level of the chain starts as 'current', the rest 'locked'.
    sqlx::query(
        r#"
        INSERT INTO user_level_progress (user_id, level_id, status)
        SELECT $1, t.level_id, CASE WHEN t.ord = 1 THEN 'current' ELSE 'locked' END
        FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS t(level_id, ord)
        ON CONFLICT (user_id, level_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(level_ids)
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait]
impl ContentStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, icon, color FROM quiz_categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn list_levels(&self, category_id: &str) -> Result<Vec<Level>, StoreError> {
        let levels = sqlx::query_as::<_, Level>(&format!(
            "SELECT {} FROM quiz_levels WHERE category_id = $1 ORDER BY level_number ASC",
            LEVEL_COLUMNS
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }

    async fn get_level(&self, level_id: &str) -> Result<Option<Level>, StoreError> {
        let level = sqlx::query_as::<_, Level>(&format!(
            "SELECT {} FROM quiz_levels WHERE id = $1",
            LEVEL_COLUMNS
        ))
        .bind(level_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    async fn find_level_by_number(
        &self,
        category_id: &str,
        level_number: i32,
    ) -> Result<Option<Level>, StoreError> {
        let level = sqlx::query_as::<_, Level>(&format!(
            "SELECT {} FROM quiz_levels WHERE category_id = $1 AND level_number = $2",
            LEVEL_COLUMNS
        ))
        .bind(category_id)
        .bind(level_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }
}

#[async_trait]
impl QuestionSource for PgStore {
    async fn fetch_questions(
        &self,
        category_id: &str,
        level_id: Option<&str>,
        count: usize,
    ) -> Result<Vec<Question>, StoreError> {
        let rows = match level_id {
            Some(level_id) => {
                sqlx::query_as::<_, QuestionRow>(
                    r#"
                    SELECT id, category_id, level_id, question_text,
                           option_a, option_b, option_c, option_d, correct_answer
                    FROM quiz_questions
                    WHERE category_id = $1 AND level_id = $2
                    ORDER BY id
                    LIMIT $3
                    "#,
                )
                .bind(category_id)
                .bind(level_id)
                .bind(count as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, QuestionRow>(
                    r#"
                    SELECT id, category_id, level_id, question_text,
                           option_a, option_b, option_c, option_d, correct_answer
                    FROM quiz_questions
                    WHERE category_id = $1
                    ORDER BY RANDOM()
                    LIMIT $2
                    "#,
                )
                .bind(category_id)
                .bind(count as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|row| Question::try_from(row).map_err(|e| StoreError::Corrupt(e.to_string())))
            .collect()
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn get_level_progress(
        &self,
        user_id: Uuid,
        category_id: &str,
    ) -> Result<Vec<LevelProgress>, StoreError> {
        let rows = sqlx::query_as::<_, LevelProgress>(&format!(
            r#"
            SELECT {}
            FROM user_level_progress p
            JOIN quiz_levels l ON l.id = p.level_id
            WHERE p.user_id = $1 AND l.category_id = $2
            ORDER BY l.level_number ASC
            "#,
            PROGRESS_COLUMNS
        ))
        .bind(user_id)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn get_level_progress_for_level(
        &self,
        user_id: Uuid,
        level_id: &str,
    ) -> Result<Option<LevelProgress>, StoreError> {
        let row = sqlx::query_as::<_, LevelProgress>(&format!(
            "SELECT {} FROM user_level_progress p WHERE p.user_id = $1 AND p.level_id = $2",
            PROGRESS_COLUMNS
        ))
        .bind(user_id)
        .bind(level_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn upsert_level_progress(
        &self,
        user_id: Uuid,
        write: &LevelProgressWrite,
        policy: ReplayPolicy,
    ) -> Result<(), StoreError> {
        upsert_progress(&self.pool, user_id, write, policy).await?;
        Ok(())
    }

    async fn insert_level_progress_if_absent(
        &self,
        user_id: Uuid,
        write: &LevelProgressWrite,
    ) -> Result<bool, StoreError> {
        Ok(insert_progress_if_absent(&self.pool, user_id, write).await?)
    }

    async fn promote_locked_level(&self, user_id: Uuid, level_id: &str) -> Result<bool, StoreError> {
        Ok(promote_locked(&self.pool, user_id, level_id).await?)
    }

    async fn initialize_category_progress(
        &self,
        user_id: Uuid,
        category_id: &str,
        level_ids: &[String],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        initialize_category_scores(&mut *tx, user_id, category_id).await?;
        initialize_level_rows(&mut *tx, user_id, level_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_category_score(
        &self,
        user_id: Uuid,
        category_id: &str,
    ) -> Result<Option<CategoryScore>, StoreError> {
        let row = sqlx::query_as::<_, CategoryScore>(
            r#"
            SELECT user_id, category_id, total_score, levels_completed, last_played_at
            FROM user_category_scores
            WHERE user_id = $1 AND category_id = $2
            "#,
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_category_scores(&self, user_id: Uuid) -> Result<Vec<CategoryScore>, StoreError> {
        let rows = sqlx::query_as::<_, CategoryScore>(
            r#"
            SELECT user_id, category_id, total_score, levels_completed, last_played_at
            FROM user_category_scores
            WHERE user_id = $1
            ORDER BY category_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn upsert_category_score(&self, score: &CategoryScore) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_category_scores
                (user_id, category_id, total_score, levels_completed, last_played_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, category_id) DO UPDATE SET
                total_score = EXCLUDED.total_score,
                levels_completed = EXCLUDED.levels_completed,
                last_played_at = EXCLUDED.last_played_at,
                updated_at = NOW()
            "#,
        )
        .bind(score.user_id)
        .bind(&score.category_id)
        .bind(score.total_score)
        .bind(score.levels_completed)
        .bind(score.last_played_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_total_score(&self, user_id: Uuid) -> Result<Option<TotalScore>, StoreError> {
        let row = sqlx::query_as::<_, TotalScore>(
            "SELECT user_id, total_score, global_rank FROM user_total_scores WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn upsert_total_score(&self, user_id: Uuid, total_score: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_total_scores (user_id, total_score)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                total_score = EXCLUDED.total_score,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(total_score)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardRow>, StoreError> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT t.user_id, t.total_score, t.global_rank, p.display_name
            FROM user_total_scores t
            LEFT JOIN profiles p ON p.user_id = t.user_id
            ORDER BY t.total_score DESC, t.global_rank ASC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn apply_completion(&self, user_id: Uuid, plan: &CompletionPlan) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(write) = &plan.progress {
            upsert_progress(&mut *tx, user_id, write, plan.replay_policy).await?;
        }

        if let Some(next) = &plan.unlock {
            let created = insert_progress_if_absent(
                &mut *tx,
                user_id,
                &LevelProgressWrite::empty(next, LevelStatus::Current),
            )
            .await?;
            if !created {
                promote_locked(&mut *tx, user_id, next).await?;
            }
        }

        if let Some(points) = plan.accumulate {
            if !category_row_exists(&mut *tx, user_id, &plan.category_id).await? {
                initialize_category_scores(&mut *tx, user_id, &plan.category_id).await?;
                initialize_level_rows(&mut *tx, user_id, &plan.category_levels).await?;
            }

            // In-place increments; no read-modify-write window.
            sqlx::query(
                r#"
                UPDATE user_category_scores
                SET total_score = total_score + $3,
                    levels_completed = levels_completed + 1,
                    last_played_at = $4,
                    updated_at = NOW()
                WHERE user_id = $1 AND category_id = $2
                "#,
            )
            .bind(user_id)
            .bind(&plan.category_id)
            .bind(points)
            .bind(plan.played_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO user_total_scores (user_id, total_score)
                VALUES ($1, $2)
                ON CONFLICT (user_id) DO UPDATE SET
                    total_score = user_total_scores.total_score + EXCLUDED.total_score,
                    updated_at = NOW()
                "#,
            )
            .bind(user_id)
            .bind(points)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_recommendation(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyRecommendation>, StoreError> {
        let row = sqlx::query_as::<_, DailyRecommendation>(
            r#"
            SELECT user_id, category_id, reason, recommendation_date
            FROM daily_recommendations
            WHERE user_id = $1 AND recommendation_date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn save_recommendation(&self, rec: &DailyRecommendation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO daily_recommendations (user_id, category_id, reason, recommendation_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, recommendation_date) DO NOTHING
            "#,
        )
        .bind(rec.user_id)
        .bind(&rec.category_id)
        .bind(&rec.reason)
        .bind(rec.recommendation_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
