// tests/pg_store_tests.rs
//
// Runs against the database in DATABASE_URL; every test returns early when
// it is unset. Each test seeds its own category so runs do not collide.

use std::sync::Arc;

use chrono::Utc;
use level_quiz::{
    models::{
        identity::Identity,
        progress::{LevelProgressWrite, LevelStatus, ReplayPolicy},
        recommendation::DailyRecommendation,
    },
    questions::QuestionSource,
    services::{Completion, CompletionStrategy, ProgressionCoordinator},
    store::{PgStore, ProgressStore},
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

struct TestDb {
    store: Arc<PgStore>,
    category_id: String,
}

impl TestDb {
    fn level(&self, number: i32) -> String {
        format!("{}-{}", self.category_id, number)
    }

    fn coordinator(&self, strategy: CompletionStrategy, policy: ReplayPolicy) -> ProgressionCoordinator {
        ProgressionCoordinator::new(self.store.clone(), self.store.clone(), strategy, policy, 50)
    }
}

/// Connects, migrates and seeds a fresh category with three levels of five
/// questions. `None` when no database is configured.
async fn setup() -> Option<TestDb> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let category_id = format!("pg{}", &Uuid::new_v4().simple().to_string()[..10]);

    sqlx::query("INSERT INTO quiz_categories (id, name) VALUES ($1, $2)")
        .bind(&category_id)
        .bind(format!("Category {}", category_id))
        .execute(&pool)
        .await
        .expect("Failed to seed category");

    for number in 1..=3 {
        let level_id = format!("{}-{}", category_id, number);
        sqlx::query(
            "INSERT INTO quiz_levels (id, category_id, level_number, name) VALUES ($1, $2, $3, $4)",
        )
        .bind(&level_id)
        .bind(&category_id)
        .bind(number)
        .bind(format!("Level {}", number))
        .execute(&pool)
        .await
        .expect("Failed to seed level");

        for q in 1..=5 {
            sqlx::query(
                r#"
                INSERT INTO quiz_questions
                    (id, category_id, level_id, question_text,
                     option_a, option_b, option_c, option_d, correct_answer)
                VALUES ($1, $2, $3, $4, 'a', 'b', 'c', 'd', $5)
                "#,
            )
            .bind(format!("{}-q{}", level_id, q))
            .bind(&category_id)
            .bind(&level_id)
            .bind(format!("Question {} of {}", q, level_id))
            .bind(q % 4)
            .execute(&pool)
            .await
            .expect("Failed to seed question");
        }
    }

    Some(TestDb {
        store: Arc::new(PgStore::new(pool)),
        category_id,
    })
}

fn applied(completion: Completion) -> level_quiz::models::progress::ScoreOverview {
    match completion {
        Completion::Applied(overview) => overview,
        Completion::Skipped => panic!("completion was skipped"),
    }
}

#[tokio::test]
async fn level_completion_unlocks_only_the_successor() {
    let Some(db) = setup().await else { return };

    for strategy in [CompletionStrategy::Atomic, CompletionStrategy::Orchestrated] {
        let coordinator = db.coordinator(strategy, ReplayPolicy::LastWrite);
        let user = Identity::User(Uuid::new_v4());
        let id = user.user_id().unwrap();

        coordinator
            .initialize_category_progress(&user, &db.category_id)
            .await
            .unwrap();
        coordinator
            .complete_level(&user, &db.level(1), 80, 4, 5)
            .await
            .unwrap();

        let rows = db.store.get_level_progress(id, &db.category_id).await.unwrap();
        let statuses: Vec<LevelStatus> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![LevelStatus::Completed, LevelStatus::Current, LevelStatus::Locked],
            "{:?}",
            strategy
        );
        assert_eq!(rows[0].score, 80);
        assert!(rows[0].completed_at.is_some());
    }
}

#[tokio::test]
async fn completed_successor_is_not_demoted() {
    let Some(db) = setup().await else { return };
    let coordinator = db.coordinator(CompletionStrategy::Atomic, ReplayPolicy::LastWrite);
    let user = Identity::User(Uuid::new_v4());
    let id = user.user_id().unwrap();

    coordinator
        .complete_level(&user, &db.level(2), 60, 3, 5)
        .await
        .unwrap();
    coordinator
        .complete_level(&user, &db.level(1), 100, 5, 5)
        .await
        .unwrap();

    let row = db
        .store
        .get_level_progress_for_level(id, &db.level(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, LevelStatus::Completed);
    assert_eq!(row.score, 60);

    // A locked write never moves a completed row back.
    db.store
        .upsert_level_progress(
            id,
            &LevelProgressWrite::empty(&db.level(2), LevelStatus::Locked),
            ReplayPolicy::LastWrite,
        )
        .await
        .unwrap();
    let row = db
        .store
        .get_level_progress_for_level(id, &db.level(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, LevelStatus::Completed);
}

#[tokio::test]
async fn replay_policies_decide_which_score_is_kept() {
    let Some(db) = setup().await else { return };
    let level = db.level(1);

    for (policy, expected) in [(ReplayPolicy::BestScore, 80), (ReplayPolicy::LastWrite, 40)] {
        let user = Uuid::new_v4();
        for score in [80, 40] {
            db.store
                .upsert_level_progress(
                    user,
                    &LevelProgressWrite::completed(&level, score, 5, score / 20, 5, Utc::now()),
                    policy,
                )
                .await
                .unwrap();
        }

        let row = db
            .store
            .get_level_progress_for_level(user, &level)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.score, expected, "{:?}", policy);
    }
}

#[tokio::test]
async fn scores_accumulate_under_both_strategies() {
    let Some(db) = setup().await else { return };

    for strategy in [CompletionStrategy::Atomic, CompletionStrategy::Orchestrated] {
        let coordinator = db.coordinator(strategy, ReplayPolicy::LastWrite);
        let user = Identity::User(Uuid::new_v4());

        applied(
            coordinator
                .save_category_progress(&user, &db.category_id, None, 150, 250, 3, 5)
                .await
                .unwrap(),
        );
        let overview = applied(
            coordinator
                .save_category_progress(&user, &db.category_id, Some(db.level(1).as_str()), 100, 250, 2, 5)
                .await
                .unwrap(),
        );

        assert_eq!(overview.total_score, 250, "{:?}", strategy);
        let category = overview
            .category_scores
            .iter()
            .find(|s| s.category_id == db.category_id)
            .unwrap();
        assert_eq!(category.total_score, 250);
        assert_eq!(category.levels_completed, 2);
        assert!(category.last_played_at.is_some());
    }
}

#[tokio::test]
async fn level_questions_are_stable_and_unknown_levels_are_empty() {
    let Some(db) = setup().await else { return };

    let first = db
        .store
        .fetch_questions(&db.category_id, Some(db.level(2).as_str()), 5)
        .await
        .unwrap();
    let again = db
        .store
        .fetch_questions(&db.category_id, Some(db.level(2).as_str()), 5)
        .await
        .unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first, again);

    let missing = db
        .store
        .fetch_questions(&db.category_id, Some(db.level(9).as_str()), 5)
        .await
        .unwrap();
    assert!(missing.is_empty());

    let sample = db.store.fetch_questions(&db.category_id, None, 5).await.unwrap();
    assert_eq!(sample.len(), 5);
}

#[tokio::test]
async fn first_saved_recommendation_wins() {
    let Some(db) = setup().await else { return };
    let user = Uuid::new_v4();
    let today = Utc::now().date_naive();

    for reason in ["first", "second"] {
        db.store
            .save_recommendation(&DailyRecommendation {
                user_id: user,
                category_id: db.category_id.clone(),
                reason: reason.to_string(),
                recommendation_date: today,
            })
            .await
            .unwrap();
    }

    let stored = db.store.get_recommendation(user, today).await.unwrap().unwrap();
    assert_eq!(stored.reason, "first");
}
