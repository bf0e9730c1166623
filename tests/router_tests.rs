// tests/router_tests.rs
//
// Drives the router in-process with `oneshot`, no socket involved.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use level_quiz::{
    config::Config,
    questions::StaticQuestionBank,
    routes,
    state::AppState,
    store::{Catalog, MemoryStore},
    utils::jwt::sign_jwt,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test_secret_for_router_tests";

fn create_test_app() -> Router {
    let catalog = Catalog::bundled().expect("Bundled catalog must parse");
    let store = Arc::new(MemoryStore::new(&catalog));
    let bank = Arc::new(StaticQuestionBank::from_catalog(&catalog));
    routes::create_router(AppState::new(
        Config::with_secret(SECRET),
        store.clone(),
        store,
        bank,
    ))
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method("GET").uri(uri);
    let builder = match token {
        Some(token) => builder.header("authorization", format!("Bearer {}", token)),
        None => builder,
    };
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

#[tokio::test]
async fn test_health_reports_ok() {
    let response = create_test_app()
        .oneshot(get("/api/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_user_routes_reject_missing_and_forged_tokens() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(get("/api/me/scores", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forged = sign_jwt(Uuid::new_v4(), "some_other_secret", 600).unwrap();
    let response = app
        .clone()
        .oneshot(get("/api/categories", Some(&forged)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_in_user_starts_with_empty_scores() {
    let token = sign_jwt(Uuid::new_v4(), SECRET, 600).unwrap();
    let response = create_test_app()
        .oneshot(get("/api/me/scores", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_score"], 0);
    assert!(body["category_scores"].as_array().unwrap().is_empty());
}
