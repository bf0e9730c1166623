// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{self, catalog, leaderboard, me, quiz},
    state::AppState,
    utils::jwt::{identity_middleware, require_user},
};

/// Assembles the main application router.
///
/// * Every `/api` route runs behind `identity_middleware`; anonymous callers
///   are allowed except on the user-only group.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/sessions", post(quiz::start_session))
        .route(
            "/sessions/{id}",
            get(quiz::get_session).delete(quiz::abandon_session),
        )
        .route("/sessions/{id}/answer", post(quiz::submit_answer))
        .route("/sessions/{id}/next", post(quiz::next_question))
        .route("/sessions/{id}/stream", get(quiz::session_stream));

    // Signed-in users only
    let user_routes = Router::new()
        .route("/categories/{id}/progress", post(catalog::initialize_progress))
        .route("/me/scores", get(me::get_scores))
        .route("/me/recommendation", get(me::get_recommendation))
        .layer(middleware::from_fn(require_user));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/categories", get(catalog::list_categories))
        .route("/categories/{id}/levels", get(catalog::list_levels))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .nest("/quiz", quiz_routes)
        .merge(user_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
