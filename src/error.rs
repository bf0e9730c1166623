// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    // 500 Internal Server Error
    #[error("internal server error: {0}")]
    InternalServerError(String),

    // 400 Bad Request
    #[error("bad request: {0}")]
    BadRequest(String),

    // 401 Unauthorized
    #[error("unauthorized: {0}")]
    AuthError(String),

    // 404 Not Found
    #[error("not found: {0}")]
    NotFound(String),

    // 409 Conflict (e.g., answering a question twice, or a session without content)
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// Failure of a content or progress store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// Domain errors of the quiz engine and the progression coordinator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuizError {
    /// The session found no questions for its category/level; the player
    /// has to pick another one.
    #[error("no questions available for this selection")]
    ContentUnavailable,

    /// A write to the progress store failed; durable progress may be missing.
    #[error("progress could not be saved: {0}")]
    PersistenceFailure(String),

    /// An operation that needs a signed-in user was called anonymously.
    #[error("a signed-in user is required")]
    IdentityMissing,

    /// The action is not allowed in the session's current state.
    #[error("action not allowed while the session is {0}")]
    InvalidTransition(&'static str),

    /// The selected option index is not one of the four options.
    #[error("option {0} is not a valid choice")]
    InvalidOption(i32),

    /// A question from a source violates the canonical schema.
    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    #[error("level '{0}' not found")]
    LevelNotFound(String),
}

impl From<StoreError> for QuizError {
    fn from(err: StoreError) -> Self {
        QuizError::PersistenceFailure(err.to_string())
    }
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::ContentUnavailable => AppError::Conflict(err.to_string()),
            QuizError::IdentityMissing => AppError::AuthError(err.to_string()),
            QuizError::InvalidTransition(_) => AppError::Conflict(err.to_string()),
            QuizError::InvalidOption(_) => AppError::BadRequest(err.to_string()),
            QuizError::LevelNotFound(_) => AppError::NotFound(err.to_string()),
            QuizError::PersistenceFailure(msg) | QuizError::InvalidQuestion(msg) => {
                AppError::InternalServerError(msg)
            }
        }
    }
}
