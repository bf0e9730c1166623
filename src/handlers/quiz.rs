// src/handlers/quiz.rs

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{self, Stream};
use tokio::time::sleep;
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::{
        AttemptMode, AttemptOutcome, AttemptScope, AttemptSummary, QuizSession, Selection,
        SessionRegistry, SessionState,
    },
    error::{AppError, QuizError},
    models::{
        identity::Identity,
        session::{AdvanceResponse, AnswerRequest, AttemptResult, SessionView, StartSessionRequest},
        timer::{QuestionClosed, TimerEvent, TimerTick},
    },
    services::{Completion, leaderboard::position_in},
    state::AppState,
};

const SAVE_FAILED_NOTICE: &str = "Your score could not be saved. Please try again later.";
const SIGN_IN_NOTICE: &str = "Sign in to save your progress.";

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Quiz session {} not found", id))
}

/// Starts an attempt: loads its questions and opens the first one.
///
/// An empty selection still creates the session, in state
/// `content_unavailable`.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if payload.mode == AttemptMode::Level && payload.level_id.is_none() {
        return Err(AppError::BadRequest(
            "Level mode requires a level_id".to_string(),
        ));
    }

    let scope = AttemptScope {
        category_id: payload.category_id,
        level_id: payload.level_id,
    };
    let mut session = QuizSession::new(scope, payload.mode, state.session_settings());

    if session.load(state.questions.as_ref()).await == &SessionState::Ready {
        session.start()?;
    }

    let id = state.sessions.insert(identity.user_id(), session.clone()).await;
    tracing::info!(
        "Started quiz session {} ({:?}, {:?}) for {:?}: {}",
        id,
        session.mode(),
        session.scope(),
        identity,
        session.state().name()
    );

    Ok((StatusCode::CREATED, Json(SessionView::new(id, &session))))
}

/// Current view of a session. Elapsed time is applied first.
pub async fn get_session(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .sessions
        .with_session(id, &identity, |session| SessionView::new(id, session))
        .await
        .ok_or_else(|| session_not_found(id))?;

    Ok(Json(view))
}

/// Answers the current question; the response carries the feedback.
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .sessions
        .with_session(id, &identity, |session| {
            session.select(payload.option)?;
            Ok::<_, QuizError>(SessionView::new(id, session))
        })
        .await
        .ok_or_else(|| session_not_found(id))??;

    Ok(Json(view))
}

/// Moves past the feedback screen. After the last question the attempt is
/// persisted and summarized, and the session is discarded; a failed save
/// still returns the summary.
pub async fn next_question(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (outcome, view) = state
        .sessions
        .with_session(id, &identity, |session| {
            let outcome = session.advance()?;
            Ok::<_, QuizError>((outcome, SessionView::new(id, session)))
        })
        .await
        .ok_or_else(|| session_not_found(id))??;

    let result = match outcome {
        Some(outcome) => {
            tracing::info!(
                "Quiz session {} finished: {}/{} correct, {} points",
                id,
                outcome.correct_answers,
                outcome.total_questions,
                outcome.points
            );
            let result = finish(&state, &identity, &outcome).await;
            state.sessions.remove(id, &identity).await;
            Some(result)
        }
        None => None,
    };

    Ok(Json(AdvanceResponse {
        session: view,
        result,
    }))
}

async fn finish(state: &AppState, identity: &Identity, outcome: &AttemptOutcome) -> AttemptResult {
    let (persisted, notice, scores) = match state.coordinator.finish_attempt(identity, outcome).await
    {
        Ok(Completion::Applied(overview)) => (true, None, Some(overview)),
        Ok(Completion::Skipped) => (false, Some(SIGN_IN_NOTICE.to_string()), None),
        Err(e) => {
            tracing::error!("Failed to record attempt for {:?}: {}", identity, e);
            (false, Some(SAVE_FAILED_NOTICE.to_string()), None)
        }
    };

    let next_level_id = match &outcome.scope.level_id {
        Some(level_id) => state
            .coordinator
            .next_level_id(level_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to look up level after {}: {}", level_id, e);
                None
            }),
        None => None,
    };

    let placement = match identity.user_id() {
        Some(user_id) => match state
            .leaderboard
            .fetch_leaderboard(state.config.leaderboard_limit)
            .await
        {
            Ok(entries) => position_in(&entries, user_id),
            Err(e) => {
                tracing::warn!("Failed to load leaderboard for placement: {}", e);
                None
            }
        },
        None => None,
    };

    AttemptResult {
        summary: AttemptSummary::new(outcome, next_level_id, placement),
        persisted,
        notice,
        scores,
    }
}

/// Discards a session. Nothing is persisted.
pub async fn abandon_session(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .remove(id, &identity)
        .await
        .ok_or_else(|| session_not_found(id))?;
    session.abandon();

    Ok(StatusCode::NO_CONTENT)
}

/// SSE endpoint for the countdown of the current question.
/// GET /api/quiz/sessions/{id}/stream
pub async fn session_stream(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if state
        .sessions
        .with_session(id, &identity, |_| ())
        .await
        .is_none()
    {
        return Err(session_not_found(id));
    }

    tracing::info!("Client connected to SSE stream: session={}", id);
    let stream = timer_stream(
        state.sessions.clone(),
        id,
        identity,
        state.config.question_time_limit,
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Timer events for the question open when the stream starts. Ends after the
/// first event that closes the question, or when the session is gone.
fn timer_stream(
    sessions: Arc<SessionRegistry>,
    id: Uuid,
    identity: Identity,
    total_seconds: u32,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (sessions, true, false),
        move |(sessions, first, finished)| async move {
            if finished {
                return None;
            }
            if !first {
                sleep(sessions.tick_interval()).await;
            }

            let event = sessions
                .with_session(id, &identity, |session| {
                    timer_event(id, session, total_seconds)
                })
                .await?;

            let sse = Event::default()
                .event(event.event_name())
                .data(event.to_sse_data());
            if event.is_final() {
                tracing::info!("Timer stream closed: session={} ({})", id, event.event_name());
            }
            let done = event.is_final();

            Some((Ok(sse), (sessions, false, done)))
        },
    )
}

fn timer_event(id: Uuid, session: &QuizSession, total_seconds: u32) -> TimerEvent {
    let question_index = session.cursor();

    if session.state() == &SessionState::Answering {
        return TimerEvent::TimerTick(TimerTick {
            session_id: id,
            question_index,
            remaining_seconds: session.time_left(),
            total_seconds,
        });
    }

    let closed = QuestionClosed {
        session_id: id,
        question_index,
        state: session.state().name().to_string(),
    };
    match session.feedback() {
        Some(answer) if answer.selection == Selection::TimedOut => TimerEvent::TimeExpired(closed),
        _ => TimerEvent::QuestionClosed(closed),
    }
}
