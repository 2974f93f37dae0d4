use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        answer::{AnswerAck, SubmitAnswerRequest},
        session::{CreateSessionRequest, JoinRequest, JoinResponse, SessionSummary, SnapshotResponse},
    },
    error::AppError,
    services::{answer_service, session_service},
    state::SharedState,
};

/// Routes for session lifecycle: creation, catch-up reads, joining, answers.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{code}", get(get_session))
        .route("/sessions/{code}/join", post(join_session))
        .route("/sessions/{code}/answers", post(submit_answer))
}

/// Create a fresh session under a new join code.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionSummary)
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    payload.validate()?;
    let summary = session_service::create_session(&state, payload).await?;
    Ok(Json(summary))
}

/// Catch-up read: the full snapshot an attaching client renders from.
#[utoipa::path(
    get,
    path = "/sessions/{code}",
    tag = "session",
    params(("code" = String, Path, description = "Join code, matched case-insensitively")),
    responses(
        (status = 200, description = "Current session snapshot", body = SnapshotResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<SnapshotResponse>, AppError> {
    let snapshot = session_service::snapshot(&state, &code).await?;
    Ok(Json(snapshot))
}

/// Join a session. Re-joining under the same name recovers the existing
/// identity; a locked session answers 409.
#[utoipa::path(
    post,
    path = "/sessions/{code}/join",
    tag = "session",
    params(("code" = String, Path, description = "Join code, matched case-insensitively")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Joined (or re-joined)", body = JoinResponse),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session already started")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, AppError> {
    payload.validate()?;
    let response = session_service::join_session(&state, &code, payload).await?;
    Ok(Json(response))
}

/// Record an answer for the live question.
#[utoipa::path(
    post,
    path = "/sessions/{code}/answers",
    tag = "session",
    params(("code" = String, Path, description = "Join code, matched case-insensitively")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerAck),
        (status = 404, description = "Session not found"),
        (status = 409, description = "No live round, or the player already answered")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerAck>, AppError> {
    payload.validate()?;
    let ack = answer_service::submit_answer(&state, &code, payload).await?;
    Ok(Json(ack))
}
