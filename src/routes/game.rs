use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};

use crate::{
    dto::game::ActionResponse, error::AppError, services::driver_service, state::SharedState,
};

/// Routes for the phase driver, called by the broadcast client. Every
/// operation is idempotent: a stale phase guard reports `applied: false`
/// instead of failing.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{code}/start", post(start_game))
        .route("/sessions/{code}/round/start", post(start_round))
        .route("/sessions/{code}/round/conclude", post(conclude_round))
        .route("/sessions/{code}/advance", post(advance))
        .route("/sessions/{code}/lock", post(lock_joins))
}

/// Close the lobby and enter the countdown.
#[utoipa::path(
    post,
    path = "/sessions/{code}/start",
    tag = "driver",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Attempt recorded", body = ActionResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(driver_service::start_game(&state, &code).await?))
}

/// Put the current question live; fired when a countdown finishes.
#[utoipa::path(
    post,
    path = "/sessions/{code}/round/start",
    tag = "driver",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Attempt recorded", body = ActionResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(driver_service::start_round(&state, &code).await?))
}

/// Close the live round and publish its results.
#[utoipa::path(
    post,
    path = "/sessions/{code}/round/conclude",
    tag = "driver",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Attempt recorded", body = ActionResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn conclude_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(driver_service::conclude_round(&state, &code).await?))
}

/// Leave the results screen for the next round or the terminal minigame.
#[utoipa::path(
    post,
    path = "/sessions/{code}/advance",
    tag = "driver",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Attempt recorded", body = ActionResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn advance(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(driver_service::advance(&state, &code).await?))
}

/// Stop accepting new players.
#[utoipa::path(
    post,
    path = "/sessions/{code}/lock",
    tag = "driver",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Attempt recorded", body = ActionResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn lock_joins(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(driver_service::lock_joins(&state, &code).await?))
}
