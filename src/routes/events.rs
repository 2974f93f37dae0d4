use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;

use crate::{error::AppError, services::sse_service, state::SharedState};

/// Stream one session's change notifications to a connected client.
///
/// The first event is always a `snapshot` holding the full catch-up state;
/// everything after is a full-row change event in write order. A client that
/// reconnects simply opens the stream again and starts from a fresh snapshot.
#[utoipa::path(
    get,
    path = "/sessions/{code}/events",
    tag = "session",
    params(("code" = String, Path, description = "Join code, matched case-insensitively")),
    responses(
        (status = 200, description = "Session event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Session not found")
    )
)]
pub async fn session_events(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    Ok(sse_service::session_stream(&state, &code).await?)
}

/// Configure the SSE endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sessions/{code}/events", get(session_events))
}
