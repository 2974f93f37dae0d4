use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the MiniMadness backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::join_session,
        crate::routes::session::submit_answer,
        crate::routes::game::start_game,
        crate::routes::game::start_round,
        crate::routes::game::conclude_round,
        crate::routes::game::advance,
        crate::routes::game::lock_joins,
        crate::routes::events::session_events,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::SessionSummary,
            crate::dto::session::JoinRequest,
            crate::dto::session::JoinResponse,
            crate::dto::session::SnapshotResponse,
            crate::dto::session::LeaderboardEntry,
            crate::dto::session::RoundTiming,
            crate::dto::answer::SubmitAnswerRequest,
            crate::dto::answer::AnswerAck,
            crate::dto::game::ActionResponse,
            crate::store::models::Phase,
            crate::store::models::Team,
            crate::store::models::SessionRow,
            crate::store::models::GameStateRow,
            crate::store::models::PlayerRow,
            crate::store::models::AnswerRow,
            crate::store::models::SessionSnapshot,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Session lifecycle, joining, answers, event stream"),
        (name = "driver", description = "Phase driver operations for the broadcast client"),
    )
)]
pub struct ApiDoc;
