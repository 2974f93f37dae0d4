use crate::{dto::health::HealthResponse, state::SharedState, store::SessionStore};

/// Build the health snapshot reported by the healthcheck route.
pub fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_seconds: state.uptime_seconds(),
        sessions: state.store().session_count(),
        questions: state.catalog().len(),
    }
}
