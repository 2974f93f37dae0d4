use serde::Serialize;
use utoipa::ToSchema;

/// Health status reported by the backend.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status string, always "ok" while the process is serving.
    pub status: String,
    /// Seconds since the backend started.
    pub uptime_seconds: u64,
    /// Number of sessions currently hosted.
    pub sessions: usize,
    /// Number of questions in the loaded catalog.
    pub questions: usize,
}
