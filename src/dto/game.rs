use serde::Serialize;
use utoipa::ToSchema;

use crate::store::{models::Phase, storage::WriteOutcome};

/// Result of a phase-driver operation.
///
/// A stale guard is reported as `applied = false` with the authoritative
/// phase, never as an HTTP error: the caller that lost the race learns what
/// actually happened and carries on.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Whether this invocation performed the write.
    pub applied: bool,
    /// The session's phase after the attempt.
    pub phase: Phase,
    /// Question index after the attempt.
    pub current_question_index: usize,
    /// Game state version after the attempt.
    pub version: u64,
}

impl From<WriteOutcome> for ActionResponse {
    fn from(outcome: WriteOutcome) -> Self {
        let applied = outcome.applied();
        let state = outcome.into_state();
        Self {
            applied,
            phase: state.phase,
            current_question_index: state.current_question_index,
            version: state.version,
        }
    }
}
