use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::store::storage::StorageError;

/// Errors that can occur in service layer operations.
///
/// Stale phase guards are deliberately NOT represented here: a conditional
/// write whose precondition no longer matches is a silent no-op reported
/// through [`crate::store::storage::WriteOutcome`], never an error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No session exists under the typed code.
    #[error("session not found: {0}")]
    SessionNotFound(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The write collided with something that already exists (double answer,
    /// code collision).
    #[error("conflict: {0}")]
    Conflict(String),
    /// The session no longer accepts joins.
    #[error("session locked: {0}")]
    JoinLocked(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SessionNotFound { code } => ServiceError::SessionNotFound(code),
            StorageError::CodeTaken { .. } | StorageError::DuplicateAnswer { .. } => {
                ServiceError::Conflict(err.to_string())
            }
            StorageError::JoinsLocked { code } => ServiceError::JoinLocked(code),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::SessionNotFound(code) => {
                AppError::NotFound(format!("session `{code}` not found"))
            }
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::JoinLocked(code) => {
                AppError::Conflict(format!("session `{code}` already started"))
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
