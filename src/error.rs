use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::EngineError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Caller is not allowed to perform a host-only operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A unique value (username, join code) is already taken.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(message) => ServiceError::Conflict(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::UnknownPlayer(_)
            | EngineError::UnknownRole(_)
            | EngineError::UnknownScript(_) => ServiceError::NotFound(message),
            EngineError::ScriptNameTaken(_) => ServiceError::Conflict(message),
            EngineError::InvalidPlayerCount(_)
            | EngineError::SelfNomination
            | EngineError::NoScript
            | EngineError::InvalidScript(_) => ServiceError::InvalidInput(message),
            EngineError::InsufficientRoles { .. }
            | EngineError::AlreadyNominated(_)
            | EngineError::DeadNominator
            | EngineError::DeadNominee
            | EngineError::NoNominationsAllowed(_)
            | EngineError::NoVotingAllowed(_)
            | EngineError::NoVotesRemaining(_)
            | EngineError::NoActionsAllowed(_)
            | EngineError::PreconditionNotMet
            | EngineError::GameEnded
            | EngineError::GameNotStarted
            | EngineError::InvalidTransition { .. }
            | EngineError::LobbyClosed
            | EngineError::AlreadyJoined(_)
            | EngineError::GameFull(_)
            | EngineError::AlreadyDead(_)
            | EngineError::NotDead(_) => ServiceError::InvalidState(message),
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
    /// Caller lacks the rights for this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) | ServiceError::Conflict(message) => {
                AppError::Conflict(message)
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        ServiceError::from(err).into()
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
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::GameStatus;

    fn status_of(err: EngineError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn engine_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(EngineError::UnknownPlayer(Uuid::nil())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(EngineError::SelfNomination), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(EngineError::NoVotingAllowed(GameStatus::Night)),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(EngineError::GameEnded), StatusCode::CONFLICT);
        assert_eq!(
            status_of(EngineError::AlreadyDead(Uuid::nil())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::InvalidScript("no demon".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn storage_conflicts_are_not_outages() {
        let err: ServiceError = StorageError::Conflict("taken".into()).into();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(
            AppError::from(ServiceError::Degraded).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(ServiceError::Forbidden("host only".into()))
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
    }
}
