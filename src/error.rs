use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::questions::SupplierError,
    state::{AbortError, ApplyError, ParticipantId, PlanError},
};

/// Errors raised while handling a participant's request.
///
/// None of them is fatal: they are reported to the requesting participant only.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No room is registered under the requested key.
    #[error("room `{0}` not found")]
    RoomNotFound(String),
    /// The room already holds its maximum number of participants.
    #[error("room `{room_key}` is full ({capacity} participants)")]
    RoomFull {
        /// Key of the full room.
        room_key: String,
        /// Configured participant cap.
        capacity: usize,
    },
    /// A room with this key already exists.
    #[error("room `{0}` already exists")]
    RoomAlreadyExists(String),
    /// The participant must join a room before issuing this request.
    #[error("participant is not in a room")]
    NotInRoom,
    /// The request does not fit the room's current game phase.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    /// The question supplier could not provide a question sequence.
    #[error("question supplier failure")]
    QuestionSupplierFailure(#[source] SupplierError),
    /// The participant is not tracked by the room.
    #[error("unknown participant `{0}`")]
    UnknownParticipant(ParticipantId),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Stable machine-readable code sent alongside `room-error` notices.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::RoomNotFound(_) => "room_not_found",
            ServiceError::RoomFull { .. } => "room_full",
            ServiceError::RoomAlreadyExists(_) => "room_already_exists",
            ServiceError::NotInRoom => "not_in_room",
            ServiceError::InvalidStateTransition(_) => "invalid_state_transition",
            ServiceError::QuestionSupplierFailure(_) => "question_supplier_failure",
            ServiceError::UnknownParticipant(_) => "unknown_participant",
            ServiceError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<SupplierError> for ServiceError {
    fn from(err: SupplierError) -> Self {
        ServiceError::QuestionSupplierFailure(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {}", err))
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
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::RoomNotFound(_)
            | ServiceError::NotInRoom
            | ServiceError::UnknownParticipant(_) => AppError::NotFound(message),
            ServiceError::RoomFull { .. }
            | ServiceError::RoomAlreadyExists(_)
            | ServiceError::InvalidStateTransition(_) => AppError::Conflict(message),
            ServiceError::QuestionSupplierFailure(_) => AppError::ServiceUnavailable(message),
            ServiceError::InvalidInput(_) => AppError::BadRequest(message),
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
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidStateTransition("a game start is already pending".into())
            }
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidStateTransition(invalid.to_string())
            }
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => {
                ServiceError::InvalidStateTransition("no game start is pending".into())
            }
            ApplyError::IdMismatch { .. } => ServiceError::InvalidStateTransition(
                "pending game start does not match".into(),
            ),
        }
    }
}

impl From<AbortError> for ServiceError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => {
                ServiceError::InvalidStateTransition("no pending game start".into())
            }
            AbortError::IdMismatch { .. } => {
                ServiceError::InvalidStateTransition("game start plan does not match".into())
            }
        }
    }
}
