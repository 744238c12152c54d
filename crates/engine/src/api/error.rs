//! HTTP error mapping.
//!
//! Every failure leaves as `{code, message}` with a stable [`ErrorCode`].
//! Storage failures read as "retry shortly"; raw dependency errors never
//! reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dicebound_domain::DomainError;
use dicebound_shared::{ErrorBody, ErrorCode};

use crate::infrastructure::ports::RepoError;
use crate::use_cases::matchmaking::MatchmakingError;
use crate::use_cases::turn_decider::TurnDeciderError;

#[derive(Debug)]
pub enum ApiError {
    BackendUnavailable(String),
    AlreadyQueued(String),
    SessionConflict(String),
    NotYourTurn(String),
    InvalidTransition(String),
    NotFound(String),
    BadRequest(String),
    /// Missing or unusable caller identity
    Unauthorized(String),
    /// Identified, but not allowed to touch this session
    Forbidden(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorCode, &str) {
        match self {
            ApiError::BackendUnavailable(m) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::BackendUnavailable, m)
            }
            ApiError::AlreadyQueued(m) => (StatusCode::CONFLICT, ErrorCode::AlreadyQueued, m),
            ApiError::SessionConflict(m) => (StatusCode::CONFLICT, ErrorCode::SessionConflict, m),
            ApiError::NotYourTurn(m) => (StatusCode::CONFLICT, ErrorCode::NotYourTurn, m),
            ApiError::InvalidTransition(m) => {
                (StatusCode::CONFLICT, ErrorCode::InvalidTransition, m)
            }
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, ErrorCode::Unauthorized, m),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!(error = %message, "Request failed on both remote and local paths");
        }
        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            RepoError::Conflict { .. } => ApiError::SessionConflict(
                "The session changed while we were updating it; please retry".to_string(),
            ),
            other => {
                tracing::error!(error = %other, "Session directory failure");
                ApiError::BackendUnavailable("Matchmaking is unavailable; retry shortly".to_string())
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(_) | DomainError::InvalidId(_) | DomainError::Parse(_) => {
                ApiError::BadRequest(e.to_string())
            }
            DomainError::SlotTaken { .. } | DomainError::InvalidStateTransition(_) => {
                ApiError::InvalidTransition(e.to_string())
            }
        }
    }
}

impl From<MatchmakingError> for ApiError {
    fn from(e: MatchmakingError) -> Self {
        match e {
            MatchmakingError::AlreadyQueued(_) => ApiError::AlreadyQueued(e.to_string()),
            MatchmakingError::SessionNotFound(_) => ApiError::NotFound(e.to_string()),
            MatchmakingError::NotParticipant(_) | MatchmakingError::NotHost(_) => {
                ApiError::Forbidden(e.to_string())
            }
            MatchmakingError::Domain(d) => d.into(),
            MatchmakingError::Repo(r) => r.into(),
        }
    }
}

impl From<TurnDeciderError> for ApiError {
    fn from(e: TurnDeciderError) -> Self {
        match e {
            TurnDeciderError::SessionNotFound(_) => ApiError::NotFound(e.to_string()),
            TurnDeciderError::NotParticipant(_) => ApiError::Forbidden(e.to_string()),
            TurnDeciderError::NotYourTurn(_) => ApiError::NotYourTurn(e.to_string()),
            TurnDeciderError::InvalidTransition(d) => d.into(),
            TurnDeciderError::Repo(r) => r.into(),
        }
    }
}
