//! Matchmaking operation errors.

use crate::infrastructure::ports::RepoError;
use dicebound_domain::{DomainError, GameMode, SessionId};

/// Errors that can occur during queue and match operations.
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Already queued for {0}")]
    AlreadyQueued(GameMode),
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("Caller is not seated in session {0}")]
    NotParticipant(SessionId),
    #[error("Only the host of session {0} may do that")]
    NotHost(SessionId),
    #[error("Invalid transition: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl MatchmakingError {
    /// A conditional write lost its race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Repo(e) if e.is_conflict())
    }
}
