//! Turn decider errors.

use crate::infrastructure::ports::RepoError;
use dicebound_domain::{DomainError, SessionId};

#[derive(Debug, thiserror::Error)]
pub enum TurnDeciderError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("Caller is not seated in session {0}")]
    NotParticipant(SessionId),
    /// Caller is not the decider, or the decider is not awaiting a choice
    #[error("Not your turn to decide in session {0}")]
    NotYourTurn(SessionId),
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl TurnDeciderError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Repo(e) if e.is_conflict())
    }
}
