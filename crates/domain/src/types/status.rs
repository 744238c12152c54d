//! Lifecycle status enumerations for sessions and waiting rooms.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Phase of a session.
///
/// Transitions only move forward (see [`SessionStatus::can_transition_to`]);
/// the administrative turn-decider reset is the single exception and is
/// modelled on `Session` itself, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// Host seated, opponent slot empty
    Waiting,
    /// Both slots filled, turn decider not started
    Ready,
    /// Deciding who acts first
    TurnDecider,
    /// Match in progress
    Active,
    /// Finished cleanly
    Completed,
    /// A player left or the reaper gave up on it
    Abandoned,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 6] = [
        SessionStatus::Waiting,
        SessionStatus::Ready,
        SessionStatus::TurnDecider,
        SessionStatus::Active,
        SessionStatus::Completed,
        SessionStatus::Abandoned,
    ];

    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (Waiting, Ready) | (Ready, TurnDecider) | (TurnDecider, Active) | (Active, Completed) => {
                true
            }
            (Waiting | Ready | TurnDecider | Active, Abandoned) => true,
            (Completed | Abandoned, _) => false,
            (Waiting | Ready | TurnDecider | Active, _) => false,
        }
    }

    /// Check a transition, producing a domain error when it is not allowed.
    pub fn ensure_transition(self, next: SessionStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::invalid_state_transition(format!(
                "session cannot move from {} to {}",
                self, next
            )))
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }

    /// Both players are bound and the match has not ended.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SessionStatus::Ready | SessionStatus::TurnDecider | SessionStatus::Active
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Ready => "ready",
            SessionStatus::TurnDecider => "turnDecider",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        SessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::parse(format!("Unknown session status: {}", trimmed)))
    }
}

/// Status of a waiting-room entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomStatus {
    Open,
    Claimed,
    /// Timed out elsewhere. The local reaper deletes stale rooms instead of
    /// writing this, but records carrying it are still read.
    Expired,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Open => "open",
            RoomStatus::Claimed => "claimed",
            RoomStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(RoomStatus::Open),
            "claimed" => Ok(RoomStatus::Claimed),
            "expired" => Ok(RoomStatus::Expired),
            other => Err(DomainError::parse(format!("Unknown room status: {}", other))),
        }
    }
}
