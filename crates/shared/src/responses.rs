//! Response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dicebound_domain::{
    GameMode, PlayerSlot, Seat, Session, SessionStatus, Slots, TurnChoice, TurnDecider,
    TurnDeciderPhase,
};

// =============================================================================
// Slots and sessions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub player_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsDto {
    pub host: Option<SlotDto>,
    pub opponent: Option<SlotDto>,
}

impl From<&PlayerSlot> for SlotDto {
    fn from(slot: &PlayerSlot) -> Self {
        Self {
            player_id: slot.player_id.to_string(),
            display_name: slot.display_name.clone(),
        }
    }
}

impl From<&Slots> for SlotsDto {
    fn from(slots: &Slots) -> Self {
        Self {
            host: slots.host.as_ref().map(SlotDto::from),
            opponent: slots.opponent.as_ref().map(SlotDto::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnDeciderDto {
    pub phase: TurnDeciderPhase,
    pub decider_slot: Option<Seat>,
    pub choice: Option<TurnChoice>,
    pub dice_result: Option<u8>,
    pub is_rolling: bool,
    /// Seat that acts first, once resolved
    pub first_mover: Option<Seat>,
}

impl From<&TurnDecider> for TurnDeciderDto {
    fn from(td: &TurnDecider) -> Self {
        Self {
            phase: td.phase(),
            decider_slot: td.decider_slot,
            choice: td.choice,
            dice_result: td.dice_result,
            is_rolling: td.is_rolling,
            first_mover: td.first_mover(),
        }
    }
}

/// Full view of one session (`GET /matches/{id}` and turn-decider routes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: Uuid,
    pub status: SessionStatus,
    pub game_mode: GameMode,
    pub slots: SlotsDto,
    pub turn_decider: TurnDeciderDto,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl From<&Session> for SessionDto {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id.to_uuid(),
            status: s.status,
            game_mode: s.game_mode,
            slots: SlotsDto::from(&s.slots),
            turn_decider: TurnDeciderDto::from(&s.turn_decider),
            created_at: s.created_at,
            last_activity_at: s.last_activity_at,
        }
    }
}

/// Row of `GET /matches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: Uuid,
    pub status: SessionStatus,
    pub game_mode: GameMode,
    pub slots: SlotsDto,
    pub created_at: DateTime<Utc>,
}

impl From<&Session> for MatchSummary {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id.to_uuid(),
            status: s.status,
            game_mode: s.game_mode,
            slots: SlotsDto::from(&s.slots),
            created_at: s.created_at,
        }
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Result of `POST /queue/join`. Returned verbatim when the remote service answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub slots: SlotsDto,
}

impl From<&Session> for JoinQueueResponse {
    fn from(s: &Session) -> Self {
        Self {
            session_id: s.id.to_uuid(),
            status: s.status,
            slots: SlotsDto::from(&s.slots),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveQueueResponse {
    pub ok: bool,
}

/// Current binding of a player; all fields `null` when unbound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusResponse {
    pub session_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
    pub game_mode: Option<GameMode>,
}

impl QueueStatusResponse {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.session_id.is_some()
    }
}

impl From<&Session> for QueueStatusResponse {
    fn from(s: &Session) -> Self {
        Self {
            session_id: Some(s.id.to_uuid()),
            status: Some(s.status),
            game_mode: Some(s.game_mode),
        }
    }
}

/// Result of `POST /matches/{id}/add-bot`. `matchId` always echoes the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBotResponse {
    pub match_id: Uuid,
    pub status: SessionStatus,
    pub slots: SlotsDto,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySnapshot {
    pub endpoint_configured: bool,
    pub config_fingerprint: String,
    /// `None` while the breaker lets calls through
    pub unavailable_until: Option<DateTime<Utc>>,
    pub retry_delay_secs: u64,
}

// =============================================================================
// Errors
// =============================================================================

/// Stable error classification returned in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Remote and local paths both failed
    BackendUnavailable,
    /// Caller already holds an open ticket for the mode
    AlreadyQueued,
    /// A conditional update lost its race twice
    SessionConflict,
    /// Caller is not the decider, or the decider is not awaiting a choice
    NotYourTurn,
    /// Status transition rejected
    InvalidTransition,
    NotFound,
    BadRequest,
    Unauthorized,
    Internal,
    /// Unknown variant for forward compatibility
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicebound_domain::{PlayerId, SessionId};

    #[test]
    fn join_response_reflects_session() {
        let host = PlayerSlot::new(PlayerId::new("alice").unwrap(), "Alice");
        let session = Session::open(SessionId::new(), GameMode::Quick, host, Utc::now());

        let resp = JoinQueueResponse::from(&session);
        assert_eq!(resp.session_id, session.id.to_uuid());
        assert_eq!(resp.status, SessionStatus::Waiting);
        assert_eq!(resp.slots.host.as_ref().unwrap().display_name, "Alice");
        assert!(resp.slots.opponent.is_none());
    }

    #[test]
    fn error_codes_are_screaming_snake() {
        let body = ErrorBody::new(ErrorCode::BackendUnavailable, "retry shortly");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "BACKEND_UNAVAILABLE");

        let unknown: ErrorCode = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(unknown, ErrorCode::Unknown);
    }

    #[test]
    fn unbound_status_serializes_nulls() {
        let json = serde_json::to_value(QueueStatusResponse::none()).unwrap();
        assert!(json["sessionId"].is_null());
        assert!(!QueueStatusResponse::none().is_bound());
    }
}
