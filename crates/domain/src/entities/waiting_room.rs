//! WaitingRoomEntry entity - a session still missing its second player.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, GameMode, PlayerId, RoomStatus, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingRoomEntry {
    /// Same id as the session this entry stubs
    pub room_id: SessionId,
    pub host_id: PlayerId,
    pub game_mode: GameMode,
    pub created_at: DateTime<Utc>,
    pub status: RoomStatus,
}

impl WaitingRoomEntry {
    pub fn open(room_id: SessionId, host_id: PlayerId, game_mode: GameMode, now: DateTime<Utc>) -> Self {
        Self {
            room_id,
            host_id,
            game_mode,
            created_at: now,
            status: RoomStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == RoomStatus::Open
    }

    /// `open` -> `claimed`.
    pub fn claim(&mut self, claimant: &PlayerId) -> Result<(), DomainError> {
        if &self.host_id == claimant {
            return Err(DomainError::validation("host cannot claim their own room"));
        }
        if !self.is_open() {
            return Err(DomainError::invalid_state_transition(format!(
                "room is {}, not open",
                self.status
            )));
        }
        self.status = RoomStatus::Claimed;
        Ok(())
    }
}
