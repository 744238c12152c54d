//! Direct match operations against the session directory.

use std::sync::Arc;

use dicebound_domain::{GameMode, PlayerSlot, Session, SessionId, WaitingRoomEntry};
use dicebound_shared::{MatchListQuery, MatchSummary, SessionDto};

use crate::infrastructure::ports::{ClockPort, OpenRoomScope, SessionDirectory, SessionQuery};

use super::{retry_on_conflict, MatchmakingError};

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 200;

pub struct MatchOps {
    directory: Arc<dyn SessionDirectory>,
    clock: Arc<dyn ClockPort>,
}

impl MatchOps {
    pub fn new(directory: Arc<dyn SessionDirectory>, clock: Arc<dyn ClockPort>) -> Self {
        Self { directory, clock }
    }

    pub async fn list(&self, query: MatchListQuery) -> Result<Vec<MatchSummary>, MatchmakingError> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let sessions = self
            .directory
            .list_sessions(SessionQuery {
                status: query.status,
                game_mode: query.game_mode,
                created_before: None,
                limit: Some(limit),
            })
            .await?;
        Ok(sessions
            .iter()
            .map(|v| MatchSummary::from(&v.record))
            .collect())
    }

    pub async fn get(&self, id: SessionId) -> Result<SessionDto, MatchmakingError> {
        self.directory
            .get_session(id)
            .await?
            .map(|v| SessionDto::from(&v.record))
            .ok_or(MatchmakingError::SessionNotFound(id))
    }

    /// Open a session with the caller as host, bypassing the queue.
    ///
    /// One open room per host and mode; a second create is `AlreadyQueued`.
    pub async fn create(
        &self,
        caller: &PlayerSlot,
        game_mode: GameMode,
    ) -> Result<SessionDto, MatchmakingError> {
        let now = self.clock.now();
        let id = SessionId::new();
        let room = WaitingRoomEntry::open(id, caller.player_id.clone(), game_mode, now);
        let session = Session::open(id, game_mode, caller.clone(), now);

        match self
            .directory
            .open_room(&room, &session, OpenRoomScope::Host)
            .await
        {
            Ok(()) => {
                tracing::info!(session_id = %id, player_id = %caller.player_id, game_mode = %game_mode, "Match created");
                Ok(SessionDto::from(&session))
            }
            Err(e) if e.is_conflict() => Err(MatchmakingError::AlreadyQueued(game_mode)),
            Err(e) => Err(e.into()),
        }
    }

    /// Finish a live match. Only a seated player may do it.
    pub async fn complete(
        &self,
        caller: &PlayerSlot,
        id: SessionId,
    ) -> Result<SessionDto, MatchmakingError> {
        retry_on_conflict("complete", move || async move {
            let current = self
                .directory
                .get_session(id)
                .await?
                .ok_or(MatchmakingError::SessionNotFound(id))?;
            let mut session = current.record;
            if session.seat_of(&caller.player_id).is_none() {
                return Err(MatchmakingError::NotParticipant(id));
            }
            session.complete(self.clock.now())?;
            self.directory
                .update_session(&session, current.version)
                .await?;
            tracing::info!(session_id = %id, "Match completed");
            Ok(SessionDto::from(&session))
        })
        .await
    }
}
