//! Join queue use case.
//!
//! Find-or-create a session for the caller in a game mode.

use std::sync::Arc;

use dicebound_domain::{
    GameMode, PlayerSlot, Session, SessionId, SessionStatus, WaitingRoomEntry,
};
use dicebound_shared::JoinQueueResponse;

use crate::infrastructure::gateway::MatchGateway;
use crate::infrastructure::ports::{
    ClockPort, OpenRoomScope, RepoError, SessionDirectory, Version,
};

use super::{ignore_missing, retry_on_conflict, MatchmakingError};

pub struct JoinQueue {
    gateway: Arc<MatchGateway>,
    directory: Arc<dyn SessionDirectory>,
    clock: Arc<dyn ClockPort>,
}

impl JoinQueue {
    pub fn new(
        gateway: Arc<MatchGateway>,
        directory: Arc<dyn SessionDirectory>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            gateway,
            directory,
            clock,
        }
    }

    /// Remote answer verbatim when the service is reachable, local otherwise.
    pub async fn execute(
        &self,
        caller: &PlayerSlot,
        game_mode: GameMode,
    ) -> Result<JoinQueueResponse, MatchmakingError> {
        match self.gateway.join(caller, game_mode).await {
            Ok(response) => return Ok(response),
            Err(reason) => tracing::debug!(
                player_id = %caller.player_id,
                game_mode = %game_mode,
                reason = %reason,
                "Remote join unavailable, resolving against the session directory"
            ),
        }

        let session = self.join_local(caller, game_mode).await?;
        tracing::info!(
            session_id = %session.id,
            player_id = %caller.player_id,
            status = %session.status,
            "Player joined locally"
        );
        Ok(JoinQueueResponse::from(&session))
    }

    /// Local find-or-create. Losing a race re-reads and tries once more.
    pub async fn join_local(
        &self,
        caller: &PlayerSlot,
        game_mode: GameMode,
    ) -> Result<Session, MatchmakingError> {
        retry_on_conflict("join", move || self.attempt(caller, game_mode)).await
    }

    async fn attempt(
        &self,
        caller: &PlayerSlot,
        game_mode: GameMode,
    ) -> Result<Session, MatchmakingError> {
        // A retried join from a player who is already seated returns their session.
        if let Some(current) = self
            .directory
            .find_live_session_for_player(&caller.player_id)
            .await?
        {
            if current.record.game_mode == game_mode {
                if current.record.status == SessionStatus::Waiting {
                    return Err(MatchmakingError::AlreadyQueued(game_mode));
                }
                return Ok(current.record);
            }
        }

        let open_rooms = self.directory.find_open_rooms(game_mode).await?;
        if open_rooms
            .iter()
            .any(|room| room.record.host_id == caller.player_id)
        {
            return Err(MatchmakingError::AlreadyQueued(game_mode));
        }

        match open_rooms.into_iter().next() {
            Some(room) => self.claim(caller, room.record, room.version).await,
            None => self.open(caller, game_mode).await,
        }
    }

    async fn claim(
        &self,
        caller: &PlayerSlot,
        mut room: WaitingRoomEntry,
        room_version: Version,
    ) -> Result<Session, MatchmakingError> {
        let now = self.clock.now();
        let session_id = room.room_id;

        let current = match self.directory.get_session(session_id).await? {
            Some(current) if current.record.status == SessionStatus::Waiting => current,
            _ => {
                // The host left or the reaper got there first; drop the husk.
                ignore_missing(self.directory.delete_room(session_id, room_version).await)?;
                return Err(stale(session_id));
            }
        };

        room.claim(&caller.player_id)?;
        let mut session = current.record;
        session.fill_opponent(caller.clone(), now)?;

        // Room and seat land together or not at all.
        match self
            .directory
            .claim_room(&room, room_version, &session, current.version)
            .await
        {
            Ok(_) => Ok(session),
            Err(e) if e.is_not_found() => Err(stale(session_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(
        &self,
        caller: &PlayerSlot,
        game_mode: GameMode,
    ) -> Result<Session, MatchmakingError> {
        let now = self.clock.now();
        let id = SessionId::new();
        let room = WaitingRoomEntry::open(id, caller.player_id.clone(), game_mode, now);
        let session = Session::open(id, game_mode, caller.clone(), now);

        self.directory
            .open_room(&room, &session, OpenRoomScope::Mode)
            .await?;
        Ok(session)
    }
}

fn stale(id: SessionId) -> MatchmakingError {
    MatchmakingError::Repo(RepoError::conflict("Session", id))
}
