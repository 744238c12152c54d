//! Add-bot use case.
//!
//! Fills the empty opponent slot with a synthetic player. The response always
//! echoes the requested match id, whichever path produced it.

use std::sync::Arc;

use dicebound_domain::{PlayerSlot, Session, SessionId, SessionStatus};
use dicebound_shared::{AddBotResponse, SlotsDto};

use crate::infrastructure::gateway::MatchGateway;
use crate::infrastructure::ports::{ClockPort, SessionDirectory};

use super::{retry_on_conflict, MatchmakingError};

pub struct AddBot {
    gateway: Arc<MatchGateway>,
    directory: Arc<dyn SessionDirectory>,
    clock: Arc<dyn ClockPort>,
}

fn response(match_id: SessionId, session: &Session) -> AddBotResponse {
    AddBotResponse {
        match_id: match_id.to_uuid(),
        status: session.status,
        slots: SlotsDto::from(&session.slots),
    }
}

impl AddBot {
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

    pub async fn execute(
        &self,
        caller: &PlayerSlot,
        match_id: SessionId,
    ) -> Result<AddBotResponse, MatchmakingError> {
        match self.gateway.add_bot(caller, match_id).await {
            Ok(mut remote) => {
                remote.match_id = match_id.to_uuid();
                return Ok(remote);
            }
            Err(reason) => tracing::debug!(
                session_id = %match_id,
                reason = %reason,
                "Remote add-bot unavailable, filling locally"
            ),
        }

        let session = self.add_bot_local(caller, match_id).await?;
        Ok(response(match_id, &session))
    }

    pub async fn add_bot_local(
        &self,
        caller: &PlayerSlot,
        match_id: SessionId,
    ) -> Result<Session, MatchmakingError> {
        retry_on_conflict("add_bot", move || self.attempt(caller, match_id)).await
    }

    async fn attempt(
        &self,
        caller: &PlayerSlot,
        match_id: SessionId,
    ) -> Result<Session, MatchmakingError> {
        let current = self
            .directory
            .get_session(match_id)
            .await?
            .ok_or(MatchmakingError::SessionNotFound(match_id))?;
        let mut session = current.record;

        if session.host_id() != Some(&caller.player_id) {
            return Err(MatchmakingError::NotHost(match_id));
        }
        // Someone (human or bot) already took the seat.
        if session.slots.opponent.is_some() && !session.status.is_terminal() {
            return Ok(session);
        }
        if session.status != SessionStatus::Waiting {
            return Err(MatchmakingError::Domain(
                dicebound_domain::DomainError::invalid_state_transition(format!(
                    "cannot add a bot to a {} session",
                    session.status
                )),
            ));
        }

        let bot = PlayerSlot::bot();
        let open_room = self
            .directory
            .get_room(match_id)
            .await?
            .filter(|room| room.record.is_open());

        session.fill_opponent(bot.clone(), self.clock.now())?;
        match open_room {
            Some(room) => {
                let mut claimed = room.record;
                claimed.claim(&bot.player_id)?;
                self.directory
                    .claim_room(&claimed, room.version, &session, current.version)
                    .await?;
            }
            None => {
                self.directory
                    .update_session(&session, current.version)
                    .await?;
            }
        }
        tracing::info!(session_id = %match_id, "Bot opponent added");
        Ok(session)
    }
}
