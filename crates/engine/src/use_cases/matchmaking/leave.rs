//! Leave queue use case.
//!
//! Idempotent: leaving a session that is gone, finished, or was never joined
//! succeeds. A session that never reached `ready` is deleted; one that did is
//! marked `abandoned` so the opponent can see the departure.

use std::sync::Arc;

use dicebound_domain::{PlayerSlot, SessionId, SessionStatus};
use dicebound_shared::LeaveQueueResponse;

use crate::infrastructure::gateway::MatchGateway;
use crate::infrastructure::ports::{ClockPort, SessionDirectory};

use super::{ignore_missing, retry_on_conflict, MatchmakingError};

/// What a local leave did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Nothing bound, or already finished
    NoOp,
    Deleted(SessionId),
    Abandoned(SessionId),
}

pub struct LeaveQueue {
    gateway: Arc<MatchGateway>,
    directory: Arc<dyn SessionDirectory>,
    clock: Arc<dyn ClockPort>,
}

impl LeaveQueue {
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

    /// Tell the remote service, then clean up locally regardless.
    ///
    /// Without `session_id` the caller's current binding is used.
    pub async fn execute(
        &self,
        caller: &PlayerSlot,
        session_id: Option<SessionId>,
    ) -> Result<LeaveQueueResponse, MatchmakingError> {
        if let Err(reason) = self.gateway.leave(caller).await {
            tracing::debug!(
                player_id = %caller.player_id,
                reason = %reason,
                "Remote leave unavailable"
            );
        }

        let outcome = self.leave_local(caller, session_id).await?;
        tracing::info!(player_id = %caller.player_id, outcome = ?outcome, "Player left");
        Ok(LeaveQueueResponse { ok: true })
    }

    pub async fn leave_local(
        &self,
        caller: &PlayerSlot,
        session_id: Option<SessionId>,
    ) -> Result<LeaveOutcome, MatchmakingError> {
        retry_on_conflict("leave", move || self.attempt(caller, session_id)).await
    }

    async fn attempt(
        &self,
        caller: &PlayerSlot,
        session_id: Option<SessionId>,
    ) -> Result<LeaveOutcome, MatchmakingError> {
        let current = match session_id {
            Some(id) => self.directory.get_session(id).await?,
            None => {
                self.directory
                    .find_live_session_for_player(&caller.player_id)
                    .await?
            }
        };
        let Some(current) = current else {
            return Ok(LeaveOutcome::NoOp);
        };
        let mut session = current.record;
        if session.status.is_terminal() || session.seat_of(&caller.player_id).is_none() {
            return Ok(LeaveOutcome::NoOp);
        }

        let room = self.directory.get_room(session.id).await?;

        if session.status == SessionStatus::Waiting {
            match &room {
                // Pull the room first; a joiner claiming it concurrently makes this conflict.
                Some(room) if room.record.is_open() => {
                    ignore_missing(self.directory.delete_room(session.id, room.version).await)?;
                    ignore_missing(
                        self.directory
                            .delete_session(session.id, current.version)
                            .await,
                    )?;
                    return Ok(LeaveOutcome::Deleted(session.id));
                }
                None => {
                    ignore_missing(
                        self.directory
                            .delete_session(session.id, current.version)
                            .await,
                    )?;
                    return Ok(LeaveOutcome::Deleted(session.id));
                }
                // Claimed but not yet filled: abandon so the joiner's fill fails.
                Some(_) => {}
            }
        }

        session.abandon(self.clock.now())?;
        self.directory
            .update_session(&session, current.version)
            .await?;

        if let Some(room) = room {
            if let Err(e) = self.directory.delete_room(session.id, room.version).await {
                tracing::debug!(session_id = %session.id, error = %e, "Room cleanup skipped");
            }
        }
        Ok(LeaveOutcome::Abandoned(session.id))
    }
}
