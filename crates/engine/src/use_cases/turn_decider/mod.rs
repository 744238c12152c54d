//! Turn decider use cases.
//!
//! Decides which seat acts first once both slots are filled. Every write is a
//! compare-and-set on the session; a lost race re-reads once, and a choice
//! that was already recorded turns a retried submit into a no-op.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dicebound_domain::{
    PlayerSlot, Seat, Session, SessionId, SessionStatus, TurnChoice, TurnDeciderPhase, DIE_FACES,
};
use dicebound_shared::SessionDto;

use crate::infrastructure::ports::{
    ClockPort, RandomPort, SessionDirectory, SessionQuery, Version, Versioned,
};

mod error;

pub use error::TurnDeciderError;

pub struct TurnDeciderService {
    directory: Arc<dyn SessionDirectory>,
    random: Arc<dyn RandomPort>,
    clock: Arc<dyn ClockPort>,
    /// How long a decider may sit without a call before repair kicks in
    grace: Duration,
}

impl TurnDeciderService {
    pub fn new(
        directory: Arc<dyn SessionDirectory>,
        random: Arc<dyn RandomPort>,
        clock: Arc<dyn ClockPort>,
        grace: Duration,
    ) -> Self {
        Self {
            directory,
            random,
            clock,
            grace,
        }
    }

    fn random_seat(&self) -> Seat {
        if self.random.gen_range(0, 1) == 0 {
            Seat::Host
        } else {
            Seat::Opponent
        }
    }

    fn roll_die(&self) -> u8 {
        let face = self.random.gen_range(1, i32::from(DIE_FACES));
        u8::try_from(face).unwrap_or(1)
    }

    /// A synthetic decider makes its call immediately.
    fn settle_bot_decider(&self, session: &mut Session, now: DateTime<Utc>) -> Result<(), TurnDeciderError> {
        let decider_is_bot = session
            .turn_decider
            .decider_slot
            .and_then(|seat| session.slots.get(seat))
            .is_some_and(|slot| slot.player_id.is_bot());
        if !decider_is_bot || session.turn_decider.phase() != TurnDeciderPhase::AwaitingChoice {
            return Ok(());
        }
        let choice = if self.random.gen_range(0, 1) == 0 {
            TurnChoice::Odd
        } else {
            TurnChoice::Even
        };
        session.resolve_turn(choice, self.roll_die(), now)?;
        Ok(())
    }

    async fn load(&self, id: SessionId) -> Result<Versioned<Session>, TurnDeciderError> {
        self.directory
            .get_session(id)
            .await?
            .ok_or(TurnDeciderError::SessionNotFound(id))
    }

    async fn store(&self, session: &Session, expected: Version) -> Result<(), TurnDeciderError> {
        self.directory.update_session(session, expected).await?;
        Ok(())
    }

    /// Assign the decider seat at random: `ready` -> `turnDecider`.
    ///
    /// Idempotent once a decider exists.
    pub async fn begin(&self, caller: &PlayerSlot, id: SessionId) -> Result<SessionDto, TurnDeciderError> {
        retry_on_conflict("begin", move || self.begin_attempt(caller, id)).await
    }

    async fn begin_attempt(&self, caller: &PlayerSlot, id: SessionId) -> Result<SessionDto, TurnDeciderError> {
        let current = self.load(id).await?;
        let mut session = current.record;
        if session.seat_of(&caller.player_id).is_none() {
            return Err(TurnDeciderError::NotParticipant(id));
        }
        if session.turn_decider.phase() != TurnDeciderPhase::Pending {
            return Ok(SessionDto::from(&session));
        }

        let now = self.clock.now();
        let seat = self.random_seat();
        session.begin_turn_decider(seat, now)?;
        self.settle_bot_decider(&mut session, now)?;
        self.store(&session, current.version).await?;

        tracing::info!(session_id = %id, decider = %seat, "Turn decider started");
        Ok(SessionDto::from(&session))
    }

    /// The decider signals that the roll animation started.
    pub async fn mark_rolling(&self, caller: &PlayerSlot, id: SessionId) -> Result<SessionDto, TurnDeciderError> {
        retry_on_conflict("mark_rolling", move || self.rolling_attempt(caller, id)).await
    }

    async fn rolling_attempt(&self, caller: &PlayerSlot, id: SessionId) -> Result<SessionDto, TurnDeciderError> {
        let current = self.load(id).await?;
        let mut session = current.record;
        ensure_decider(&session, caller, id)?;
        if session.turn_decider.is_rolling {
            return Ok(SessionDto::from(&session));
        }

        session.mark_rolling(self.clock.now())?;
        self.store(&session, current.version).await?;
        Ok(SessionDto::from(&session))
    }

    /// Record the decider's call and roll the die. The session becomes `active`.
    ///
    /// Resubmitting after resolution returns the recorded result unchanged.
    /// Callers outside the decider seat get `NotYourTurn`, strangers included.
    pub async fn submit_choice(
        &self,
        caller: &PlayerSlot,
        id: SessionId,
        choice: TurnChoice,
    ) -> Result<SessionDto, TurnDeciderError> {
        retry_on_conflict("submit_choice", move || self.choice_attempt(caller, id, choice)).await
    }

    async fn choice_attempt(
        &self,
        caller: &PlayerSlot,
        id: SessionId,
        choice: TurnChoice,
    ) -> Result<SessionDto, TurnDeciderError> {
        let current = self.load(id).await?;
        let mut session = current.record;
        // Anyone outside the decider seat, seated or not, is refused alike.
        if !session.is_decider(&caller.player_id) {
            return Err(TurnDeciderError::NotYourTurn(id));
        }
        if session.turn_decider.phase() == TurnDeciderPhase::Resolved {
            return Ok(SessionDto::from(&session));
        }
        ensure_decider(&session, caller, id)?;

        let die = self.roll_die();
        session.resolve_turn(choice, die, self.clock.now())?;
        self.store(&session, current.version).await?;

        tracing::info!(
            session_id = %id,
            choice = %choice,
            die,
            first_mover = ?session.turn_decider.first_mover(),
            "Turn decided"
        );
        Ok(SessionDto::from(&session))
    }

    /// Administrative reset: clear the decider and assign `seat`, or a random one.
    pub async fn reset(&self, id: SessionId, seat: Option<Seat>) -> Result<SessionDto, TurnDeciderError> {
        retry_on_conflict("reset", move || self.reset_attempt(id, seat)).await
    }

    async fn reset_attempt(&self, id: SessionId, seat: Option<Seat>) -> Result<SessionDto, TurnDeciderError> {
        let current = self.load(id).await?;
        let mut session = current.record;
        let now = self.clock.now();
        let seat = seat.unwrap_or_else(|| self.random_seat());

        session.admin_reset_turn_decider(seat, now)?;
        self.settle_bot_decider(&mut session, now)?;
        self.store(&session, current.version).await?;

        tracing::warn!(session_id = %id, decider = %seat, "Turn decider reset by admin");
        Ok(SessionDto::from(&session))
    }

    /// Find sessions stalled past the grace period and hand the decision to a
    /// freshly drawn seat. Sessions that changed underneath are skipped.
    pub async fn repair_stuck(&self, now: DateTime<Utc>) -> Result<Vec<SessionId>, TurnDeciderError> {
        let mut candidates = self
            .directory
            .list_sessions(SessionQuery::with_status(SessionStatus::TurnDecider))
            .await?;
        candidates.extend(
            self.directory
                .list_sessions(SessionQuery::with_status(SessionStatus::Ready))
                .await?,
        );

        let mut repaired = Vec::new();
        for Versioned { record, version } in candidates {
            if !record.is_turn_decider_stuck(now, self.grace) {
                continue;
            }
            let mut session = record;
            let seat = self.random_seat();
            let repaired_in_memory = session
                .repair_turn_decider(seat, now)
                .map_err(TurnDeciderError::from)
                .and_then(|_| self.settle_bot_decider(&mut session, now));
            if let Err(e) = repaired_in_memory {
                tracing::debug!(session_id = %session.id, error = %e, "Skipping repair");
                continue;
            }

            match self.directory.update_session(&session, version).await {
                Ok(_) => {
                    tracing::warn!(
                        session_id = %session.id,
                        decider = %seat,
                        "Repaired stuck turn decider"
                    );
                    repaired.push(session.id);
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(session_id = %session.id, "Session moved on during repair");
                }
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Failed to repair turn decider");
                }
            }
        }
        Ok(repaired)
    }
}

fn ensure_decider(session: &Session, caller: &PlayerSlot, id: SessionId) -> Result<(), TurnDeciderError> {
    if session.seat_of(&caller.player_id).is_none() {
        return Err(TurnDeciderError::NotParticipant(id));
    }
    if session.status != SessionStatus::TurnDecider
        || session.turn_decider.phase() != TurnDeciderPhase::AwaitingChoice
        || !session.is_decider(&caller.player_id)
    {
        return Err(TurnDeciderError::NotYourTurn(id));
    }
    Ok(())
}

async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut attempt: F) -> Result<T, TurnDeciderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TurnDeciderError>>,
{
    match attempt().await {
        Err(e) if e.is_conflict() => {
            tracing::debug!(operation, error = %e, "Turn decider write lost a race, retrying once");
            attempt().await
        }
        other => other,
    }
}
