//! Session entity - the authoritative record of a two-player match.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::turn_decider::{TurnChoice, TurnDecider, TurnDeciderPhase};
use crate::{DomainError, GameMode, PlayerId, Seat, SessionId, SessionStatus};

/// A filled slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSlot {
    pub player_id: PlayerId,
    pub display_name: String,
}

impl PlayerSlot {
    pub fn new(player_id: PlayerId, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            player_id.to_string()
        } else {
            display_name.trim().to_string()
        };
        Self {
            player_id,
            display_name,
        }
    }

    /// Synthetic opponent used when no human shows up.
    pub fn bot() -> Self {
        Self {
            player_id: PlayerId::bot(),
            display_name: "Bot".to_string(),
        }
    }
}

/// Exactly two slots; each empty or filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slots {
    pub host: Option<PlayerSlot>,
    pub opponent: Option<PlayerSlot>,
}

impl Slots {
    pub fn get(&self, seat: Seat) -> Option<&PlayerSlot> {
        match seat {
            Seat::Host => self.host.as_ref(),
            Seat::Opponent => self.opponent.as_ref(),
        }
    }

    pub fn seat_of(&self, player_id: &PlayerId) -> Option<Seat> {
        if self.host.as_ref().is_some_and(|s| &s.player_id == player_id) {
            Some(Seat::Host)
        } else if self
            .opponent
            .as_ref()
            .is_some_and(|s| &s.player_id == player_id)
        {
            Some(Seat::Opponent)
        } else {
            None
        }
    }

    pub fn is_full(&self) -> bool {
        self.host.is_some() && self.opponent.is_some()
    }

    pub fn filled_count(&self) -> usize {
        usize::from(self.host.is_some()) + usize::from(self.opponent.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    pub game_mode: GameMode,
    pub slots: Slots,
    pub turn_decider: TurnDecider,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    /// Open a session with only the host seated.
    pub fn open(id: SessionId, game_mode: GameMode, host: PlayerSlot, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: SessionStatus::Waiting,
            game_mode,
            slots: Slots {
                host: Some(host),
                opponent: None,
            },
            turn_decider: TurnDecider::default(),
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn seat_of(&self, player_id: &PlayerId) -> Option<Seat> {
        self.slots.seat_of(player_id)
    }

    pub fn host_id(&self) -> Option<&PlayerId> {
        self.slots.host.as_ref().map(|s| &s.player_id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    /// Seat the second player. The session becomes `ready`.
    ///
    /// Re-seating the same player is a no-op; a different player is rejected.
    pub fn fill_opponent(&mut self, slot: PlayerSlot, now: DateTime<Utc>) -> Result<(), DomainError> {
        if let Some(existing) = &self.slots.opponent {
            if existing.player_id == slot.player_id {
                return Ok(());
            }
            return Err(DomainError::slot_taken(Seat::Opponent, &existing.player_id));
        }
        if self.host_id() == Some(&slot.player_id) {
            return Err(DomainError::validation(
                "host cannot also occupy the opponent slot",
            ));
        }
        if self.slots.host.is_none() {
            return Err(DomainError::validation("session has no host"));
        }
        self.status.ensure_transition(SessionStatus::Ready)?;

        self.slots.opponent = Some(slot);
        self.status = SessionStatus::Ready;
        self.touch(now);
        Ok(())
    }

    /// Move `ready` to `turnDecider` with `seat` as decider.
    pub fn begin_turn_decider(&mut self, seat: Seat, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.slots.is_full() {
            return Err(DomainError::invalid_state_transition(
                "turn decider needs both slots filled",
            ));
        }
        self.status.ensure_transition(SessionStatus::TurnDecider)?;
        self.turn_decider.assign(seat)?;
        self.status = SessionStatus::TurnDecider;
        self.touch(now);
        Ok(())
    }

    /// True when `player_id` holds the decider seat.
    pub fn is_decider(&self, player_id: &PlayerId) -> bool {
        match self.turn_decider.decider_slot {
            Some(seat) => self.seat_of(player_id) == Some(seat),
            None => false,
        }
    }

    pub fn mark_rolling(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != SessionStatus::TurnDecider {
            return Err(DomainError::invalid_state_transition(format!(
                "session is {}, not turnDecider",
                self.status
            )));
        }
        self.turn_decider.start_rolling()?;
        self.touch(now);
        Ok(())
    }

    /// Record the decider's call and die; the session becomes `active`.
    pub fn resolve_turn(
        &mut self,
        choice: TurnChoice,
        die: u8,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.status.ensure_transition(SessionStatus::Active)?;
        self.turn_decider.resolve(choice, die)?;
        self.status = SessionStatus::Active;
        self.touch(now);
        Ok(())
    }

    /// Stalled past `grace` with both slots filled and no call made: either
    /// `ready` with no decider yet, or `turnDecider` still awaiting the choice.
    pub fn is_turn_decider_stuck(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        let stalled_phase = match (self.status, self.turn_decider.phase()) {
            (SessionStatus::Ready, TurnDeciderPhase::Pending) => true,
            (SessionStatus::TurnDecider, TurnDeciderPhase::AwaitingChoice) => {
                self.turn_decider.choice.is_none()
            }
            _ => false,
        };
        stalled_phase
            && self.slots.is_full()
            && now.signed_duration_since(self.last_activity_at) > grace
    }

    /// Repair transition for a stuck decider: hands the decision to `seat` and
    /// leaves the session in `awaitingChoice`. Player slots are left untouched.
    pub fn repair_turn_decider(&mut self, seat: Seat, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.slots.opponent.is_none() {
            return Err(DomainError::invalid_state_transition(
                "opponent slot is empty; nothing for the turn decider to repair",
            ));
        }
        match (self.status, self.turn_decider.phase()) {
            (SessionStatus::Ready, TurnDeciderPhase::Pending) => self.begin_turn_decider(seat, now),
            (SessionStatus::TurnDecider, TurnDeciderPhase::AwaitingChoice) => {
                self.turn_decider.reassign(seat);
                self.touch(now);
                Ok(())
            }
            _ => Err(DomainError::invalid_state_transition(
                "only a decider awaiting its choice can be repaired",
            )),
        }
    }

    /// Administrative reset: clears the decider and hands it to `seat`.
    ///
    /// The only backwards status move (`active` -> `turnDecider`).
    pub fn admin_reset_turn_decider(
        &mut self,
        seat: Seat,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.slots.is_full() {
            return Err(DomainError::invalid_state_transition(
                "turn decider needs both slots filled",
            ));
        }
        match self.status {
            SessionStatus::Ready | SessionStatus::TurnDecider | SessionStatus::Active => {}
            other => {
                return Err(DomainError::invalid_state_transition(format!(
                    "cannot reset turn decider of a {} session",
                    other
                )))
            }
        }
        self.turn_decider.reassign(seat);
        self.status = SessionStatus::TurnDecider;
        self.touch(now);
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.status.ensure_transition(SessionStatus::Completed)?;
        self.status = SessionStatus::Completed;
        self.touch(now);
        Ok(())
    }

    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.status.ensure_transition(SessionStatus::Abandoned)?;
        self.status = SessionStatus::Abandoned;
        self.touch(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn slot(id: &str) -> PlayerSlot {
        PlayerSlot::new(PlayerId::new(id).unwrap(), id.to_uppercase())
    }

    fn ready_session() -> Session {
        let mut s = Session::open(SessionId::new(), GameMode::Quick, slot("alice"), t0());
        s.fill_opponent(slot("bob"), t0()).unwrap();
        s
    }

    #[test]
    fn open_seats_only_the_host() {
        let s = Session::open(SessionId::new(), GameMode::Ranked, slot("alice"), t0());
        assert_eq!(s.status, SessionStatus::Waiting);
        assert_eq!(s.slots.filled_count(), 1);
        assert_eq!(s.seat_of(&PlayerId::new("alice").unwrap()), Some(Seat::Host));
    }

    #[test]
    fn opponent_slot_is_never_overwritten() {
        let mut s = ready_session();
        assert_eq!(s.status, SessionStatus::Ready);

        let err = s.fill_opponent(slot("carol"), t0()).unwrap_err();
        assert!(matches!(err, DomainError::SlotTaken { .. }));
        assert_eq!(
            s.slots.opponent.as_ref().unwrap().player_id.as_str(),
            "bob"
        );

        // The same player re-joining is harmless.
        s.fill_opponent(slot("bob"), t0()).unwrap();
        assert_eq!(s.slots.filled_count(), 2);
    }

    #[test]
    fn host_cannot_take_both_slots() {
        let mut s = Session::open(SessionId::new(), GameMode::Quick, slot("alice"), t0());
        assert!(s.fill_opponent(slot("alice"), t0()).is_err());
        assert_eq!(s.status, SessionStatus::Waiting);
    }

    #[test]
    fn full_lifecycle_reaches_completed() {
        let mut s = ready_session();
        s.begin_turn_decider(Seat::Host, t0()).unwrap();
        assert!(s.is_decider(&PlayerId::new("alice").unwrap()));
        assert!(!s.is_decider(&PlayerId::new("bob").unwrap()));

        s.resolve_turn(TurnChoice::Odd, 3, t0()).unwrap();
        assert_eq!(s.status, SessionStatus::Active);
        s.complete(t0()).unwrap();
        assert_eq!(s.status, SessionStatus::Completed);
        assert!(s.abandon(t0()).is_err());
    }

    #[test]
    fn stuck_detection_respects_grace_and_slots() {
        let mut s = ready_session();
        s.begin_turn_decider(Seat::Host, t0()).unwrap();
        let grace = Duration::seconds(30);

        assert!(!s.is_turn_decider_stuck(t0() + Duration::seconds(10), grace));
        assert!(s.is_turn_decider_stuck(t0() + Duration::seconds(31), grace));

        s.repair_turn_decider(Seat::Opponent, t0() + Duration::seconds(31))
            .unwrap();
        assert_eq!(s.turn_decider.decider_slot, Some(Seat::Opponent));
        assert_eq!(s.status, SessionStatus::TurnDecider);
        assert_eq!(s.slots.filled_count(), 2);
    }

    #[test]
    fn idle_ready_session_is_repaired_into_awaiting_choice() {
        let s0 = ready_session();
        let grace = Duration::seconds(30);
        assert!(!s0.is_turn_decider_stuck(t0() + Duration::seconds(5), grace));
        assert!(s0.is_turn_decider_stuck(t0() + Duration::seconds(45), grace));

        let mut s = s0.clone();
        s.repair_turn_decider(Seat::Host, t0() + Duration::seconds(45))
            .unwrap();
        assert_eq!(s.status, SessionStatus::TurnDecider);
        assert_eq!(s.turn_decider.phase(), TurnDeciderPhase::AwaitingChoice);
        assert_eq!(s.slots, s0.slots);
    }

    #[test]
    fn repair_refuses_missing_opponent() {
        let mut s = Session::open(SessionId::new(), GameMode::Quick, slot("alice"), t0());
        let err = s.repair_turn_decider(Seat::Host, t0()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
    }

    #[test]
    fn admin_reset_moves_active_back_to_turn_decider() {
        let mut s = ready_session();
        s.begin_turn_decider(Seat::Host, t0()).unwrap();
        s.resolve_turn(TurnChoice::Even, 2, t0()).unwrap();

        s.admin_reset_turn_decider(Seat::Opponent, t0()).unwrap();
        assert_eq!(s.status, SessionStatus::TurnDecider);
        assert_eq!(s.turn_decider.phase(), TurnDeciderPhase::AwaitingChoice);
        assert_eq!(s.turn_decider.decider_slot, Some(Seat::Opponent));
    }

    #[test]
    fn record_shape_matches_wire_fields() {
        let s = ready_session();
        let json = serde_json::to_value(&s).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in [
            "id",
            "status",
            "gameMode",
            "slots",
            "turnDecider",
            "createdAt",
            "lastActivityAt",
        ] {
            assert!(keys.contains(&key), "missing {}", key);
        }
        assert_eq!(keys.len(), 7);
        assert_eq!(json["slots"]["host"]["playerId"], "alice");
    }
}
