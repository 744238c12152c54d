//! Dicebound domain: session records and the invariants that guard them.
//!
//! Pure data and state transitions - no I/O, no clocks, no randomness.
//! Callers pass `now`, the decider seat and the die face in.

extern crate self as dicebound_domain;

pub mod entities;
pub mod error;
pub mod ids;
pub mod types;

pub use entities::{
    PlayerSlot, Session, Slots, TurnChoice, TurnDecider, TurnDeciderPhase, WaitingRoomEntry,
    DIE_FACES,
};
pub use error::DomainError;
pub use ids::{PlayerId, SessionId, BOT_PLAYER_PREFIX};
pub use types::{GameMode, RoomStatus, Seat, SessionStatus};
