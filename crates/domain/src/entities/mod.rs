//! Entity modules - the records the session directory persists.

mod session;
mod turn_decider;
mod waiting_room;

pub use session::{PlayerSlot, Session, Slots};
pub use turn_decider::{TurnChoice, TurnDecider, TurnDeciderPhase, DIE_FACES};
pub use waiting_room::WaitingRoomEntry;
