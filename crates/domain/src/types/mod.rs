//! # Dicebound Domain Types
//!
//! Closed vocabularies shared by the session records, the wire protocol
//! and the storage layer. Every enumeration here round-trips through its
//! `Display`/`FromStr` pair using the same lowercase camel tags the wire uses.

mod game_mode;
pub use game_mode::GameMode;

mod seat;
pub use seat::Seat;

mod status;
pub use status::{RoomStatus, SessionStatus};
