//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific area of the session
//! lifecycle. Use cases orchestrate the session directory and the gateway.

pub mod lifecycle;
pub mod matchmaking;
pub mod turn_decider;

pub use lifecycle::{LifecycleReaper, SweepReport};
pub use matchmaking::MatchmakingUseCases;
pub use turn_decider::TurnDeciderService;
