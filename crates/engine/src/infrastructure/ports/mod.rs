//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Session Directory (SQLite or in-memory)
//! - The remote authoritative match service (HTTP)
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

pub use error::{RemoteError, RepoError};
pub use external::MatchServicePort;
pub use repos::{OpenRoomScope, SessionDirectory, SessionQuery, Version, Versioned};
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::MockMatchServicePort;
#[cfg(test)]
pub use repos::MockSessionDirectory;
