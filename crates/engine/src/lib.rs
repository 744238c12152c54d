//! Dicebound Engine library.
//!
//! Pairs two players into a shared session, decides who moves first, and
//! reclaims sessions that clients abandon.
//!
//! ## Structure
//!
//! - `use_cases/` - matchmaking, turn decider and lifecycle reaper
//! - `infrastructure/` - ports, session directory, remote gateway and settings
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Shared helpers for unit and flow tests.
#[cfg(test)]
pub mod test_fixtures;

/// Flow tests against the in-memory directory.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
