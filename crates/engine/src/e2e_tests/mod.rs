//! Flow tests for the session lifecycle.
//!
//! Each test builds a full [`App`](crate::app::App) on the in-memory
//! directory with a manual clock and a counting remote, and drives it
//! through the use cases. No client-side leave hook runs here: cleanup must
//! come from the server alone.
//!
//! ```bash
//! cargo test -p dicebound-engine --lib e2e_tests
//! ```

mod e2e_helpers;
mod gateway_fallback_tests;
mod lifecycle_tests;

pub use e2e_helpers::*;
