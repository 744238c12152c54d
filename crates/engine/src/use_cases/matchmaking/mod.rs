//! Matchmaking use cases.
//!
//! Queue operations go to the remote authoritative service through the
//! gateway first and fall back to conditional writes against the session
//! directory when it answers `Unavailable`. Direct match operations only
//! touch the directory.

use std::future::Future;
use std::sync::Arc;

mod add_bot;
mod error;
mod join;
mod leave;
mod matches;
mod status;

pub use add_bot::AddBot;
pub use error::MatchmakingError;
pub use join::JoinQueue;
pub use leave::{LeaveOutcome, LeaveQueue};
pub use matches::{MatchOps, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
pub use status::QueueStatus;

use crate::infrastructure::ports::RepoError;

/// Container for matchmaking use cases.
pub struct MatchmakingUseCases {
    pub join: Arc<JoinQueue>,
    pub leave: Arc<LeaveQueue>,
    pub status: Arc<QueueStatus>,
    pub matches: Arc<MatchOps>,
    pub add_bot: Arc<AddBot>,
}

impl MatchmakingUseCases {
    pub fn new(
        join: Arc<JoinQueue>,
        leave: Arc<LeaveQueue>,
        status: Arc<QueueStatus>,
        matches: Arc<MatchOps>,
        add_bot: Arc<AddBot>,
    ) -> Self {
        Self {
            join,
            leave,
            status,
            matches,
            add_bot,
        }
    }
}

/// Run a read-modify-write; if it loses a compare-and-set race, re-read and
/// run it exactly once more. A second loss is surfaced.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    operation: &'static str,
    mut attempt: F,
) -> Result<T, MatchmakingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MatchmakingError>>,
{
    match attempt().await {
        Err(e) if e.is_conflict() => {
            tracing::debug!(operation, error = %e, "Lost a conditional write, retrying once");
            attempt().await
        }
        other => other,
    }
}

/// Deleting something that is already gone is success.
pub(crate) fn ignore_missing(result: Result<(), RepoError>) -> Result<(), RepoError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
