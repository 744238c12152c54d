//! Queue status use case.

use std::sync::Arc;

use dicebound_domain::PlayerSlot;
use dicebound_shared::QueueStatusResponse;

use crate::infrastructure::gateway::MatchGateway;
use crate::infrastructure::ports::SessionDirectory;

use super::MatchmakingError;

/// Current binding of a player.
///
/// A bound answer from the remote service wins. An unbound or unavailable
/// remote falls through to the local directory, which may hold a session
/// created while the remote was down.
pub struct QueueStatus {
    gateway: Arc<MatchGateway>,
    directory: Arc<dyn SessionDirectory>,
}

impl QueueStatus {
    pub fn new(gateway: Arc<MatchGateway>, directory: Arc<dyn SessionDirectory>) -> Self {
        Self { gateway, directory }
    }

    pub async fn execute(&self, caller: &PlayerSlot) -> Result<QueueStatusResponse, MatchmakingError> {
        match self.gateway.status(caller).await {
            Ok(remote) if remote.is_bound() => return Ok(remote),
            Ok(_) => {}
            Err(reason) => tracing::debug!(
                player_id = %caller.player_id,
                reason = %reason,
                "Remote status unavailable"
            ),
        }

        let local = self
            .directory
            .find_live_session_for_player(&caller.player_id)
            .await?;
        Ok(local
            .map(|v| QueueStatusResponse::from(&v.record))
            .unwrap_or_else(QueueStatusResponse::none))
    }
}
