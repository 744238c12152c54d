//! Remote authoritative match service port.

use async_trait::async_trait;
use dicebound_domain::{GameMode, PlayerSlot, SessionId};
use dicebound_shared::{AddBotResponse, JoinQueueResponse, QueueStatusResponse};

use super::error::RemoteError;

/// Calls into the remote match service. `endpoint` is the base URL as
/// currently configured; implementations must not cache it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchServicePort: Send + Sync {
    async fn join(
        &self,
        endpoint: &str,
        caller: &PlayerSlot,
        game_mode: GameMode,
    ) -> Result<JoinQueueResponse, RemoteError>;

    async fn leave(&self, endpoint: &str, caller: &PlayerSlot) -> Result<(), RemoteError>;

    async fn status(
        &self,
        endpoint: &str,
        caller: &PlayerSlot,
    ) -> Result<QueueStatusResponse, RemoteError>;

    async fn add_bot(
        &self,
        endpoint: &str,
        caller: &PlayerSlot,
        match_id: SessionId,
    ) -> Result<AddBotResponse, RemoteError>;
}
