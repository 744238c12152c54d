//! E2E test helpers for constructing the full application stack.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dicebound_domain::{GameMode, PlayerSlot, Session, SessionId};
use dicebound_shared::{AddBotResponse, JoinQueueResponse, QueueStatusResponse};

use crate::app::App;
use crate::infrastructure::clock::{FixedRandom, ManualClock};
use crate::infrastructure::gateway_config::{GatewayConfig, GatewayConfigHandle};
use crate::infrastructure::ports::{MatchServicePort, RemoteError, SessionDirectory};
use crate::test_fixtures::{app_with_remote, clock, TEST_ENDPOINT};

/// Remote match service that answers every call with an HTTP status error
/// and counts how often it was reached.
#[derive(Debug, Default)]
pub struct FailingRemote {
    calls: AtomicUsize,
    status: u16,
}

impl FailingRemote {
    pub fn with_status(status: u16) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            status,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RemoteError::Status(self.status))
    }
}

#[async_trait]
impl MatchServicePort for FailingRemote {
    async fn join(&self, _: &str, _: &PlayerSlot, _: GameMode) -> Result<JoinQueueResponse, RemoteError> {
        self.fail()
    }

    async fn leave(&self, _: &str, _: &PlayerSlot) -> Result<(), RemoteError> {
        self.fail()
    }

    async fn status(&self, _: &str, _: &PlayerSlot) -> Result<QueueStatusResponse, RemoteError> {
        self.fail()
    }

    async fn add_bot(&self, _: &str, _: &PlayerSlot, _: SessionId) -> Result<AddBotResponse, RemoteError> {
        self.fail()
    }
}

/// Retry window used by every context with a remote configured.
pub const RETRY_DELAY: Duration = Duration::from_secs(300);

pub struct E2ETestContext {
    pub app: Arc<App>,
    pub clock: Arc<ManualClock>,
    pub remote: Arc<FailingRemote>,
}

impl E2ETestContext {
    /// No remote configured; every operation takes the local path.
    pub fn offline() -> Self {
        Self::build(None)
    }

    /// Remote configured but answering HTTP 500 to everything.
    pub fn with_broken_remote() -> Self {
        Self::build(Some(TEST_ENDPOINT))
    }

    fn build(endpoint: Option<&str>) -> Self {
        let clock = clock();
        let remote = Arc::new(FailingRemote::with_status(500));
        let config = GatewayConfigHandle::new(GatewayConfig {
            endpoint_base: endpoint.map(str::to_string),
            retry_delay: RETRY_DELAY,
            call_timeout: Duration::from_secs(1),
        });
        // Seat draw 0 -> host decides; die rolls clamp to 1.
        let app = app_with_remote(remote.clone(), config, clock.clone(), FixedRandom::new(0));
        Self {
            app: Arc::new(app),
            clock,
            remote,
        }
    }

    pub async fn join(&self, player: &PlayerSlot, game_mode: GameMode) -> JoinQueueResponse {
        self.app
            .use_cases
            .matchmaking
            .join
            .execute(player, game_mode)
            .await
            .unwrap_or_else(|e| panic!("join for {} failed: {}", player.player_id, e))
    }

    pub async fn session(&self, id: uuid::Uuid) -> Option<Session> {
        self.app
            .directory
            .get_session(SessionId::from_uuid(id))
            .await
            .unwrap_or_else(|e| panic!("directory read failed: {}", e))
            .map(|v| v.record)
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }
}
