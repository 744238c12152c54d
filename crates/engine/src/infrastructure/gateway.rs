//! Circuit-breaker gateway in front of the remote match service.
//!
//! Every call either returns the remote response or a typed [`Unavailable`].
//! Transport failures, non-success statuses and timeouts never escape as
//! anything else; callers fall back to the local directory path on
//! `Unavailable`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dicebound_domain::{GameMode, PlayerSlot, SessionId};
use dicebound_shared::{AddBotResponse, GatewaySnapshot, JoinQueueResponse, QueueStatusResponse};

use super::circuit_breaker::CircuitBreakerState;
use super::gateway_config::GatewayConfigHandle;
use super::ports::{ClockPort, MatchServicePort, RemoteError};

/// Why the remote path was not used.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Unavailable {
    #[error("remote match service is not configured")]
    NotConfigured,
    #[error("remote match service marked unavailable for another {retry_after:?}")]
    CircuitOpen { retry_after: Duration },
    #[error("remote match service timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote match service failed: {0}")]
    Remote(#[from] RemoteError),
}

pub struct MatchGateway {
    remote: Arc<dyn MatchServicePort>,
    breaker: Arc<CircuitBreakerState>,
    config: GatewayConfigHandle,
    clock: Arc<dyn ClockPort>,
}

impl MatchGateway {
    /// `breaker` is injected so each gateway (and each test) decides whether
    /// it shares health state with anyone else.
    pub fn new(
        remote: Arc<dyn MatchServicePort>,
        breaker: Arc<CircuitBreakerState>,
        config: GatewayConfigHandle,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            remote,
            breaker,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &GatewayConfigHandle {
        &self.config
    }

    pub fn breaker(&self) -> &CircuitBreakerState {
        &self.breaker
    }

    pub async fn join(
        &self,
        caller: &PlayerSlot,
        game_mode: GameMode,
    ) -> Result<JoinQueueResponse, Unavailable> {
        let remote = &self.remote;
        self.call("join", |endpoint| async move {
            remote.join(&endpoint, caller, game_mode).await
        })
        .await
    }

    pub async fn leave(&self, caller: &PlayerSlot) -> Result<(), Unavailable> {
        let remote = &self.remote;
        self.call("leave", |endpoint| async move {
            remote.leave(&endpoint, caller).await
        })
        .await
    }

    pub async fn status(&self, caller: &PlayerSlot) -> Result<QueueStatusResponse, Unavailable> {
        let remote = &self.remote;
        self.call("status", |endpoint| async move {
            remote.status(&endpoint, caller).await
        })
        .await
    }

    pub async fn add_bot(
        &self,
        caller: &PlayerSlot,
        match_id: SessionId,
    ) -> Result<AddBotResponse, Unavailable> {
        let remote = &self.remote;
        self.call("add_bot", |endpoint| async move {
            remote.add_bot(&endpoint, caller, match_id).await
        })
        .await
    }

    /// Run one remote call under the breaker and the call budget.
    async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, Unavailable>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let config = self.config.current();
        let Some(endpoint) = config.endpoint_base.clone() else {
            return Err(Unavailable::NotConfigured);
        };
        let fingerprint = config.fingerprint();

        let admitted = self
            .breaker
            .admit(&fingerprint, self.clock.now(), config.call_timeout);
        if let Err(open) = admitted {
            tracing::debug!(
                operation,
                retry_after_secs = open.retry_after.as_secs(),
                "Remote call short-circuited"
            );
            return Err(Unavailable::CircuitOpen {
                retry_after: open.retry_after,
            });
        }

        let outcome = match tokio::time::timeout(config.call_timeout, f(endpoint)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Unavailable::Remote(e)),
            Err(_) => Err(Unavailable::Timeout(config.call_timeout)),
        };

        match &outcome {
            Ok(_) => self.breaker.record_success(&fingerprint),
            Err(e) => {
                tracing::warn!(operation, error = %e, "Remote match service call failed");
                self.breaker
                    .record_failure(&fingerprint, self.clock.now(), config.retry_delay);
            }
        }
        outcome
    }

    pub fn snapshot(&self) -> GatewaySnapshot {
        let config = self.config.current();
        let metrics = self.breaker.metrics(self.clock.now());
        GatewaySnapshot {
            endpoint_configured: config.is_remote_enabled(),
            config_fingerprint: config.fingerprint(),
            unavailable_until: metrics.unavailable_until,
            retry_delay_secs: config.retry_delay.as_secs(),
        }
    }
}
