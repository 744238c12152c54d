//! Shared helpers for unit and end-to-end tests.
//!
//! ```rust,ignore
//! use crate::test_fixtures::{clock, offline_gateway, slot};
//!
//! let clock = clock();
//! let gateway = offline_gateway(clock.clone());
//! ```

use std::sync::Arc;
use std::time::Duration;

use dicebound_domain::{PlayerId, PlayerSlot};

use crate::infrastructure::circuit_breaker::CircuitBreakerState;
use crate::infrastructure::clock::ManualClock;
use crate::infrastructure::gateway::MatchGateway;
use crate::infrastructure::gateway_config::{GatewayConfig, GatewayConfigHandle};
use crate::infrastructure::ports::MockMatchServicePort;

/// Endpoint used by every gateway built with [`remote_gateway`].
pub const TEST_ENDPOINT: &str = "http://match.test";

/// A player slot whose display name is the id upper-cased.
pub fn slot(id: &str) -> PlayerSlot {
    PlayerSlot::new(
        PlayerId::new(id).unwrap_or_else(|e| panic!("bad test player id '{}': {}", id, e)),
        id.to_uppercase(),
    )
}

/// Manual clock pinned at a fixed instant.
pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_epoch())
}

/// Gateway with no endpoint configured: every call reports `Unavailable`
/// without touching the remote.
pub fn offline_gateway(clock: Arc<ManualClock>) -> Arc<MatchGateway> {
    Arc::new(MatchGateway::new(
        Arc::new(MockMatchServicePort::new()),
        Arc::new(CircuitBreakerState::new()),
        GatewayConfigHandle::new(GatewayConfig::default()),
        clock,
    ))
}

/// Gateway pointed at [`TEST_ENDPOINT`] backed by `remote`.
pub fn remote_gateway(remote: MockMatchServicePort, clock: Arc<ManualClock>) -> Arc<MatchGateway> {
    remote_gateway_with_breaker(remote, clock, Arc::new(CircuitBreakerState::new()))
}

pub fn remote_gateway_with_breaker(
    remote: MockMatchServicePort,
    clock: Arc<ManualClock>,
    breaker: Arc<CircuitBreakerState>,
) -> Arc<MatchGateway> {
    Arc::new(MatchGateway::new(
        Arc::new(remote),
        breaker,
        GatewayConfigHandle::new(remote_config()),
        clock,
    ))
}

pub fn remote_config() -> GatewayConfig {
    GatewayConfig {
        endpoint_base: Some(TEST_ENDPOINT.to_string()),
        retry_delay: Duration::from_secs(300),
        call_timeout: Duration::from_secs(1),
    }
}

/// An [`App`](crate::app::App) on the in-memory directory with no remote
/// configured, driven by `clock` and `random`.
pub fn offline_app(
    clock: Arc<ManualClock>,
    random: crate::infrastructure::clock::FixedRandom,
) -> crate::app::App {
    app_with_remote(
        Arc::new(MockMatchServicePort::new()),
        GatewayConfigHandle::new(GatewayConfig::default()),
        clock,
        random,
    )
}

pub fn app_with_remote(
    remote: Arc<dyn crate::infrastructure::ports::MatchServicePort>,
    gateway_config: GatewayConfigHandle,
    clock: Arc<ManualClock>,
    random: crate::infrastructure::clock::FixedRandom,
) -> crate::app::App {
    use crate::app::{App, AppParts};
    use crate::infrastructure::directory::MemorySessionDirectory;
    use crate::infrastructure::settings::ReaperConfig;

    App::new(AppParts {
        directory: Arc::new(MemorySessionDirectory::new()),
        remote,
        breaker: Arc::new(CircuitBreakerState::new()),
        gateway_config,
        clock,
        random: Arc::new(random),
        reaper: ReaperConfig::default(),
        turn_decider_grace: chrono::Duration::seconds(30),
    })
}
