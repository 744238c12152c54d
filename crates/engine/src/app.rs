//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    circuit_breaker::CircuitBreakerState,
    clock::{SystemClock, SystemRandom},
    gateway::MatchGateway,
    gateway_config::GatewayConfigHandle,
    ports::{ClockPort, MatchServicePort, RandomPort, SessionDirectory},
    settings::ReaperConfig,
};
use crate::use_cases;
use crate::use_cases::lifecycle::LifecycleReaper;
use crate::use_cases::turn_decider::TurnDeciderService;

/// Main application state.
///
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub directory: Arc<dyn SessionDirectory>,
    pub gateway: Arc<MatchGateway>,
    pub clock: Arc<dyn ClockPort>,
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub matchmaking: use_cases::MatchmakingUseCases,
    pub turn_decider: Arc<TurnDeciderService>,
    pub reaper: Arc<LifecycleReaper>,
}

/// Everything [`App::new`] needs from the outside world.
pub struct AppParts {
    pub directory: Arc<dyn SessionDirectory>,
    pub remote: Arc<dyn MatchServicePort>,
    pub breaker: Arc<CircuitBreakerState>,
    pub gateway_config: GatewayConfigHandle,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
    pub reaper: ReaperConfig,
    pub turn_decider_grace: chrono::Duration,
}

impl AppParts {
    /// Production clock and randomness around the given storage and remote.
    pub fn system(
        directory: Arc<dyn SessionDirectory>,
        remote: Arc<dyn MatchServicePort>,
        gateway_config: GatewayConfigHandle,
        reaper: ReaperConfig,
        turn_decider_grace: chrono::Duration,
    ) -> Self {
        Self {
            directory,
            remote,
            breaker: Arc::new(CircuitBreakerState::new()),
            gateway_config,
            clock: Arc::new(SystemClock::new()),
            random: Arc::new(SystemRandom::new()),
            reaper,
            turn_decider_grace,
        }
    }
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(parts: AppParts) -> Self {
        let AppParts {
            directory,
            remote,
            breaker,
            gateway_config,
            clock,
            random,
            reaper,
            turn_decider_grace,
        } = parts;

        let gateway = Arc::new(MatchGateway::new(
            remote,
            breaker,
            gateway_config,
            clock.clone(),
        ));

        let matchmaking = use_cases::MatchmakingUseCases::new(
            Arc::new(use_cases::matchmaking::JoinQueue::new(
                gateway.clone(),
                directory.clone(),
                clock.clone(),
            )),
            Arc::new(use_cases::matchmaking::LeaveQueue::new(
                gateway.clone(),
                directory.clone(),
                clock.clone(),
            )),
            Arc::new(use_cases::matchmaking::QueueStatus::new(
                gateway.clone(),
                directory.clone(),
            )),
            Arc::new(use_cases::matchmaking::MatchOps::new(
                directory.clone(),
                clock.clone(),
            )),
            Arc::new(use_cases::matchmaking::AddBot::new(
                gateway.clone(),
                directory.clone(),
                clock.clone(),
            )),
        );

        let turn_decider = Arc::new(TurnDeciderService::new(
            directory.clone(),
            random,
            clock.clone(),
            turn_decider_grace,
        ));

        let reaper = Arc::new(LifecycleReaper::new(
            directory.clone(),
            turn_decider.clone(),
            clock.clone(),
            reaper,
        ));

        Self {
            directory,
            gateway,
            clock,
            use_cases: UseCases {
                matchmaking,
                turn_decider,
                reaper,
            },
        }
    }
}
