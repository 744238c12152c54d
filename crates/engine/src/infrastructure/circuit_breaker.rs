//! Process-wide circuit breaker for the remote match service.
//!
//! One instance is created at startup and injected into the gateway. It is
//! closed (calls pass), open until `unavailable_until`, or half-open once that
//! window has elapsed:
//!
//! - a call that fails or times out opens it for `retry_delay`
//! - a call that succeeds closes it
//! - a change of configuration fingerprint closes it, so a corrected endpoint
//!   is retried immediately
//! - while half-open a single trial call is admitted; everyone else is
//!   short-circuited until it settles or its budget runs out
//!
//! Every read-modify-write happens under one mutex, so two callers can never
//! decide `unavailable_until` from different views of the state.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Current state of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed,
    /// Dependency failing - requests rejected until the window elapses
    Open,
    /// Window elapsed - one trial request decides the next state
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Error returned when circuit breaker rejects a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitOpenError {
    /// Time left until the next call is let through
    pub retry_after: Duration,
}

impl std::fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Circuit breaker is open, retry after {:?}",
            self.retry_after
        )
    }
}

impl std::error::Error for CircuitOpenError {}

#[derive(Debug, Default)]
struct InternalState {
    /// `None` means closed
    unavailable_until: Option<DateTime<Utc>>,
    /// Deadline of the admitted trial call while half-open
    trial_until: Option<DateTime<Utc>>,
    config_fingerprint: String,
    total_failures: u64,
    total_successes: u64,
    rejected_calls: u64,
    open_count: u64,
}

/// Shared, mutex-guarded breaker state.
#[derive(Debug, Default)]
pub struct CircuitBreakerState {
    inner: Mutex<InternalState>,
}

impl CircuitBreakerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InternalState> {
        // The state stays consistent even if a holder panicked mid-update.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decide whether a call may go out under `fingerprint` at `now`.
    ///
    /// A call admitted after an outage is the trial call and holds the
    /// half-open slot for `trial_budget`.
    pub fn admit(
        &self,
        fingerprint: &str,
        now: DateTime<Utc>,
        trial_budget: Duration,
    ) -> Result<(), CircuitOpenError> {
        let mut state = self.lock();

        if state.config_fingerprint != fingerprint {
            state.config_fingerprint = fingerprint.to_string();
            state.trial_until = None;
            if state.unavailable_until.take().is_none() {
                return Ok(());
            }
            tracing::info!(
                fingerprint = %fingerprint,
                "Circuit breaker reset after configuration change"
            );
            state.trial_until = Some(deadline(now, trial_budget));
            return Ok(());
        }

        let blocked_until = match (state.trial_until, state.unavailable_until) {
            (Some(trial), _) if now < trial => Some(trial),
            (_, Some(until)) if now < until => Some(until),
            (_, None) => return Ok(()),
            (_, Some(_)) => None,
        };
        match blocked_until {
            Some(blocked) => {
                state.rejected_calls += 1;
                let retry_after = (blocked - now).to_std().unwrap_or_default();
                Err(CircuitOpenError { retry_after })
            }
            None => {
                state.trial_until = Some(deadline(now, trial_budget));
                tracing::debug!("Circuit breaker half-open, admitting trial call");
                Ok(())
            }
        }
    }

    /// Record a successful call made under `fingerprint`.
    pub fn record_success(&self, fingerprint: &str) {
        let mut state = self.lock();
        if state.config_fingerprint != fingerprint {
            return;
        }
        state.total_successes += 1;
        state.trial_until = None;
        if state.unavailable_until.take().is_some() {
            tracing::info!("Circuit breaker closing after successful call");
        }
    }

    /// Record a failed or timed-out call made under `fingerprint`.
    ///
    /// Results from a superseded configuration are ignored.
    pub fn record_failure(&self, fingerprint: &str, now: DateTime<Utc>, retry_delay: Duration) {
        let mut state = self.lock();
        if state.config_fingerprint != fingerprint {
            return;
        }
        state.total_failures += 1;
        state.trial_until = None;

        let until = deadline(now, retry_delay);
        let was_closed = state.unavailable_until.is_none_or(|u| now >= u);

        // Never shorten a window another caller already opened.
        state.unavailable_until = Some(state.unavailable_until.map_or(until, |u| u.max(until)));

        if was_closed {
            state.open_count += 1;
            tracing::warn!(
                retry_delay_secs = retry_delay.as_secs(),
                unavailable_until = %until,
                "Circuit breaker opening after remote failure"
            );
        }
    }

    pub fn metrics(&self, now: DateTime<Utc>) -> CircuitBreakerMetrics {
        let state = self.lock();
        let open = state.unavailable_until.filter(|u| now < *u);
        let trial_in_flight = state.trial_until.is_some_and(|t| now < t);
        let circuit = match (open, state.unavailable_until) {
            (Some(_), _) => CircuitState::Open,
            (None, Some(_)) => CircuitState::HalfOpen,
            (None, None) if trial_in_flight => CircuitState::HalfOpen,
            (None, None) => CircuitState::Closed,
        };
        CircuitBreakerMetrics {
            state: circuit,
            unavailable_until: open,
            config_fingerprint: state.config_fingerprint.clone(),
            total_failures: state.total_failures,
            total_successes: state.total_successes,
            rejected_calls: state.rejected_calls,
            open_count: state.open_count,
        }
    }
}

fn deadline(now: DateTime<Utc>, after: Duration) -> DateTime<Utc> {
    let after = chrono::Duration::from_std(after).unwrap_or(chrono::Duration::MAX);
    now.checked_add_signed(after).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Metrics for circuit breaker state
#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub unavailable_until: Option<DateTime<Utc>>,
    pub config_fingerprint: String,
    pub total_failures: u64,
    pub total_successes: u64,
    /// Calls short-circuited while open
    pub rejected_calls: u64,
    /// Number of times the circuit has opened
    pub open_count: u64,
}
