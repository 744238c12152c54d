//! Hot-reloadable configuration for the remote match service.
//!
//! The gateway reads [`GatewayConfigHandle::current`] on every call, so a new
//! endpoint takes effect without restarting the process. The fingerprint is
//! what the circuit breaker compares to notice the change.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use dicebound_shared::GatewayConfigUpdate;
use sha2::{Digest, Sha256};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(300);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub const MATCH_SERVICE_URL: &str = "MATCH_SERVICE_URL";
pub const MATCH_SERVICE_RETRY_SECS: &str = "MATCH_SERVICE_RETRY_SECS";
pub const MATCH_SERVICE_TIMEOUT_SECS: &str = "MATCH_SERVICE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL of the remote service; `None` disables the remote path
    pub endpoint_base: Option<String>,
    /// How long the breaker stays open after a failure
    pub retry_delay: Duration,
    /// Budget for a single remote call
    pub call_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint_base: None,
            retry_delay: DEFAULT_RETRY_DELAY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Unparseable numbers fall back to defaults,
    /// and so does a zero call timeout.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            endpoint_base: normalize_endpoint(lookup(MATCH_SERVICE_URL)),
            retry_delay: secs_or(&lookup, MATCH_SERVICE_RETRY_SECS, DEFAULT_RETRY_DELAY),
            call_timeout: nonzero_secs_or(
                &lookup,
                MATCH_SERVICE_TIMEOUT_SECS,
                DEFAULT_CALL_TIMEOUT,
            ),
        }
    }

    /// SHA-256 of the endpoint base, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.endpoint_base.as_deref().unwrap_or_default().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.endpoint_base.is_some()
    }
}

/// Whole seconds under `key`, or `default` when unset or unparseable.
pub(crate) fn secs_or(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Like [`secs_or`], but a zero value is refused in favour of `default`.
pub(crate) fn nonzero_secs_or(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    let value = secs_or(lookup, key, default);
    if value.is_zero() {
        tracing::warn!(
            key,
            default_secs = default.as_secs(),
            "Zero is not a valid value, using the default"
        );
        return default;
    }
    value
}

fn normalize_endpoint(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
}

/// Shared handle; cloning shares the same configuration.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfigHandle {
    inner: Arc<RwLock<GatewayConfig>>,
}

impl GatewayConfigHandle {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, GatewayConfig> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GatewayConfig> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> GatewayConfig {
        self.read().clone()
    }

    /// Swap in a new configuration. Returns `true` if anything changed.
    pub fn replace(&self, config: GatewayConfig) -> bool {
        let mut current = self.write();
        if *current == config {
            return false;
        }
        tracing::info!(
            endpoint_configured = config.is_remote_enabled(),
            retry_delay_secs = config.retry_delay.as_secs(),
            fingerprint = %config.fingerprint(),
            "Gateway configuration updated"
        );
        *current = config;
        true
    }

    /// Apply an admin update; omitted fields keep their value.
    pub fn apply_update(&self, update: GatewayConfigUpdate) -> GatewayConfig {
        let mut next = self.current();
        if let Some(endpoint) = update.endpoint_base {
            next.endpoint_base = normalize_endpoint(Some(endpoint));
        }
        if let Some(secs) = update.retry_delay_secs {
            next.retry_delay = Duration::from_secs(secs);
        }
        self.replace(next.clone());
        next
    }
}
