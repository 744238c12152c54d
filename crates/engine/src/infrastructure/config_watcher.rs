//! Background reload of the gateway configuration from an env file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::gateway_config::{GatewayConfig, GatewayConfigHandle};

pub struct ConfigWatcher {
    path: PathBuf,
    interval: Duration,
    handle: GatewayConfigHandle,
    /// What the file resolved to on the last successful read.
    last_seen: Mutex<Option<GatewayConfig>>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>, interval: Duration, handle: GatewayConfigHandle) -> Self {
        Self {
            path: path.into(),
            interval,
            handle,
            last_seen: Mutex::new(None),
        }
    }

    /// Read the file once and push the result into the handle.
    ///
    /// Keys absent from the file fall back to the process environment.
    /// The handle is only touched when the file resolves differently from
    /// the previous read, so an admin update stands until the file is edited.
    pub fn reload(&self) -> Result<bool, dotenvy::Error> {
        let values = read_env_file(&self.path)?;
        let config = GatewayConfig::from_lookup(|key| {
            values.get(key).cloned().or_else(|| std::env::var(key).ok())
        });

        let mut last_seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        if last_seen.as_ref() == Some(&config) {
            return Ok(false);
        }
        *last_seen = Some(config.clone());
        Ok(self.handle.replace(config))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            path = %self.path.display(),
            interval_secs = self.interval.as_secs(),
            "Gateway config watcher started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.reload() {
                        tracing::warn!(
                            path = %self.path.display(),
                            error = %e,
                            "Failed to reload gateway config"
                        );
                    }
                }
            }
        }

        tracing::info!("Gateway config watcher stopped");
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, dotenvy::Error> {
    dotenvy::from_path_iter(path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicebound_shared::GatewayConfigUpdate;
    use std::io::Write;

    #[test]
    fn reload_picks_up_file_changes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MATCH_SERVICE_URL=http://first:9000").unwrap();
        writeln!(file, "MATCH_SERVICE_RETRY_SECS=42").unwrap();

        let handle = GatewayConfigHandle::default();
        let watcher = ConfigWatcher::new(file.path(), Duration::from_secs(1), handle.clone());

        assert!(watcher.reload().unwrap());
        let config = handle.current();
        assert_eq!(config.endpoint_base.as_deref(), Some("http://first:9000"));
        assert_eq!(config.retry_delay, Duration::from_secs(42));

        // Unchanged file is not reported as a change.
        assert!(!watcher.reload().unwrap());

        std::fs::write(file.path(), "MATCH_SERVICE_URL=http://second:9000\n").unwrap();
        assert!(watcher.reload().unwrap());
        assert_eq!(
            handle.current().endpoint_base.as_deref(),
            Some("http://second:9000")
        );
    }

    #[test]
    fn admin_update_survives_until_the_file_changes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MATCH_SERVICE_URL=http://from-file:9000").unwrap();

        let handle = GatewayConfigHandle::default();
        let watcher = ConfigWatcher::new(file.path(), Duration::from_secs(1), handle.clone());
        assert!(watcher.reload().unwrap());

        handle.apply_update(GatewayConfigUpdate {
            endpoint_base: Some("http://from-admin:9000".into()),
            retry_delay_secs: Some(7),
        });

        // Ticks over an untouched file leave the admin values alone.
        assert!(!watcher.reload().unwrap());
        assert!(!watcher.reload().unwrap());
        let config = handle.current();
        assert_eq!(config.endpoint_base.as_deref(), Some("http://from-admin:9000"));
        assert_eq!(config.retry_delay, Duration::from_secs(7));

        std::fs::write(file.path(), "MATCH_SERVICE_URL=http://edited:9000\n").unwrap();
        assert!(watcher.reload().unwrap());
        assert_eq!(
            handle.current().endpoint_base.as_deref(),
            Some("http://edited:9000")
        );
    }

    #[test]
    fn missing_file_is_an_error_and_keeps_config() {
        let handle = GatewayConfigHandle::new(GatewayConfig {
            endpoint_base: Some("http://kept".into()),
            ..GatewayConfig::default()
        });
        let watcher = ConfigWatcher::new("/nonexistent/dicebound.env", Duration::from_secs(1), handle.clone());
        assert!(watcher.reload().is_err());
        assert_eq!(handle.current().endpoint_base.as_deref(), Some("http://kept"));
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let watcher = ConfigWatcher::new(file.path(), Duration::from_millis(10), GatewayConfigHandle::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.run(cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
