//! Process settings read from the environment at startup.
//!
//! Only the gateway portion is hot-reloadable; see `gateway_config`.

use std::path::PathBuf;
use std::time::Duration;

use super::gateway_config::{nonzero_secs_or, secs_or, GatewayConfig};

/// Where the session directory lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryBackend {
    Sqlite(String),
    Memory,
}

/// Timings for the lifecycle reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    pub interval: Duration,
    /// Age after which an unclaimed waiting room is removed
    pub waiting_room_ttl: Duration,
    /// Age after which an unfinished match is presumed abandoned
    pub match_ttl: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            waiting_room_ttl: Duration::from_secs(30 * 60),
            match_ttl: Duration::from_secs(90 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub server_host: String,
    pub server_port: u16,
    pub directory: DirectoryBackend,
    pub gateway: GatewayConfig,
    pub reaper: ReaperConfig,
    pub turn_decider_grace: Duration,
    /// Env file re-read for gateway configuration changes
    pub config_reload_file: Option<PathBuf>,
    pub config_reload_interval: Duration,
}

impl EngineSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str, default: u64| secs_or(&lookup, key, Duration::from_secs(default));
        // Ticker periods must be non-zero.
        let period =
            |key: &str, default: u64| nonzero_secs_or(&lookup, key, Duration::from_secs(default));
        let reaper_defaults = ReaperConfig::default();

        let directory = match lookup("DIRECTORY_DB").as_deref().map(str::trim) {
            Some("memory") => DirectoryBackend::Memory,
            Some(path) if !path.is_empty() => DirectoryBackend::Sqlite(path.to_string()),
            _ => DirectoryBackend::Sqlite("sessions.db".to_string()),
        };

        Self {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: lookup("SERVER_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(3000),
            directory,
            gateway: GatewayConfig::from_lookup(&lookup),
            reaper: ReaperConfig {
                interval: period("REAPER_INTERVAL_SECS", reaper_defaults.interval.as_secs()),
                waiting_room_ttl: secs(
                    "WAITING_ROOM_TTL_SECS",
                    reaper_defaults.waiting_room_ttl.as_secs(),
                ),
                match_ttl: secs("MATCH_TTL_SECS", reaper_defaults.match_ttl.as_secs()),
            },
            turn_decider_grace: secs("TURN_DECIDER_GRACE_SECS", 30),
            config_reload_file: lookup("CONFIG_RELOAD_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            config_reload_interval: period("CONFIG_RELOAD_SECS", 30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = EngineSettings::from_lookup(|_| None);
        assert_eq!(settings.server_port, 3000);
        assert_eq!(
            settings.directory,
            DirectoryBackend::Sqlite("sessions.db".into())
        );
        assert_eq!(settings.reaper, ReaperConfig::default());
        assert_eq!(settings.turn_decider_grace, Duration::from_secs(30));
        assert!(settings.config_reload_file.is_none());
        assert!(!settings.gateway.is_remote_enabled());
    }

    #[test]
    fn memory_directory_and_overrides() {
        let settings = EngineSettings::from_lookup(|key| match key {
            "DIRECTORY_DB" => Some("memory".into()),
            "SERVER_PORT" => Some("8081".into()),
            "WAITING_ROOM_TTL_SECS" => Some("120".into()),
            "MATCH_SERVICE_URL" => Some("http://match:7000".into()),
            _ => None,
        });
        assert_eq!(settings.directory, DirectoryBackend::Memory);
        assert_eq!(settings.server_port, 8081);
        assert_eq!(settings.reaper.waiting_room_ttl, Duration::from_secs(120));
        assert_eq!(
            settings.gateway.endpoint_base.as_deref(),
            Some("http://match:7000")
        );
    }

    #[test]
    fn zero_periods_fall_back_to_defaults() {
        let settings = EngineSettings::from_lookup(|key| match key {
            "REAPER_INTERVAL_SECS" | "CONFIG_RELOAD_SECS" | "MATCH_SERVICE_TIMEOUT_SECS" => {
                Some("0".into())
            }
            _ => None,
        });
        assert_eq!(settings.reaper.interval, ReaperConfig::default().interval);
        assert_eq!(settings.config_reload_interval, Duration::from_secs(30));
        assert!(!settings.gateway.call_timeout.is_zero());
    }

    #[tokio::test]
    async fn zero_reaper_interval_still_builds_a_ticker() {
        let settings = EngineSettings::from_lookup(|key| {
            (key == "REAPER_INTERVAL_SECS").then(|| "0".to_string())
        });
        let ticker = tokio::time::interval(settings.reaper.interval);
        assert_eq!(ticker.period(), ReaperConfig::default().interval);
    }
}
