//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file with environment variable
//! overrides for secrets (`MQTT_USERNAME`, `MQTT_PASSWORD`,
//! `EDIFICE_REDIS_URL`, `EDIFICE_WEBHOOK_URL`).
//!
//! # Example
//!
//! ```no_run
//! use edifice::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use super::alerts::AlertsConfig;
use super::cache::{CacheBackend, CacheConfig};
use super::directory::DirectoryEntry;
use super::hub::HubConfig;
use super::ingest::IngestConfig;
use super::logging::LoggingConfig;
use super::notifications::NotificationsConfig;
use super::rate_limit::RateLimitConfig;
use super::transport::{MqttConfig, ReconnectionConfig};
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Every section is optional; omitted sections take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Broker reconnection backoff.
    #[serde(default)]
    pub reconnection: ReconnectionConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Thresholds and lifecycle policy.
    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Source to building/zone mapping.
    #[serde(default)]
    pub directory: Vec<DirectoryEntry>,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Secrets are taken from the environment, never from the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    fn apply_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        self.mqtt.username = var("MQTT_USERNAME");
        self.mqtt.password = var("MQTT_PASSWORD");
        self.cache.redis_url = var("EDIFICE_REDIS_URL");
        self.notifications.webhook.url = var("EDIFICE_WEBHOOK_URL");
    }

    /// Validate configuration values.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::MissingField { field: "mqtt.host" }.into());
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "mqtt.client_id",
            }
            .into());
        }
        if self.mqtt.qos > 2 {
            return Err(invalid("mqtt.qos", "must be 0, 1 or 2"));
        }
        if self.mqtt.password.is_some() && self.mqtt.username.is_none() {
            return Err(ConfigError::MissingField {
                field: "MQTT_USERNAME",
            }
            .into());
        }

        let reconnection = &self.reconnection;
        if reconnection.initial_delay_ms == 0 {
            return Err(invalid("reconnection.initial_delay_ms", "must be greater than 0"));
        }
        if reconnection.max_delay_ms < reconnection.initial_delay_ms {
            return Err(invalid(
                "reconnection.max_delay_ms",
                "must be >= initial_delay_ms",
            ));
        }
        if reconnection.backoff_multiplier < 1.0 {
            return Err(invalid("reconnection.backoff_multiplier", "must be >= 1.0"));
        }
        if reconnection.max_retries == 0 {
            return Err(invalid("reconnection.max_retries", "must be greater than 0"));
        }
        if reconnection.connect_timeout_ms == 0 {
            return Err(invalid(
                "reconnection.connect_timeout_ms",
                "must be greater than 0",
            ));
        }

        if self.cache.request_timeout_ms == 0 {
            return Err(invalid("cache.request_timeout_ms", "must be greater than 0"));
        }
        if self.cache.backend == CacheBackend::Redis {
            if cfg!(not(feature = "redis")) {
                return Err(invalid(
                    "cache.backend",
                    "redis backend requires the `redis` feature",
                ));
            }
            if self.cache.redis_url.is_none() {
                return Err(ConfigError::MissingField {
                    field: "EDIFICE_REDIS_URL",
                }
                .into());
            }
        }

        for (field, policy) in self.rate_limit.policies() {
            if policy.prefix.is_empty() {
                return Err(invalid(field, "prefix must not be empty"));
            }
            if policy.window_secs == 0 || policy.max_requests == 0 {
                return Err(invalid(
                    field,
                    "window_secs and max_requests must be greater than 0",
                ));
            }
        }

        if self.hub.enabled && self.hub.bind.parse::<SocketAddr>().is_err() {
            return Err(invalid("hub.bind", "must be a socket address such as 0.0.0.0:8080"));
        }
        if self.hub.queue_capacity == 0 || self.hub.max_consecutive_drops == 0 {
            return Err(invalid(
                "hub.queue_capacity",
                "queue_capacity and max_consecutive_drops must be greater than 0",
            ));
        }
        if self.hub.heartbeat_interval_secs == 0
            || self.hub.heartbeat_timeout_secs <= self.hub.heartbeat_interval_secs
        {
            return Err(invalid(
                "hub.heartbeat_timeout_secs",
                "heartbeat interval must be > 0 and shorter than the timeout",
            ));
        }

        if self.ingest.shards == 0 || self.ingest.queue_capacity == 0 || self.ingest.history_len == 0 {
            return Err(invalid(
                "ingest",
                "shards, queue_capacity and history_len must be greater than 0",
            ));
        }

        self.alerts.thresholds.validate()?;

        let mut seen = HashSet::new();
        for entry in &self.directory {
            if entry.source.is_empty() || entry.building.is_empty() {
                return Err(invalid("directory", "source and building must not be empty"));
            }
            if !seen.insert(entry.source.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "directory",
                    reason: format!("duplicate source '{}'", entry.source),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.cache.namespace, "edifice");
        assert_eq!(config.rate_limit.auth.max_requests, 5);
        assert!(config.alerts.auto_resolve);
        assert!(config.directory.is_empty());
    }

    #[test]
    fn parses_sections() {
        let toml = r#"
            [logging]
            level = "debug"
            format = "json"

            [mqtt]
            host = "broker.local"
            port = 8883

            [reconnection]
            max_retries = 3

            [ingest]
            shards = 2

            [[directory]]
            source = "t-1"
            building = "hq"
            zone = "floor-1"
        "#;
        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.reconnection.max_retries, 3);
        assert_eq!(config.ingest.shards, 2);
        assert_eq!(config.directory[0].zone.as_deref(), Some("floor-1"));
    }

    #[test]
    fn rejects_bad_backoff() {
        let err = Config::parse_toml("[reconnection]\nbackoff_multiplier = 0.5\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "reconnection.backoff_multiplier",
                ..
            })
        ));
    }

    #[test]
    fn rejects_unbounded_retries() {
        let err = Config::parse_toml("[reconnection]\nmax_retries = 0\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "reconnection.max_retries",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_window_policy() {
        let toml = "[rate_limit.control]\nprefix = \"rl:control\"\nwindow_secs = 0\nmax_requests = 5\n";
        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn rejects_duplicate_directory_sources() {
        let toml = r#"
            [[directory]]
            source = "t-1"
            building = "hq"

            [[directory]]
            source = "t-1"
            building = "annex"
        "#;
        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse_toml("[mqtt\nhost = 1").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
