//! Logging configuration and initialization.

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

/// Broker and socket libraries log every packet at debug; keep them quiet
/// unless `RUST_LOG` asks otherwise.
const QUIET_DEPENDENCIES: &str = "rumqttc=warn,tungstenite=warn,tokio_tungstenite=warn";

/// Logging configuration.
///
/// `RUST_LOG` takes precedence over `level` when set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
}

impl LoggingConfig {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{},{QUIET_DEPENDENCIES}", self.level)))
    }

    /// Install the global subscriber. Call once, before any service starts.
    pub fn init(&self) {
        let filter = self.filter();
        match self.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).init(),
            "compact" => fmt().compact().with_env_filter(filter).init(),
            _ => fmt().with_env_filter(filter).init(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}
