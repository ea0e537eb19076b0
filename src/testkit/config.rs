//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::transport::ReconnectionConfig;

/// Millisecond delays and a short retry cap, so reconnect tests finish fast.
#[must_use]
pub fn fast_reconnection() -> ReconnectionConfig {
    ReconnectionConfig {
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
        max_retries: 3,
        connect_timeout_ms: 50,
    }
}

/// Defaults with fast reconnection, no observer socket and no webhook.
#[must_use]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.reconnection = fast_reconnection();
    config.hub.enabled = false;
    config.ingest.shards = 2;
    config.notifications.webhook.url = None;
    config
}
