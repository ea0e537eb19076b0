//! Observer hub and socket server configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Serve observer sockets. Disable to run ingestion headless.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Outbound frames buffered per observer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Consecutive dropped frames before an observer is torn down.
    #[serde(default = "default_max_consecutive_drops")]
    pub max_consecutive_drops: u32,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Silence after which a socket is considered dead.
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_consecutive_drops() -> u32 {
    64
}

fn default_write_timeout_ms() -> u64 {
    5000
}

fn default_heartbeat_interval_secs() -> u64 {
    25
}

fn default_heartbeat_timeout_secs() -> u64 {
    60
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bind: default_bind(),
            queue_capacity: default_queue_capacity(),
            max_consecutive_drops: default_max_consecutive_drops(),
            write_timeout_ms: default_write_timeout_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
        }
    }
}
