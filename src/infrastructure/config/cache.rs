//! Cache store configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process store. State is lost on restart and not shared.
    #[default]
    Memory,
    /// Redis at `EDIFICE_REDIS_URL` (requires the `redis` feature).
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Prefix applied to every key.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Upper bound on any single store call (milliseconds).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Expiry for cached responses (seconds).
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// How often the memory backend sweeps expired keys (seconds).
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    #[serde(skip)]
    pub redis_url: Option<String>,
}

fn default_namespace() -> String {
    "edifice".to_string()
}

fn default_request_timeout_ms() -> u64 {
    500
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_purge_interval_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            namespace: default_namespace(),
            request_timeout_ms: default_request_timeout_ms(),
            default_ttl_secs: default_ttl_secs(),
            purge_interval_secs: default_purge_interval_secs(),
            redis_url: None,
        }
    }
}
