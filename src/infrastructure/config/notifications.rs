//! Notification configuration.

use serde::Deserialize;

use crate::domain::alert::Severity;

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Log every notification event.
    #[serde(default = "default_log")]
    pub log: bool,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

fn default_log() -> bool {
    true
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            log: default_log(),
            webhook: WebhookConfig::default(),
        }
    }
}

/// Alert webhook. The URL comes from `EDIFICE_WEBHOOK_URL`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Lowest severity posted.
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(skip)]
    pub url: Option<String>,
}

fn default_min_severity() -> Severity {
    Severity::High
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            min_severity: default_min_severity(),
            timeout_ms: default_timeout_ms(),
            url: None,
        }
    }
}
