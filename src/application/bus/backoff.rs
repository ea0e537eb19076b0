//! Reconnection backoff.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::transport::ReconnectionConfig;

/// Exponential backoff with up to 20% jitter and a retry cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectionConfig,
    consecutive_failures: u32,
    current_delay_ms: u64,
}

impl Backoff {
    #[must_use]
    pub fn new(config: ReconnectionConfig) -> Self {
        let initial_delay = config.initial_delay_ms;
        Self {
            config,
            consecutive_failures: 0,
            current_delay_ms: initial_delay,
        }
    }

    /// Clear failure state after a successful connection.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    #[must_use]
    pub fn failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// True once `max_retries` consecutive attempts have failed.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.consecutive_failures >= self.config.max_retries
    }

    /// Current delay plus jitter; advances the delay for the next call.
    pub fn next_delay(&mut self) -> Duration {
        let base_delay = Duration::from_millis(self.current_delay_ms);
        let delay = base_delay + Duration::from_millis(jitter_ms(base_delay));

        let next_delay = (self.current_delay_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next_delay.min(self.config.max_delay_ms);

        delay
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.config.connect_timeout_ms)
    }
}

fn jitter_ms(base_delay: Duration) -> u64 {
    let range = (base_delay.as_millis() as u64) / 5;
    if range == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=range)
}
