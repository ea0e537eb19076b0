//! Ingestion pipeline configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Worker shards; each source is pinned to one. Defaults to CPU count.
    #[serde(default = "default_shards")]
    pub shards: usize,
    /// Messages buffered per shard before new ones are rejected.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Readings retained per source and metric.
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

fn default_shards() -> usize {
    num_cpus::get()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_history_len() -> usize {
    288
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            queue_capacity: default_queue_capacity(),
            history_len: default_history_len(),
        }
    }
}
