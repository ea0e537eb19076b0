//! Bounded per-source reading history.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::domain::reading::{MetricKind, Reading};

/// Recent readings per `(source, metric)`, time-ordered, oldest evicted first.
pub struct SeriesStore {
    series: DashMap<(String, MetricKind), VecDeque<Reading>>,
    capacity: usize,
}

impl SeriesStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            series: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert `reading` in timestamp order. A late reading older than the
    /// whole retained window is discarded.
    pub fn record(&self, reading: Reading) {
        let key = (reading.device_id.clone(), reading.metric_kind);
        let mut series = self.series.entry(key).or_default();

        let at = series.partition_point(|r| r.timestamp <= reading.timestamp);
        if at == 0 && series.len() >= self.capacity {
            return;
        }
        series.insert(at, reading);
        while series.len() > self.capacity {
            series.pop_front();
        }
    }

    /// Copy of the retained series, oldest first.
    #[must_use]
    pub fn snapshot(&self, source_id: &str, kind: MetricKind) -> Vec<Reading> {
        self.series
            .get(&(source_id.to_string(), kind))
            .map(|series| series.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn latest(&self, source_id: &str, kind: MetricKind) -> Option<Reading> {
        self.series
            .get(&(source_id.to_string(), kind))
            .and_then(|series| series.back().cloned())
    }

    /// Number of tracked series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
