//! Telemetry readings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Kind of quantity a reading measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Temperature,
    Humidity,
    Occupancy,
    /// Electrical demand in kW.
    Energy,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::Occupancy,
        MetricKind::Energy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Occupancy => "occupancy",
            Self::Energy => "energy",
        }
    }

    /// Unit assumed when a device omits one.
    #[must_use]
    pub const fn default_unit(self) -> &'static str {
        match self {
            Self::Temperature => "F",
            Self::Humidity => "%",
            Self::Occupancy => "people",
            Self::Energy => "kW",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DecodeError::UnknownMetricKind(s.to_string()))
    }
}

/// A single measurement emitted by a device. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub metric_kind: MetricKind,
    pub value: f64,
    pub unit: String,
}

impl Reading {
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        metric_kind: MetricKind,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            metric_kind,
            value,
            unit: metric_kind.default_unit().to_string(),
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}
