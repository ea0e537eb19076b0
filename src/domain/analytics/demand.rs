//! Peak and average demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::reading::Reading;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandSummary {
    pub peak_value: f64,
    pub peak_timestamp: DateTime<Utc>,
    pub average: f64,
    pub samples: usize,
}

/// Peak and average over `readings`.
///
/// The earliest reading wins a tie for the peak. Non-finite values are
/// ignored. Returns `None` when no finite value remains.
#[must_use]
pub fn peak_demand(readings: &[Reading]) -> Option<DemandSummary> {
    summarize(readings.iter())
}

/// Same as [`peak_demand`], restricted to `start <= timestamp < end`.
#[must_use]
pub fn peak_demand_in(
    readings: &[Reading],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<DemandSummary> {
    summarize(
        readings
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp < end),
    )
}

fn summarize<'a>(readings: impl Iterator<Item = &'a Reading>) -> Option<DemandSummary> {
    let mut peak: Option<&Reading> = None;
    let mut sum = 0.0;
    let mut samples = 0usize;

    for reading in readings.filter(|r| r.value.is_finite()) {
        sum += reading.value;
        samples += 1;
        match peak {
            Some(current) if reading.value <= current.value => {}
            _ => peak = Some(reading),
        }
    }

    peak.map(|peak| DemandSummary {
        peak_value: peak.value,
        peak_timestamp: peak.timestamp,
        average: sum / samples as f64,
        samples,
    })
}
