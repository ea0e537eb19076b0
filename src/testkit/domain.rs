//! Builders for domain primitives used across tests.
//!
//! Concise factories so tests focus on assertions rather than
//! construction boilerplate.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::alert::{Alert, AlertKind, Severity};
use crate::domain::equipment::{EquipmentState, EquipmentStatus};
use crate::domain::reading::{MetricKind, Reading};
use crate::infrastructure::config::directory::DirectoryEntry;

/// Fixed reference instant, 2024-05-01 00:00:00 UTC.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// `minutes` after [`epoch`].
pub fn at(minutes: i64) -> DateTime<Utc> {
    epoch() + Duration::minutes(minutes)
}

/// A reading stamped at [`epoch`].
pub fn reading(device_id: &str, kind: MetricKind, value: f64) -> Reading {
    Reading::new(device_id, kind, value, epoch())
}

/// Energy readings one per interval starting at [`epoch`].
pub fn energy_series(device_id: &str, interval_minutes: i64, values: &[f64]) -> Vec<Reading> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            Reading::new(device_id, MetricKind::Energy, value, at(i as i64 * interval_minutes))
        })
        .collect()
}

pub fn status(equipment_id: &str, state: EquipmentState) -> EquipmentStatus {
    EquipmentStatus {
        equipment_id: equipment_id.to_string(),
        status: state,
        power_kw: None,
        fault_code: None,
        timestamp: epoch(),
    }
}

/// An active alert created at [`epoch`].
pub fn alert(source_id: &str, kind: AlertKind, severity: Severity) -> Alert {
    Alert::open(source_id, kind, severity, 90.0, 85.0, epoch())
}

pub fn directory_entry(source: &str, building: &str, zone: Option<&str>, equipment: Option<&str>) -> DirectoryEntry {
    DirectoryEntry {
        source: source.to_string(),
        building: building.to_string(),
        zone: zone.map(str::to_string),
        equipment: equipment.map(str::to_string),
    }
}
