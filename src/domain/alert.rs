//! Alerts and their lifecycle.
//!
//! An alert moves `active → acknowledged → resolved` or directly
//! `active → resolved`. Nothing leaves `resolved`; alerts are never deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reading::MetricKind;
use crate::error::AlertError;

/// Unique alert identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for AlertId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// What condition an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Temperature,
    Humidity,
    Occupancy,
    Energy,
    EquipmentFault,
}

impl AlertKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Occupancy => "occupancy",
            Self::Energy => "energy",
            Self::EquipmentFault => "equipment_fault",
        }
    }
}

impl From<MetricKind> for AlertKind {
    fn from(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Temperature => Self::Temperature,
            MetricKind::Humidity => Self::Humidity,
            MetricKind::Occupancy => Self::Occupancy,
            MetricKind::Energy => Self::Energy,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// Deduplication key: at most one open alert per source and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub source_id: String,
    pub kind: AlertKind,
}

impl AlertKey {
    #[must_use]
    pub fn new(source_id: impl Into<String>, kind: AlertKind) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
        }
    }
}

/// Outcome of a lifecycle operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed.
    Applied,
    /// Idempotent repeat; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub source_id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub trigger_value: f64,
    pub threshold: f64,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl Alert {
    /// Open a new active alert.
    #[must_use]
    pub fn open(
        source_id: impl Into<String>,
        kind: AlertKind,
        severity: Severity,
        trigger_value: f64,
        threshold: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::new(),
            source_id: source_id.into(),
            kind,
            severity,
            trigger_value,
            threshold,
            status: AlertStatus::Active,
            created_at,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            resolution: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> AlertKey {
        AlertKey::new(self.source_id.clone(), self.kind)
    }

    /// Active or acknowledged.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status != AlertStatus::Resolved
    }

    /// Record a newer reading that still breaches the threshold.
    pub fn record_trigger(&mut self, value: f64) {
        self.trigger_value = value;
    }

    /// Acknowledge an active alert.
    ///
    /// Re-acknowledging by the same operator is a no-op; a different operator
    /// or an already resolved alert is a conflict.
    pub fn acknowledge(&mut self, by: &str, at: DateTime<Utc>) -> Result<Transition, AlertError> {
        match self.status {
            AlertStatus::Active => {
                self.status = AlertStatus::Acknowledged;
                self.acknowledged_by = Some(by.to_string());
                self.acknowledged_at = Some(at);
                Ok(Transition::Applied)
            }
            AlertStatus::Acknowledged if self.acknowledged_by.as_deref() == Some(by) => {
                Ok(Transition::Unchanged)
            }
            AlertStatus::Acknowledged | AlertStatus::Resolved => Err(self.conflict("acknowledge")),
        }
    }

    /// Resolve an open alert.
    ///
    /// Resolving again with identical resolution text is a no-op; any other
    /// resolution of a resolved alert is a conflict.
    pub fn resolve(
        &mut self,
        by: &str,
        resolution: &str,
        at: DateTime<Utc>,
    ) -> Result<Transition, AlertError> {
        match self.status {
            AlertStatus::Active | AlertStatus::Acknowledged => {
                self.status = AlertStatus::Resolved;
                self.resolved_by = Some(by.to_string());
                self.resolved_at = Some(at);
                self.resolution = Some(resolution.to_string());
                Ok(Transition::Applied)
            }
            AlertStatus::Resolved if self.resolution.as_deref() == Some(resolution) => {
                Ok(Transition::Unchanged)
            }
            AlertStatus::Resolved => Err(self.conflict("resolve")),
        }
    }

    fn conflict(&self, attempted: &'static str) -> AlertError {
        AlertError::StateConflict {
            attempted,
            current: Box::new(self.clone()),
        }
    }
}
