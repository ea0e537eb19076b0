//! Equipment status reports and control commands.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::AlertId;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentState {
    Online,
    Offline,
    Running,
    Stopped,
    Fault,
    Maintenance,
}

/// Payload of `hvac/{equipmentId}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStatus {
    pub equipment_id: String,
    pub status: EquipmentState,
    /// Instantaneous electrical demand, when the unit meters it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_kw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl EquipmentStatus {
    #[must_use]
    pub fn is_fault(&self) -> bool {
        self.status == EquipmentState::Fault
    }
}

/// Requested equipment action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlAction {
    Start,
    Stop,
    Setpoint { value: f64 },
    /// Protective stop issued in response to a critical alert.
    Shutdown,
}

impl ControlAction {
    /// Reject actions that could not be executed by any device.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Setpoint { value } if !value.is_finite() => Err(Error::InvalidCommand(format!(
                "setpoint must be a finite number, got {value}"
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
            Self::Setpoint { value } => write!(f, "setpoint({value})"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Who issued a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOrigin {
    Operator { identity: String },
    AlertEngine { alert_id: AlertId },
}

/// Payload of `equipment/{equipmentId}/control`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlCommand {
    pub command_id: Uuid,
    pub equipment_id: String,
    pub action: ControlAction,
    pub origin: CommandOrigin,
    pub issued_at: DateTime<Utc>,
}

impl ControlCommand {
    #[must_use]
    pub fn new(equipment_id: impl Into<String>, action: ControlAction, origin: CommandOrigin) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            equipment_id: equipment_id.into(),
            action,
            origin,
            issued_at: Utc::now(),
        }
    }
}
