//! Decoded inbound bus messages.

use super::alert::Alert;
use super::equipment::{ControlCommand, EquipmentStatus};
use super::reading::Reading;

/// Payload decoded at the bus boundary, keyed by topic family.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Reading(Reading),
    EquipmentStatus(EquipmentStatus),
    ControlCommand(ControlCommand),
    Alert(Alert),
    /// Topic outside the known namespace; payload kept verbatim.
    Unknown { topic: String, payload: Vec<u8> },
}

impl InboundMessage {
    /// Device, equipment or alert source the message belongs to.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::Reading(reading) => Some(&reading.device_id),
            Self::EquipmentStatus(status) => Some(&status.equipment_id),
            Self::ControlCommand(command) => Some(&command.equipment_id),
            Self::Alert(alert) => Some(&alert.source_id),
            Self::Unknown { .. } => None,
        }
    }
}
