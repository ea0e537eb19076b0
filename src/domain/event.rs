//! Events pushed to observers through the broadcast hub.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::Alert;
use super::analytics::DemandSummary;
use super::connection::ConnectionState;
use super::equipment::EquipmentStatus;
use super::reading::MetricKind;

/// Live energy demand for a metered source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyUpdate {
    pub source_id: String,
    pub power_kw: f64,
    pub reading_at: DateTime<Utc>,
    /// Peak and average over the retained window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand: Option<DemandSummary>,
}

/// Latest environmental reading for a zone sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneUpdate {
    pub source_id: String,
    pub metric: MetricKind,
    pub value: f64,
    pub unit: String,
    pub reading_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub transport: ConnectionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Observer event, serialized as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ObserverEvent {
    #[serde(rename = "energy:update")]
    EnergyUpdate(EnergyUpdate),
    #[serde(rename = "zone:update")]
    ZoneUpdate(ZoneUpdate),
    #[serde(rename = "equipment:status")]
    EquipmentStatus(EquipmentStatus),
    #[serde(rename = "alert:new")]
    AlertNew(Alert),
    #[serde(rename = "alert:update")]
    AlertUpdate(Alert),
    #[serde(rename = "system:status")]
    SystemStatus(SystemStatus),
}

impl ObserverEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EnergyUpdate(_) => "energy:update",
            Self::ZoneUpdate(_) => "zone:update",
            Self::EquipmentStatus(_) => "equipment:status",
            Self::AlertNew(_) => "alert:new",
            Self::AlertUpdate(_) => "alert:update",
            Self::SystemStatus(_) => "system:status",
        }
    }
}

/// One outbound frame: the event plus hub sequence and emit timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(flatten)]
    pub event: ObserverEvent,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    #[must_use]
    pub fn stamp(event: ObserverEvent, seq: u64) -> Self {
        Self {
            event,
            seq,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_carries_event_name_data_and_stamp() {
        let frame = Frame::stamp(
            ObserverEvent::SystemStatus(SystemStatus {
                transport: ConnectionState::Reconnecting,
                detail: None,
            }),
            7,
        );
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["event"], "system:status");
        assert_eq!(json["data"]["transport"], "reconnecting");
        assert_eq!(json["seq"], 7);
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn zone_update_uses_camel_case() {
        let event = ObserverEvent::ZoneUpdate(ZoneUpdate {
            source_id: "t-1".into(),
            metric: MetricKind::Humidity,
            value: 41.0,
            unit: "%".into(),
            reading_at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["data"]["sourceId"], "t-1");
        assert_eq!(json["data"]["metric"], "humidity");
    }
}
