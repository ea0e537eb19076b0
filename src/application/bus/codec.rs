//! Payload decoding at the bus boundary.
//!
//! The topic family decides the payload shape. Sensor payloads are decoded
//! leniently: device id, metric and unit fall back to the topic, and a bare
//! JSON number is accepted as the value.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::alert::Alert;
use crate::domain::equipment::{ControlCommand, EquipmentState, EquipmentStatus};
use crate::domain::message::InboundMessage;
use crate::domain::reading::{MetricKind, Reading};
use crate::domain::topic::TopicRoute;
use crate::error::DecodeError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReading {
    device_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    metric_kind: Option<String>,
    value: f64,
    unit: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    equipment_id: Option<String>,
    status: EquipmentState,
    power_kw: Option<f64>,
    fault_code: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

/// Decode `payload` according to the family of `topic`.
pub fn decode(topic: &str, payload: &[u8]) -> Result<InboundMessage, DecodeError> {
    let message = match TopicRoute::of(topic) {
        TopicRoute::Sensor { device_id, metric } => {
            InboundMessage::Reading(decode_reading(topic, device_id, metric, payload)?)
        }
        TopicRoute::HvacStatus { equipment_id } => {
            let raw: RawStatus = serde_json::from_slice(payload)?;
            InboundMessage::EquipmentStatus(EquipmentStatus {
                equipment_id: raw.equipment_id.unwrap_or_else(|| equipment_id.to_string()),
                status: raw.status,
                power_kw: raw.power_kw,
                fault_code: raw.fault_code,
                timestamp: raw.timestamp.unwrap_or_else(Utc::now),
            })
        }
        TopicRoute::EquipmentControl { .. } => {
            InboundMessage::ControlCommand(serde_json::from_slice::<ControlCommand>(payload)?)
        }
        TopicRoute::Alert { .. } => InboundMessage::Alert(serde_json::from_slice::<Alert>(payload)?),
        TopicRoute::Other => InboundMessage::Unknown {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        },
    };
    Ok(message)
}

fn decode_reading(
    topic: &str,
    device_id: &str,
    metric: &str,
    payload: &[u8],
) -> Result<Reading, DecodeError> {
    let kind: MetricKind = metric.parse()?;

    if let Ok(value) = serde_json::from_slice::<f64>(payload) {
        return Ok(Reading::new(device_id, kind, value, Utc::now()));
    }

    let raw: RawReading = serde_json::from_slice(payload)?;
    if let Some(declared) = raw.metric_kind.as_deref() {
        if declared.parse::<MetricKind>().ok() != Some(kind) {
            return Err(DecodeError::TopicMismatch {
                topic: topic.to_string(),
                metric_kind: declared.to_string(),
            });
        }
    }

    let reading = Reading::new(
        raw.device_id.unwrap_or_else(|| device_id.to_string()),
        kind,
        raw.value,
        raw.timestamp.unwrap_or_else(Utc::now),
    );
    Ok(match raw.unit {
        Some(unit) => reading.with_unit(unit),
        None => reading,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sensor_payload() {
        let payload = br#"{"deviceId":"t-1","timestamp":"2024-05-01T12:00:00Z","metricKind":"temperature","value":72.5,"unit":"F"}"#;
        let InboundMessage::Reading(reading) = decode("sensors/t-1/temperature", payload).unwrap()
        else {
            panic!("expected a reading");
        };
        assert_eq!(reading.device_id, "t-1");
        assert_eq!(reading.metric_kind, MetricKind::Temperature);
        assert_eq!(reading.value, 72.5);
    }

    #[test]
    fn sparse_sensor_payload_falls_back_to_topic() {
        let InboundMessage::Reading(reading) =
            decode("sensors/h-9/humidity", br#"{"value":44}"#).unwrap()
        else {
            panic!("expected a reading");
        };
        assert_eq!(reading.device_id, "h-9");
        assert_eq!(reading.metric_kind, MetricKind::Humidity);
        assert_eq!(reading.unit, "%");
    }

    #[test]
    fn bare_number_is_a_value() {
        let message = decode("sensors/o-1/occupancy", b"12").unwrap();
        assert!(matches!(message, InboundMessage::Reading(r) if r.value == 12.0));
    }

    #[test]
    fn metric_mismatch_is_rejected() {
        let err = decode(
            "sensors/t-1/temperature",
            br#"{"metricKind":"humidity","value":40}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::TopicMismatch { .. }));
    }

    #[test]
    fn unknown_metric_and_garbage_are_errors() {
        assert!(matches!(
            decode("sensors/p-1/pressure", b"1"),
            Err(DecodeError::UnknownMetricKind(_))
        ));
        assert!(matches!(
            decode("sensors/t-1/temperature", b"{not json"),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn status_without_id_uses_topic() {
        let message = decode("hvac/ahu-1/status", br#"{"status":"running","powerKw":12.5}"#).unwrap();
        let InboundMessage::EquipmentStatus(status) = message else {
            panic!("expected a status");
        };
        assert_eq!(status.equipment_id, "ahu-1");
        assert_eq!(status.power_kw, Some(12.5));
    }

    #[test]
    fn other_topics_are_unknown() {
        let message = decode("weather/outdoor", b"{}").unwrap();
        assert!(matches!(message, InboundMessage::Unknown { topic, .. } if topic == "weather/outdoor"));
    }
}
