//! Hierarchical topics and wildcard subscription patterns.
//!
//! Topics are slash-delimited routing keys such as
//! `sensors/{deviceId}/temperature`. Subscription patterns may use `+` to
//! match exactly one segment and a trailing `#` to match the remainder.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidTopicPattern, Result};

/// Single-level wildcard.
pub const SINGLE_LEVEL: &str = "+";
/// Multi-level wildcard, valid only as the final segment.
pub const MULTI_LEVEL: &str = "#";

/// Well-known topic namespace.
pub mod topics {
    use crate::domain::reading::MetricKind;

    /// Every sensor reading, any device and metric.
    pub const SENSOR_FILTER: &str = "sensors/+/+";
    /// Every equipment status report.
    pub const HVAC_STATUS_FILTER: &str = "hvac/+/status";
    /// Every control command.
    pub const CONTROL_FILTER: &str = "equipment/+/control";
    /// Every alert notice.
    pub const ALERT_FILTER: &str = "alerts/+";

    #[must_use]
    pub fn hvac_status(equipment_id: &str) -> String {
        format!("hvac/{equipment_id}/status")
    }

    #[must_use]
    pub fn sensor(device_id: &str, metric: MetricKind) -> String {
        format!("sensors/{device_id}/{}", metric.as_str())
    }

    #[must_use]
    pub fn equipment_control(equipment_id: &str) -> String {
        format!("equipment/{equipment_id}/control")
    }

    #[must_use]
    pub fn alert(alert_id: &str) -> String {
        format!("alerts/{alert_id}")
    }
}

/// Where a concrete topic belongs in the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRoute<'a> {
    HvacStatus { equipment_id: &'a str },
    Sensor { device_id: &'a str, metric: &'a str },
    EquipmentControl { equipment_id: &'a str },
    Alert { alert_id: &'a str },
    Other,
}

impl<'a> TopicRoute<'a> {
    /// Classify a concrete (wildcard-free) topic.
    #[must_use]
    pub fn of(topic: &'a str) -> Self {
        let segments: Vec<&str> = topic.split('/').collect();
        match segments[..] {
            ["hvac", id, "status"] => Self::HvacStatus { equipment_id: id },
            ["sensors", id, metric] => Self::Sensor {
                device_id: id,
                metric,
            },
            ["equipment", id, "control"] => Self::EquipmentControl { equipment_id: id },
            ["alerts", id] => Self::Alert { alert_id: id },
            _ => Self::Other,
        }
    }
}

/// Returns true when `topic` is matched by `pattern`.
///
/// Both are split on `/`. `+` consumes exactly one topic segment, a trailing
/// `#` consumes every remaining segment (including none), and any other
/// segment must be equal. Without `#`, segment counts must match.
#[must_use]
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut topic_segments = topic.split('/');

    loop {
        match (pattern_segments.next(), topic_segments.next()) {
            (Some(MULTI_LEVEL), _) => return true,
            (Some(SINGLE_LEVEL), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Validate a concrete topic used for publishing.
pub fn validate_topic(topic: &str) -> Result<()> {
    let reason = if topic.is_empty() {
        Some("topic is empty")
    } else if topic.contains(['+', '#']) {
        Some("wildcards are not allowed in a published topic")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidTopic {
            topic: topic.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// A validated subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPattern(String);

impl TopicPattern {
    /// Parse and validate a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTopicPattern`] when the pattern is empty, mixes a
    /// wildcard with literal text inside one segment, or places `#` anywhere
    /// but the last segment.
    pub fn parse(pattern: &str) -> std::result::Result<Self, InvalidTopicPattern> {
        let invalid = |reason| InvalidTopicPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }

        let segments: Vec<&str> = pattern.split('/').collect();
        let last = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            if *segment == MULTI_LEVEL {
                if index != last {
                    return Err(invalid("'#' is only allowed as the final segment"));
                }
            } else if *segment != SINGLE_LEVEL && segment.contains(['+', '#']) {
                return Err(invalid("wildcards must occupy a whole segment"));
            }
        }

        Ok(Self(pattern.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the pattern contains no wildcard.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        !self.0.split('/').any(|s| s == SINGLE_LEVEL || s == MULTI_LEVEL)
    }

    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        topic_matches(&self.0, topic)
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TopicPattern {
    type Err = InvalidTopicPattern;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_requires_exact_match() {
        assert!(topic_matches("hvac/ahu-1/status", "hvac/ahu-1/status"));
        assert!(!topic_matches("hvac/ahu-1/status", "hvac/ahu-2/status"));
        assert!(!topic_matches("hvac/ahu-1/status", "hvac/ahu-1/status/extra"));
        assert!(!topic_matches("hvac/ahu-1/status", "hvac/ahu-1"));
    }

    #[test]
    fn plus_consumes_exactly_one_segment() {
        assert!(topic_matches("sensors/+/temperature", "sensors/t-7/temperature"));
        assert!(topic_matches("sensors/+/+", "sensors/t-7/humidity"));
        assert!(!topic_matches("sensors/+/temperature", "sensors/a/b/temperature"));
        assert!(!topic_matches("sensors/+", "sensors"));
    }

    #[test]
    fn plus_matches_empty_segment() {
        assert!(topic_matches("a/+/c", "a//c"));
    }

    #[test]
    fn hash_consumes_remainder() {
        assert!(topic_matches("sensors/#", "sensors/t-7/temperature"));
        assert!(topic_matches("sensors/#", "sensors/t-7"));
        assert!(topic_matches("sensors/#", "sensors"));
        assert!(topic_matches("#", "alerts/abc"));
        assert!(!topic_matches("sensors/#", "hvac/ahu-1/status"));
    }

    #[test]
    fn mixed_wildcards() {
        assert!(topic_matches("+/ahu-1/#", "hvac/ahu-1/status"));
        assert!(!topic_matches("+/ahu-1/#", "hvac/ahu-2/status"));
    }

    #[test]
    fn parse_rejects_malformed_patterns() {
        assert!(TopicPattern::parse("").is_err());
        assert!(TopicPattern::parse("sensors/#/temperature").is_err());
        assert!(TopicPattern::parse("sensors/t+/temperature").is_err());
        assert!(TopicPattern::parse("sensors/#x").is_err());
    }

    #[test]
    fn parse_accepts_valid_patterns() {
        for pattern in ["#", "+", "sensors/+/+", "hvac/+/status", "alerts/#", "a/b/c"] {
            assert!(TopicPattern::parse(pattern).is_ok(), "{pattern}");
        }
        assert!(TopicPattern::parse("a/b/c").unwrap().is_literal());
        assert!(!TopicPattern::parse("a/+/c").unwrap().is_literal());
    }

    #[test]
    fn validate_topic_rejects_wildcards() {
        assert!(validate_topic("sensors/t-1/temperature").is_ok());
        assert!(validate_topic("sensors/+/temperature").is_err());
        assert!(validate_topic("").is_err());
    }

    #[test]
    fn routes_namespace() {
        assert_eq!(
            TopicRoute::of("hvac/ahu-1/status"),
            TopicRoute::HvacStatus { equipment_id: "ahu-1" }
        );
        assert_eq!(
            TopicRoute::of("sensors/t-1/humidity"),
            TopicRoute::Sensor {
                device_id: "t-1",
                metric: "humidity"
            }
        );
        assert_eq!(
            TopicRoute::of("equipment/ahu-1/control"),
            TopicRoute::EquipmentControl { equipment_id: "ahu-1" }
        );
        assert_eq!(TopicRoute::of("alerts/42"), TopicRoute::Alert { alert_id: "42" });
        assert_eq!(TopicRoute::of("weather/outdoor"), TopicRoute::Other);
    }
}
