//! Per-kind thresholds and severity classification.

use serde::Deserialize;

use crate::domain::alert::{AlertKind, Severity};
use crate::error::{ConfigError, Result};

/// Exceedance at which each severity starts. Below `medium` is low.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SeverityBands {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl SeverityBands {
    #[must_use]
    pub fn classify(&self, exceedance: f64) -> Severity {
        if exceedance >= self.critical {
            Severity::Critical
        } else if exceedance >= self.high {
            Severity::High
        } else if exceedance >= self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// A threshold breach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breach {
    pub severity: Severity,
    /// The bound that was crossed.
    pub threshold: f64,
    pub exceedance: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum ThresholdRule {
    /// Safe band `[min, max]`; either side may be open.
    Band {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        bands: SeverityBands,
    },
    /// Any non-zero value is a breach of fixed severity.
    Flag { severity: Severity },
}

impl ThresholdRule {
    #[must_use]
    pub fn check(&self, value: f64) -> Option<Breach> {
        match self {
            Self::Band { min, max, bands } => {
                let (threshold, exceedance) = match (*min, *max) {
                    (_, Some(max)) if value > max => (max, value - max),
                    (Some(min), _) if value < min => (min, min - value),
                    _ => return None,
                };
                Some(Breach {
                    severity: bands.classify(exceedance),
                    threshold,
                    exceedance,
                })
            }
            Self::Flag { severity } => (value != 0.0).then_some(Breach {
                severity: *severity,
                threshold: 0.0,
                exceedance: value.abs(),
            }),
        }
    }

    fn validate(&self, field: &'static str) -> Result<()> {
        let Self::Band { min, max, bands } = self else {
            return Ok(());
        };
        let reason = if min.is_none() && max.is_none() {
            Some("band needs at least one of min or max")
        } else if matches!((min, max), (Some(lo), Some(hi)) if lo > hi) {
            Some("min must not exceed max")
        } else if !(bands.medium <= bands.high && bands.high <= bands.critical) {
            Some("bands must be ordered medium <= high <= critical")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// Rule per alert kind. A kind without a rule never alerts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThresholdTable {
    pub temperature: Option<ThresholdRule>,
    pub humidity: Option<ThresholdRule>,
    pub occupancy: Option<ThresholdRule>,
    pub energy: Option<ThresholdRule>,
    pub equipment_fault: Option<ThresholdRule>,
}

impl ThresholdTable {
    #[must_use]
    pub fn rule(&self, kind: AlertKind) -> Option<&ThresholdRule> {
        match kind {
            AlertKind::Temperature => self.temperature.as_ref(),
            AlertKind::Humidity => self.humidity.as_ref(),
            AlertKind::Occupancy => self.occupancy.as_ref(),
            AlertKind::Energy => self.energy.as_ref(),
            AlertKind::EquipmentFault => self.equipment_fault.as_ref(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let rules = [
            ("alerts.thresholds.temperature", &self.temperature),
            ("alerts.thresholds.humidity", &self.humidity),
            ("alerts.thresholds.occupancy", &self.occupancy),
            ("alerts.thresholds.energy", &self.energy),
            ("alerts.thresholds.equipment_fault", &self.equipment_fault),
        ];
        rules
            .into_iter()
            .filter_map(|(field, rule)| rule.as_ref().map(|rule| (field, rule)))
            .try_for_each(|(field, rule)| rule.validate(field))
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            temperature: Some(ThresholdRule::Band {
                min: Some(60.0),
                max: Some(80.0),
                bands: SeverityBands {
                    medium: 3.0,
                    high: 6.0,
                    critical: 10.0,
                },
            }),
            humidity: Some(ThresholdRule::Band {
                min: Some(30.0),
                max: Some(60.0),
                bands: SeverityBands {
                    medium: 5.0,
                    high: 10.0,
                    critical: 20.0,
                },
            }),
            occupancy: None,
            energy: Some(ThresholdRule::Band {
                min: None,
                max: Some(100.0),
                bands: SeverityBands {
                    medium: 10.0,
                    high: 25.0,
                    critical: 50.0,
                },
            }),
            equipment_fault: Some(ThresholdRule::Flag {
                severity: Severity::High,
            }),
        }
    }
}
