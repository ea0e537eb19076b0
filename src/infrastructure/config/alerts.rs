//! Alert engine configuration.

use serde::Deserialize;

use crate::application::alert::ThresholdTable;

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    /// Resolve an open alert when its source returns to the safe band.
    #[serde(default = "default_true")]
    pub auto_resolve: bool,
    /// Publish a shutdown command for critical alerts on equipment.
    #[serde(default = "default_true")]
    pub protective_action: bool,
    #[serde(default)]
    pub thresholds: ThresholdTable,
}

fn default_true() -> bool {
    true
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            auto_resolve: true,
            protective_action: true,
            thresholds: ThresholdTable::default(),
        }
    }
}
