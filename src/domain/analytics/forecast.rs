//! Least-squares trend and forecasting.
//!
//! The regressor is the sample index (`x = 0..n`), so inputs are assumed to
//! be evenly spaced in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::reading::Reading;
use crate::error::AnalyticsError;

/// Ordinary least-squares fit of value against index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 1.0 for a constant series.
    pub r_squared: f64,
}

impl LinearFit {
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Fit a line through `(i, values[i])`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientHistory`] with fewer than two points.
pub fn linear_fit(values: &[f64]) -> Result<LinearFit, AnalyticsError> {
    let n = values.len();
    if n < 2 {
        return Err(AnalyticsError::InsufficientHistory {
            required: 2,
            actual: n,
        });
    }

    let count = n as f64;
    let mean_x = (count - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / count;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let (mut ss_res, mut ss_tot) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let predicted = slope * i as f64 + intercept;
        ss_res += (y - predicted).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    let r_squared = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Project `horizon` values past the end of `values`, floored at zero.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientHistory`] with fewer than two points.
pub fn try_forecast(values: &[f64], horizon: usize) -> Result<Vec<f64>, AnalyticsError> {
    let fit = linear_fit(values)?;
    let n = values.len();
    Ok((n..n + horizon)
        .map(|x| fit.predict(x as f64).max(0.0))
        .collect())
}

/// Like [`try_forecast`], but an empty result stands in for short history.
#[must_use]
pub fn forecast(values: &[f64], horizon: usize) -> Vec<f64> {
    try_forecast(values, horizon).unwrap_or_default()
}

/// Forecast a reading series, stamping each point `step` after the last.
#[must_use]
pub fn forecast_readings(history: &[Reading], horizon: usize, step: Duration) -> Vec<ForecastPoint> {
    let Some(last) = history.last() else {
        return Vec::new();
    };
    let values: Vec<f64> = history.iter().map(|r| r.value).collect();

    forecast(&values, horizon)
        .into_iter()
        .zip(1i32..)
        .map(|(value, k)| ForecastPoint {
            timestamp: last.timestamp + step * k,
            value,
        })
        .collect()
}
