//! Consumption from demand samples.

use crate::domain::reading::Reading;

/// Energy in kWh from time-ordered kW samples (trapezoidal rule).
///
/// Pairs that are out of order or non-finite contribute nothing.
#[must_use]
pub fn energy_kwh(readings: &[Reading]) -> f64 {
    readings
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            let hours = (b.timestamp - a.timestamp).num_milliseconds() as f64 / 3_600_000.0;
            let area = (a.value + b.value) / 2.0 * hours;
            (hours > 0.0 && area.is_finite()).then_some(area)
        })
        .sum()
}

/// Cost of `kwh` at a flat `rate_per_kwh`.
#[must_use]
pub fn energy_cost(kwh: f64, rate_per_kwh: f64) -> f64 {
    kwh * rate_per_kwh
}
