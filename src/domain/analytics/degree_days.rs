//! Heating and cooling degree-days over daily mean temperatures (°F).

use serde::{Deserialize, Serialize};

/// Conventional balance point.
pub const DEFAULT_BASE_F: f64 = 65.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeDayMode {
    Heating,
    Cooling,
}

/// Sum of `base - t` over days colder than `base`.
#[must_use]
pub fn heating_degree_days(daily_means: &[f64], base: f64) -> f64 {
    degree_days(daily_means, base, DegreeDayMode::Heating)
}

/// Sum of `t - base` over days warmer than `base`.
#[must_use]
pub fn cooling_degree_days(daily_means: &[f64], base: f64) -> f64 {
    degree_days(daily_means, base, DegreeDayMode::Cooling)
}

#[must_use]
pub fn degree_days(daily_means: &[f64], base: f64, mode: DegreeDayMode) -> f64 {
    daily_means
        .iter()
        .filter(|t| t.is_finite())
        .map(|t| match mode {
            DegreeDayMode::Heating => (base - t).max(0.0),
            DegreeDayMode::Cooling => (t - base).max(0.0),
        })
        .sum()
}

/// Heating plus cooling degree-days.
#[must_use]
pub fn total_degree_days(daily_means: &[f64], base: f64) -> f64 {
    heating_degree_days(daily_means, base) + cooling_degree_days(daily_means, base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_heating_and_cooling() {
        let days = [60.0, 65.0, 70.0, 50.0];
        assert_eq!(heating_degree_days(&days, DEFAULT_BASE_F), 20.0);
        assert_eq!(cooling_degree_days(&days, DEFAULT_BASE_F), 5.0);
        assert_eq!(total_degree_days(&days, DEFAULT_BASE_F), 25.0);
    }

    #[test]
    fn ignores_missing_days() {
        assert_eq!(heating_degree_days(&[f64::NAN, 55.0], 65.0), 10.0);
        assert_eq!(cooling_degree_days(&[], 65.0), 0.0);
    }
}
