//! Return on investment for efficiency retrofits.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiInput {
    pub initial_cost: f64,
    pub annual_savings: f64,
    /// Fractional rate, e.g. `0.05` for 5%.
    pub discount_rate: f64,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiSummary {
    /// Discounted savings over the horizon minus the initial cost.
    pub npv: f64,
    pub simple_payback_years: f64,
    pub total_savings: f64,
    /// Undiscounted return relative to cost; absent for zero-cost projects.
    pub roi_percent: Option<f64>,
}

/// Net present value and simple payback.
///
/// # Errors
///
/// [`AnalyticsError::NonPositiveSavings`] when savings are zero or negative
/// (payback is undefined), [`AnalyticsError::InvalidInput`] for a negative
/// cost, a zero horizon or a discount rate at or below -100%.
pub fn roi(input: &RoiInput) -> Result<RoiSummary, AnalyticsError> {
    let RoiInput {
        initial_cost,
        annual_savings,
        discount_rate,
        years,
    } = *input;

    if annual_savings.is_nan() || annual_savings <= 0.0 {
        return Err(AnalyticsError::NonPositiveSavings { annual_savings });
    }
    if !initial_cost.is_finite() || initial_cost < 0.0 {
        return Err(AnalyticsError::InvalidInput {
            field: "initial_cost",
            reason: format!("must be a non-negative number, got {initial_cost}"),
        });
    }
    if !discount_rate.is_finite() || discount_rate <= -1.0 {
        return Err(AnalyticsError::InvalidInput {
            field: "discount_rate",
            reason: format!("must be greater than -1, got {discount_rate}"),
        });
    }
    if years == 0 {
        return Err(AnalyticsError::InvalidInput {
            field: "years",
            reason: "must be at least 1".to_string(),
        });
    }

    let discounted: f64 = (1..=years)
        .map(|t| annual_savings / (1.0 + discount_rate).powi(t as i32))
        .sum();
    let total_savings = annual_savings * f64::from(years);
    let roi_percent =
        (initial_cost > 0.0).then(|| (total_savings - initial_cost) / initial_cost * 100.0);

    Ok(RoiSummary {
        npv: discounted - initial_cost,
        simple_payback_years: initial_cost / annual_savings,
        total_savings,
        roi_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn undiscounted_npv_is_savings_minus_cost() {
        let summary = roi(&RoiInput {
            initial_cost: 1000.0,
            annual_savings: 250.0,
            discount_rate: 0.0,
            years: 5,
        })
        .unwrap();

        assert!(approx(summary.npv, 250.0));
        assert!(approx(summary.simple_payback_years, 4.0));
        assert_eq!(summary.total_savings, 1250.0);
        assert!(approx(summary.roi_percent.unwrap(), 25.0));
    }

    #[test]
    fn discounting_reduces_npv() {
        let summary = roi(&RoiInput {
            initial_cost: 100.0,
            annual_savings: 110.0,
            discount_rate: 0.10,
            years: 1,
        })
        .unwrap();
        assert!(approx(summary.npv, 0.0));
    }

    #[test]
    fn non_positive_savings_is_rejected() {
        let input = RoiInput {
            initial_cost: 100.0,
            annual_savings: 0.0,
            discount_rate: 0.05,
            years: 10,
        };
        assert_eq!(
            roi(&input),
            Err(AnalyticsError::NonPositiveSavings { annual_savings: 0.0 })
        );
    }

    #[test]
    fn invalid_horizon_and_rate_are_rejected() {
        let base = RoiInput {
            initial_cost: 100.0,
            annual_savings: 10.0,
            discount_rate: 0.05,
            years: 10,
        };
        assert!(roi(&RoiInput { years: 0, ..base }).is_err());
        assert!(roi(&RoiInput { discount_rate: -1.0, ..base }).is_err());
        assert!(roi(&RoiInput { initial_cost: -5.0, ..base }).is_err());
    }
}
