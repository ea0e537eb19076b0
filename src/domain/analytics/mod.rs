//! Pure analytics over time-ordered readings.
//!
//! Nothing here performs I/O or holds state. Functions with a meaningful
//! failure mode return [`AnalyticsError`](crate::error::AnalyticsError);
//! the rest degrade to an empty or `None` result.

pub mod degree_days;
pub mod demand;
pub mod energy;
pub mod forecast;
pub mod roi;

pub use degree_days::{
    cooling_degree_days, degree_days, heating_degree_days, total_degree_days, DegreeDayMode,
    DEFAULT_BASE_F,
};
pub use demand::{peak_demand, peak_demand_in, DemandSummary};
pub use energy::{energy_cost, energy_kwh};
pub use forecast::{forecast, forecast_readings, linear_fit, try_forecast, ForecastPoint, LinearFit};
pub use roi::{roi, RoiInput, RoiSummary};
