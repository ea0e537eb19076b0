//! Energy reports over retained telemetry, cached per source.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::cache::{escape_glob, Cache};
use crate::application::ingest::SeriesStore;
use crate::domain::analytics::{
    energy_cost, energy_kwh, forecast_readings, peak_demand, DemandSummary, ForecastPoint,
};
use crate::domain::reading::MetricKind;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyReport {
    pub source_id: String,
    pub kwh: f64,
    pub cost: f64,
    pub rate_per_kwh: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand: Option<DemandSummary>,
    /// Next points at the observed sampling interval; empty below two samples.
    pub forecast: Vec<ForecastPoint>,
}

pub struct EnergyReporter {
    series: Arc<SeriesStore>,
    cache: Arc<Cache>,
    ttl: Duration,
    horizon: usize,
}

impl EnergyReporter {
    #[must_use]
    pub fn new(series: Arc<SeriesStore>, cache: Arc<Cache>, ttl: Duration, horizon: usize) -> Self {
        Self {
            series,
            cache,
            ttl,
            horizon,
        }
    }

    /// Consumption, cost, demand and forecast for `source_id`.
    ///
    /// Served from cache for the configured TTL; an unreachable cache falls
    /// through to computing the report.
    pub async fn summary(&self, source_id: &str, rate_per_kwh: f64) -> Result<EnergyReport> {
        let key = format!("report:energy:{source_id}:{rate_per_kwh}");
        self.cache
            .remember(&key, self.ttl, || async { Ok(self.compute(source_id, rate_per_kwh)) })
            .await
    }

    /// Drop cached reports for `source_id`. Returns the number removed.
    pub async fn invalidate(&self, source_id: &str) -> u64 {
        let pattern = format!("report:energy:{}:*", escape_glob(source_id));
        self.cache.invalidate(&pattern).await
    }

    fn compute(&self, source_id: &str, rate_per_kwh: f64) -> EnergyReport {
        let history = self.series.snapshot(source_id, MetricKind::Energy);
        let kwh = energy_kwh(&history);
        let forecast = match history.as_slice() {
            [.., prev, last] => {
                let step = last.timestamp - prev.timestamp;
                forecast_readings(&history, self.horizon, step)
            }
            _ => Vec::new(),
        };
        debug!(source = source_id, samples = history.len(), kwh, "Energy report computed");

        EnergyReport {
            source_id: source_id.to_string(),
            kwh,
            cost: energy_cost(kwh, rate_per_kwh),
            rate_per_kwh,
            demand: peak_demand(&history),
            forecast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::testkit::domain::energy_series;
    use crate::testkit::store::UnavailableStore;

    fn reporter(cache: Cache) -> (EnergyReporter, Arc<SeriesStore>) {
        let series = Arc::new(SeriesStore::new(16));
        let reporter = EnergyReporter::new(series.clone(), Arc::new(cache), Duration::from_secs(60), 2);
        (reporter, series)
    }

    fn memory_cache() -> Cache {
        Cache::new(Arc::new(MemoryStore::new()), "t", Duration::from_millis(200))
    }

    #[tokio::test]
    async fn report_integrates_and_forecasts() {
        let (reporter, series) = reporter(memory_cache());
        for reading in energy_series("m-1", 30, &[10.0, 20.0, 30.0]) {
            series.record(reading);
        }

        let report = reporter.summary("m-1", 0.5).await.unwrap();
        // 0.5h at avg 15 plus 0.5h at avg 25.
        assert!((report.kwh - 20.0).abs() < 1e-9);
        assert!((report.cost - 10.0).abs() < 1e-9);
        assert_eq!(report.demand.as_ref().unwrap().peak_value, 30.0);
        let values: Vec<f64> = report.forecast.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![40.0, 50.0]);
    }

    #[tokio::test]
    async fn cached_until_invalidated() {
        let (reporter, series) = reporter(memory_cache());
        let mut readings = energy_series("m-1", 60, &[10.0, 10.0, 10.0]).into_iter();
        series.record(readings.next().unwrap());
        series.record(readings.next().unwrap());

        let first = reporter.summary("m-1", 1.0).await.unwrap();
        series.record(readings.next().unwrap());
        assert_eq!(reporter.summary("m-1", 1.0).await.unwrap(), first);

        assert_eq!(reporter.invalidate("m-1").await, 1);
        let fresh = reporter.summary("m-1", 1.0).await.unwrap();
        assert!((fresh.kwh - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unreachable_cache_still_reports() {
        let cache = Cache::new(Arc::new(UnavailableStore), "t", Duration::from_millis(50));
        let (reporter, _) = reporter(cache);
        let report = reporter.summary("nobody", 0.2).await.unwrap();
        assert_eq!(report.kwh, 0.0);
        assert!(report.demand.is_none());
        assert!(report.forecast.is_empty());
    }
}
