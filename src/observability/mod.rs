//! Prometheus metrics for the query pipeline.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    queries: IntCounterVec,
    forecast_latency: Histogram,
    cached_locations: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let queries = IntCounterVec::new(
            Opts::new("weatherbot_queries_total", "Weather queries by final outcome"),
            &["outcome"],
        )?;
        let forecast_latency = Histogram::with_opts(
            HistogramOpts::new(
                "weatherbot_forecast_latency_seconds",
                "Time spent waiting for the forecast provider",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;
        let cached_locations = IntGauge::new(
            "weatherbot_cached_locations",
            "Users with a cached last-known location",
        )?;

        registry.register(Box::new(queries.clone()))?;
        registry.register(Box::new(forecast_latency.clone()))?;
        registry.register(Box::new(cached_locations.clone()))?;

        Ok(Self {
            registry,
            queries,
            forecast_latency,
            cached_locations,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.queries.with_label_values(&[outcome]).inc();
    }

    pub fn observe_forecast_latency(&self, seconds: f64) {
        self.forecast_latency.observe(seconds);
    }

    pub fn set_cached_locations(&self, count: usize) {
        self.cached_locations
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.queries.with_label_values(&[outcome]).get()
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_counted_per_label() {
        let metrics = Metrics::new().unwrap();
        metrics.record_outcome("delivered");
        metrics.record_outcome("delivered");
        metrics.record_outcome("timeout");

        assert_eq!(metrics.outcome_count("delivered"), 2);
        assert_eq!(metrics.outcome_count("timeout"), 1);
        assert_eq!(metrics.outcome_count("auth"), 0);
    }

    #[test]
    fn encode_exposes_all_families() {
        let metrics = Metrics::new().unwrap();
        metrics.record_outcome("access_denied");
        metrics.observe_forecast_latency(0.3);
        metrics.set_cached_locations(4);

        let text = metrics.encode().unwrap();
        assert!(text.contains("weatherbot_queries_total{outcome=\"access_denied\"} 1"));
        assert!(text.contains("weatherbot_forecast_latency_seconds_count 1"));
        assert!(text.contains("weatherbot_cached_locations 4"));
    }
}
