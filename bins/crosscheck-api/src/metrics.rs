// Prometheus metrics for comparison runs
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

pub struct Metrics {
    registry: Registry,
    runs_total: IntCounterVec,
    run_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let runs_total = IntCounterVec::new(
            Opts::new("crosscheck_runs_total", "Comparison runs by outcome"),
            &["outcome"],
        )?;
        let run_duration = HistogramVec::new(
            HistogramOpts::new(
                "crosscheck_run_duration_seconds",
                "Wall time of a comparison run",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
            &["outcome"],
        )?;

        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(run_duration.clone()))?;

        Ok(Self {
            registry,
            runs_total,
            run_duration,
        })
    }

    pub fn observe_run(&self, outcome: &str, elapsed: Duration) {
        self.runs_total.with_label_values(&[outcome]).inc();
        self.run_duration
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());
    }

    /// Text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_runs_are_rendered() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_run("matched", Duration::from_millis(300));
        metrics.observe_run("matched", Duration::from_millis(700));
        metrics.observe_run("diverged", Duration::from_secs(2));

        let text = metrics.render().unwrap();
        assert!(text.contains("crosscheck_runs_total{outcome=\"matched\"} 2"));
        assert!(text.contains("crosscheck_runs_total{outcome=\"diverged\"} 1"));
        assert!(text.contains("crosscheck_run_duration_seconds_count{outcome=\"matched\"} 2"));
    }
}
