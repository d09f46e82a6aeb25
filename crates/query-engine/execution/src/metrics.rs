//! Metrics setup and update for calls to external services.

use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};

/// Counters and timings for OData requests and plan generation.
#[derive(Debug, Clone)]
pub struct Metrics {
    odata_request_total: IntCounter,
    odata_error_total: IntCounter,
    odata_request_duration: Histogram,
    generation_total: IntCounter,
    generation_error_total: IntCounter,
    generation_duration: Histogram,
}

impl Metrics {
    /// Set up counters and histograms used to produce Prometheus metrics.
    pub fn initialize(metrics_registry: &mut Registry) -> Result<Self, prometheus::Error> {
        let odata_request_total = add_int_counter_metric(
            metrics_registry,
            "odata_planner_odata_request_total",
            "Total OData requests, including failed ones.",
        )?;

        let odata_error_total = add_int_counter_metric(
            metrics_registry,
            "odata_planner_odata_error_total",
            "Total OData requests that failed after all attempts.",
        )?;

        let odata_request_duration = add_histogram_metric(
            metrics_registry,
            "odata_planner_odata_request_duration_seconds",
            "Duration of OData requests, including retries, in seconds.",
        )?;

        let generation_total = add_int_counter_metric(
            metrics_registry,
            "odata_planner_generation_total",
            "Total plan generation calls, including failed ones.",
        )?;

        let generation_error_total = add_int_counter_metric(
            metrics_registry,
            "odata_planner_generation_error_total",
            "Total plan generation calls that failed.",
        )?;

        let generation_duration = add_histogram_metric(
            metrics_registry,
            "odata_planner_generation_duration_seconds",
            "Duration of plan generation calls, including retries, in seconds.",
        )?;

        Ok(Metrics {
            odata_request_total,
            odata_error_total,
            odata_request_duration,
            generation_total,
            generation_error_total,
            generation_duration,
        })
    }

    pub fn record_odata_request(&self, duration: Duration, succeeded: bool) {
        self.odata_request_total.inc();
        if !succeeded {
            self.odata_error_total.inc();
        }
        self.odata_request_duration.observe(duration.as_secs_f64());
    }

    pub fn record_generation(&self, duration: Duration, succeeded: bool) {
        self.generation_total.inc();
        if !succeeded {
            self.generation_error_total.inc();
        }
        self.generation_duration.observe(duration.as_secs_f64());
    }
}

/// Create a new int counter metric and register it with the provided Prometheus Registry
fn add_int_counter_metric(
    metrics_registry: &mut Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<IntCounter, prometheus::Error> {
    let int_counter = IntCounter::with_opts(Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_counter.clone()))?;
    Ok(int_counter)
}

/// Create a new histogram metric and register it with the provided Prometheus Registry
fn add_histogram_metric(
    metrics_registry: &mut Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<Histogram, prometheus::Error> {
    let histogram = Histogram::with_opts(HistogramOpts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}
