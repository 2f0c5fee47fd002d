// Metrics and observability module
// Self-instrumentation for the exporter: upstream API latency and errors,
// scrape duration and per-family collection failures

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Histogram,
    HistogramVec,
};

pub static REQ_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "opsgenie_exporter_api_request_duration_seconds",
        "latency for opsgenie api calls",
        &["method"]
    )
    .unwrap()
});

pub static REQ_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "opsgenie_exporter_api_request_errors_total",
        "failed opsgenie api calls",
        &["method"]
    )
    .unwrap()
});

pub static SCRAPE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "opsgenie_exporter_scrape_duration_seconds",
        "time spent collecting one opsgenie snapshot",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .unwrap()
});

pub static SCRAPE_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "opsgenie_exporter_scrape_failures_total",
        "metric families that ended early during a scrape",
        &["family"]
    )
    .unwrap()
});
