//! Component K: the gateway's Prometheus-compatible instrumentation,
//! registered once against a `metrics-exporter-prometheus` recorder.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Thin handle wrapping the `metrics` facade. Holding an instance is not
/// required to record metrics (the macros are global), but a handle keeps
/// the call sites testable and documents exactly which series this crate
/// emits.
#[derive(Debug, Default)]
pub struct GatewayMetrics;

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hits(&self) {
        counter!("cache_hits_total").increment(1);
    }

    pub fn cache_misses(&self) {
        counter!("cache_misses_total").increment(1);
    }

    pub fn cache_evicts(&self) {
        counter!("cache_evictions_total").increment(1);
    }

    pub fn set_active_torrents(&self, n: usize) {
        gauge!("active_torrents").set(n as f64);
    }

    pub fn downloader_creation(&self, elapsed: Duration, result: &'static str) {
        counter!("downloader_creations_total", "result" => result).increment(1);
        histogram!("downloader_creation_duration_seconds", "result" => result)
            .record(elapsed.as_secs_f64());
    }

    pub fn list_files(&self, elapsed: Duration, result: &'static str) {
        counter!("list_files_requests_total", "result" => result).increment(1);
        histogram!("list_files_duration_seconds", "result" => result).record(elapsed.as_secs_f64());
    }

    pub fn stream_file_requests(&self, result: &'static str) {
        counter!("stream_file_requests_total", "result" => result).increment(1);
    }

    pub fn observe_stream_duration(&self, elapsed: Duration, result: &'static str) {
        histogram!("stream_file_duration_seconds", "result" => result).record(elapsed.as_secs_f64());
    }

    pub fn observe_ttfb(&self, elapsed: Duration, result: &'static str) {
        histogram!("stream_file_ttfb_seconds", "result" => result).record(elapsed.as_secs_f64());
    }

    pub fn add_stream_bytes(&self, n: u64) {
        counter!("stream_file_bytes_total").increment(n);
    }

    pub fn inc_active_streams(&self) {
        gauge!("active_streams").increment(1.0);
    }

    pub fn dec_active_streams(&self) {
        gauge!("active_streams").decrement(1.0);
    }
}

/// Installs the global Prometheus recorder. Call once at process startup;
/// the core never calls this itself, leaving the choice of exporter address
/// and namespace to the binary.
pub fn install_prometheus_recorder(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, metrics_exporter_prometheus::BuildError>
{
    metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()
}
