//! Load metrics
//!
//! Records batch outcomes, retries and durations through the `metrics`
//! facade. When no recorder is installed the macros are no-ops, so the
//! loader always emits metrics and the binary decides whether to export them.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Prometheus exporter for an optional scrape endpoint (`--metrics-addr`)
//! - Counters labelled by table and strategy

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::loader::LoadResult;

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The Prometheus exporter could not be installed
    #[error("failed to install Prometheus exporter: {0}")]
    ExporterError(String),
}

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls are no-ops.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::ExporterError(e.to_string()))?;

    describe_counter!(
        "loader_batches_total",
        Unit::Count,
        "Batches settled, labelled by outcome"
    );

    describe_counter!(
        "loader_records_written_total",
        Unit::Count,
        "Records accepted by the store"
    );

    describe_counter!(
        "loader_records_failed_total",
        Unit::Count,
        "Records in batches that could not be written"
    );

    describe_counter!(
        "loader_retries_total",
        Unit::Count,
        "Retry attempts across all batches"
    );

    describe_histogram!(
        "loader_batch_duration_seconds",
        Unit::Seconds,
        "Time to settle one batch, retries included"
    );

    describe_histogram!(
        "loader_gate_wait_seconds",
        Unit::Seconds,
        "Time a batch waited for a concurrency permit"
    );

    describe_histogram!(
        "loader_load_duration_seconds",
        Unit::Seconds,
        "Wall-clock duration of a whole load"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Per-batch metrics, started when a worker picks up the batch
pub struct BatchMetrics {
    table: String,
    strategy: &'static str,
    start_time: Instant,
}

impl BatchMetrics {
    /// Start timing a batch
    pub fn start(table: impl Into<String>, strategy: &'static str) -> Self {
        Self {
            table: table.into(),
            strategy,
            start_time: Instant::now(),
        }
    }

    /// Record a written batch
    pub fn record_success(&self, items: usize, retries: u32) {
        self.record("success", retries);
        counter!(
            "loader_records_written_total",
            "table" => self.table.clone(),
        )
        .increment(items as u64);
    }

    /// Record a failed batch
    pub fn record_failure(&self, items: usize, retries: u32, category: &'static str) {
        self.record("failure", retries);
        counter!(
            "loader_records_failed_total",
            "table" => self.table.clone(),
            "category" => category,
        )
        .increment(items as u64);
    }

    fn record(&self, outcome: &'static str, retries: u32) {
        let duration = self.start_time.elapsed();

        counter!(
            "loader_batches_total",
            "table" => self.table.clone(),
            "strategy" => self.strategy,
            "outcome" => outcome,
        )
        .increment(1);

        if retries > 0 {
            counter!(
                "loader_retries_total",
                "table" => self.table.clone(),
            )
            .increment(u64::from(retries));
        }

        histogram!(
            "loader_batch_duration_seconds",
            "strategy" => self.strategy,
        )
        .record(duration.as_secs_f64());
    }
}

/// Record how long a batch waited for a concurrency permit
pub fn record_gate_wait(wait: Duration) {
    histogram!("loader_gate_wait_seconds").record(wait.as_secs_f64());

    if wait.as_millis() > 100 {
        debug!(wait_ms = wait.as_millis(), "Concurrency permit acquired after wait");
    }
}

/// Record the outcome of a whole load
pub fn record_load(table: &str, result: &LoadResult) {
    histogram!(
        "loader_load_duration_seconds",
        "table" => table.to_string(),
        "strategy" => result.strategy.to_string(),
    )
    .record(result.duration_seconds);

    info!(
        table = %table,
        strategy = %result.strategy,
        total_records = result.total_records,
        successful_writes = result.successful_writes,
        failed_writes = result.failed_writes,
        batches = result.batches,
        retries = result.retries,
        duration_secs = result.duration_seconds,
        "Load completed"
    );
}
