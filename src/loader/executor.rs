//! Load executor
//!
//! [`BulkLoader`] runs the strategy-independent part of a load: read the
//! source, shuffle, partition, hand the batches to a dispatcher and fold the
//! settled batches into a [`LoadResult`]. [`BatchWriter`] holds everything a
//! dispatcher needs to write and settle one batch.

use indicatif::ProgressBar;
use std::any::Any;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::batch::{partition, shuffle_records};
use super::classify::{self, handle_error, ErrorAction, ErrorCategory, ErrorContext};
use super::config::{ConfigError, LoaderConfig, Strategy};
use super::result::{BatchResult, LoadResult};
use super::retry::{RetryHandler, RetryOutcome};
use super::{cooperative, threaded, LoadError};
use crate::metrics::{self, BatchMetrics};
use crate::source::read_source;
use crate::store::{BatchStore, StoreError};
use crate::{Batch, Record};

/// Writes single batches with retry and turns the outcome into a [`BatchResult`]
pub struct BatchWriter {
    table: String,
    store: Arc<dyn BatchStore>,
    retry: RetryHandler,
    classify_errors: bool,
    strategy: Strategy,
    progress: Option<ProgressBar>,
}

impl BatchWriter {
    /// Writer for the table, retry policy and strategy in `config`
    pub fn new(
        config: &LoaderConfig,
        store: Arc<dyn BatchStore>,
        progress: Option<ProgressBar>,
    ) -> Self {
        Self {
            table: config.table_name.clone(),
            store,
            retry: RetryHandler::from_config(config),
            classify_errors: config.classify_errors,
            strategy: config.strategy,
            progress,
        }
    }

    /// Whether a failed attempt should be retried
    fn should_retry(&self, err: &StoreError, attempt: u32) -> bool {
        if !self.classify_errors {
            return true;
        }
        handle_error(err, attempt, self.retry.max_retries()) == ErrorAction::RetryWithBackoff
    }

    /// Write a batch from a task, suspending between attempts
    pub async fn write_async(&self, batch: &Batch) -> BatchResult {
        let metrics = BatchMetrics::start(self.table.as_str(), self.strategy_label());
        let outcome = self
            .retry
            .run_async(
                || self.store.write_batch(&self.table, &batch.records),
                |err, attempt| self.should_retry(err, attempt),
            )
            .await;
        self.settle(batch, outcome, &metrics)
    }

    /// Write a batch from a worker thread, blocking between attempts
    pub fn write_blocking(&self, handle: &Handle, batch: &Batch) -> BatchResult {
        let metrics = BatchMetrics::start(self.table.as_str(), self.strategy_label());
        let outcome = self.retry.run_blocking(
            || handle.block_on(self.store.write_batch(&self.table, &batch.records)),
            |err, attempt| self.should_retry(err, attempt),
        );
        self.settle(batch, outcome, &metrics)
    }

    /// Result for a batch whose write panicked
    pub fn panicked(&self, batch: &Batch, payload: &(dyn Any + Send)) -> BatchResult {
        let message = format!(
            "Batch {} failed with unexpected error: {}",
            batch.id,
            panic_message(payload)
        );
        error!(batch_id = batch.id, "{}", message);
        self.failed(batch, message)
    }

    /// Result for a batch that could not be attempted at all
    pub fn failed(&self, batch: &Batch, message: impl Into<String>) -> BatchResult {
        let result = BatchResult::failure(batch.id, batch.len(), 0, message);
        BatchMetrics::start(self.table.as_str(), self.strategy_label()).record_failure(
            batch.len(),
            0,
            ErrorCategory::Unclassified.as_str(),
        );
        self.advance(&result);
        result
    }

    fn settle(
        &self,
        batch: &Batch,
        outcome: RetryOutcome<(), StoreError>,
        metrics: &BatchMetrics,
    ) -> BatchResult {
        let retries = outcome.retries();
        let result = match outcome.result {
            Ok(()) => {
                debug!(
                    batch_id = batch.id,
                    items = batch.len(),
                    retries,
                    "Batch written successfully"
                );
                metrics.record_success(batch.len(), retries);
                BatchResult::success(batch.id, batch.len(), retries)
            }
            Err(err) => {
                let category = classify::classify(&err);
                classify::log_error_details(&err, &ErrorContext::batch_write(batch.id, &self.table));
                let message = if category == ErrorCategory::Permanent && self.classify_errors {
                    format!("Batch {} failed permanently: {}", batch.id, err)
                } else {
                    format!(
                        "Batch {} failed after {} attempts: {}",
                        batch.id, outcome.attempts, err
                    )
                };
                metrics.record_failure(batch.len(), retries, category.as_str());
                BatchResult::failure(batch.id, batch.len(), retries, message)
            }
        };
        self.advance(&result);
        result
    }

    fn advance(&self, result: &BatchResult) {
        if let Some(progress) = &self.progress {
            progress.inc(result.items_count as u64);
        }
    }

    fn strategy_label(&self) -> &'static str {
        match self.strategy {
            Strategy::Threaded => "threaded",
            Strategy::Async => "async",
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Bulk loader for one table and one strategy
pub struct BulkLoader {
    config: LoaderConfig,
    store: Arc<dyn BatchStore>,
    batch_size: NonZeroUsize,
    max_workers: NonZeroUsize,
    progress: Option<ProgressBar>,
}

impl BulkLoader {
    /// Create a loader. The configuration is validated first; an invalid
    /// configuration never produces a loader.
    pub fn new(config: LoaderConfig, store: Arc<dyn BatchStore>) -> Result<Self, ConfigError> {
        config.validate()?;

        let batch_size = usize::try_from(config.batch_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigError::InvalidBatchSize(config.batch_size))?;
        let workers = config.effective_max_workers();
        let max_workers = usize::try_from(workers)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigError::InvalidMaxWorkers(workers))?;

        info!(
            table = %config.table_name,
            region = %config.region,
            strategy = %config.strategy,
            max_workers = max_workers.get(),
            batch_size = batch_size.get(),
            max_retries = config.max_retries,
            store = %store.describe(),
            "Loader configured"
        );

        Ok(Self {
            config,
            store,
            batch_size,
            max_workers,
            progress: None,
        })
    }

    /// Report settled records on a progress bar
    pub fn with_progress_bar(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Validated configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Concurrency width after applying the strategy default
    pub fn max_workers(&self) -> usize {
        self.max_workers.get()
    }

    /// Load every row of a CSV file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed. Failed batch
    /// writes are reported in the result, not as errors.
    pub async fn load<P: AsRef<Path>>(&self, path: P) -> Result<LoadResult, LoadError> {
        let path = path.as_ref();
        let span = info_span!(
            "load",
            table = %self.config.table_name,
            strategy = %self.config.strategy,
            source = %path.display()
        );

        async move {
            let start = Instant::now();
            info!("Starting CSV load");
            let records = read_source(path)?;
            info!(records = records.len(), "Read records from CSV");
            self.run(records, start).await
        }
        .instrument(span)
        .await
    }

    /// Load records that are already in memory
    pub async fn load_records(&self, records: Vec<Record>) -> Result<LoadResult, LoadError> {
        let span = info_span!(
            "load",
            table = %self.config.table_name,
            strategy = %self.config.strategy
        );
        self.run(records, Instant::now()).instrument(span).await
    }

    async fn run(&self, mut records: Vec<Record>, start: Instant) -> Result<LoadResult, LoadError> {
        let strategy = self.config.strategy;
        let total_records = records.len();

        if total_records == 0 {
            warn!("No records to load");
            return Ok(LoadResult::empty(strategy, start.elapsed().as_secs_f64()));
        }

        debug!("Shuffling records to prevent hot partitions");
        shuffle_records(&mut records, self.config.shuffle_seed);

        let batches = partition(records, self.batch_size);
        info!(
            batches = batches.len(),
            batch_size = self.batch_size.get(),
            workers = self.max_workers.get(),
            "Dispatching batches"
        );

        if let Some(progress) = &self.progress {
            progress.set_length(total_records as u64);
        }

        let writer = Arc::new(BatchWriter::new(
            &self.config,
            Arc::clone(&self.store),
            self.progress.clone(),
        ));

        let tally = match strategy {
            Strategy::Threaded => {
                threaded::dispatch(writer, batches, self.max_workers.get()).await?
            }
            Strategy::Async => {
                cooperative::dispatch(&writer, batches, self.max_workers.get()).await
            }
        };

        if let Some(progress) = &self.progress {
            progress.finish_with_message("done");
        }

        let result = LoadResult::from_tally(
            total_records,
            tally,
            strategy,
            start.elapsed().as_secs_f64(),
        );
        metrics::record_load(&self.config.table_name, &result);
        Ok(result)
    }
}
