//! Per-batch and per-load results

use serde::{Deserialize, Serialize};

use super::config::Strategy;

/// Outcome of writing one batch, produced exactly once per batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Batch id
    pub batch_id: usize,
    /// Records in the batch
    pub items_count: usize,
    /// Whether every record in the batch was written
    pub successful: bool,
    /// Retries consumed after the first attempt
    pub retry_count: u32,
    /// Failure description when unsuccessful
    pub error: Option<String>,
}

impl BatchResult {
    /// A batch that was written
    pub fn success(batch_id: usize, items_count: usize, retry_count: u32) -> Self {
        Self {
            batch_id,
            items_count,
            successful: true,
            retry_count,
            error: None,
        }
    }

    /// A batch that failed; all of its records count as failed
    pub fn failure(
        batch_id: usize,
        items_count: usize,
        retry_count: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            batch_id,
            items_count,
            successful: false,
            retry_count,
            error: Some(error.into()),
        }
    }
}

/// Running totals folded from batch results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadTally {
    /// Records written
    pub successful_writes: usize,
    /// Records in failed batches
    pub failed_writes: usize,
    /// Batches settled so far
    pub batches: usize,
    /// Retries consumed across all batches
    pub retries: u64,
    /// Error descriptions in completion order
    pub errors: Vec<String>,
}

impl LoadTally {
    /// Fold one batch result into the totals
    pub fn record(&mut self, result: BatchResult) {
        self.batches += 1;
        self.retries += u64::from(result.retry_count);
        if result.successful {
            self.successful_writes += result.items_count;
        } else {
            self.failed_writes += result.items_count;
            if let Some(error) = result.error {
                self.errors.push(error);
            }
        }
    }

    /// Records settled so far
    pub fn settled(&self) -> usize {
        self.successful_writes + self.failed_writes
    }
}

/// Summary of a whole load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    /// Records read from the source
    pub total_records: usize,
    /// Records written
    pub successful_writes: usize,
    /// Records that could not be written
    pub failed_writes: usize,
    /// Wall-clock duration in seconds
    pub duration_seconds: f64,
    /// One description per failed batch
    pub errors: Vec<String>,
    /// Batches dispatched
    pub batches: usize,
    /// Retries consumed across all batches
    pub retries: u64,
    /// Strategy that ran the load
    pub strategy: Strategy,
}

impl LoadResult {
    /// Result of a load with nothing to write
    pub fn empty(strategy: Strategy, duration_seconds: f64) -> Self {
        Self {
            total_records: 0,
            successful_writes: 0,
            failed_writes: 0,
            duration_seconds,
            errors: Vec::new(),
            batches: 0,
            retries: 0,
            strategy,
        }
    }

    /// Build the result from final totals
    pub fn from_tally(
        total_records: usize,
        tally: LoadTally,
        strategy: Strategy,
        duration_seconds: f64,
    ) -> Self {
        Self {
            total_records,
            successful_writes: tally.successful_writes,
            failed_writes: tally.failed_writes,
            duration_seconds,
            errors: tally.errors,
            batches: tally.batches,
            retries: tally.retries,
            strategy,
        }
    }

    /// Percentage of records written; 0 when there were none
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.successful_writes as f64 / self.total_records as f64 * 100.0
    }

    /// Records written per second of wall-clock time
    pub fn throughput(&self) -> f64 {
        if self.duration_seconds <= 0.0 {
            return 0.0;
        }
        self.successful_writes as f64 / self.duration_seconds
    }

    /// Whether every record was written
    pub fn is_complete(&self) -> bool {
        self.failed_writes == 0
    }
}
