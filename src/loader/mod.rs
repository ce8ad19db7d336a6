//! Load orchestration, retry and error classification
//!
//! This module provides the core load engine: configuration validation,
//! exponential backoff, error classification and the two concurrent
//! orchestrators that write batches to the store.
//!
//! # Overview
//!
//! A load runs the same steps regardless of strategy:
//!
//! 1. **Read**: Parse the whole CSV file with [`crate::source::read_source`]
//! 2. **Shuffle**: Randomize record order to spread writes across the keyspace
//! 3. **Partition**: Split into batches of at most 25 with [`batch::partition`]
//! 4. **Dispatch**: Write batches under bounded concurrency ([`threaded`] or [`cooperative`])
//! 5. **Retry**: Wrap every batch write in [`retry::RetryHandler`]
//! 6. **Aggregate**: Fold each [`BatchResult`] into one [`LoadResult`]
//!
//! # Quick Start
//!
//! ```no_run
//! use bulk_csv_loader::loader::{BulkLoader, LoaderConfig, Strategy};
//! use bulk_csv_loader::store::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoaderConfig::new("Orders").with_strategy(Strategy::Threaded);
//! let loader = BulkLoader::new(config, Arc::new(MemoryStore::new()))?;
//! let result = loader.load("./sample_10k.csv").await?;
//! assert_eq!(result.successful_writes + result.failed_writes, result.total_records);
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`config`] - Loader configuration, defaults and validation
//! - [`classify`] - Error categories and retry dispositions
//! - [`retry`] - Exponential backoff with jitter
//! - [`batch`] - Shuffling and batch partitioning
//! - [`executor`] - The strategy-independent load algorithm
//! - [`threaded`] - Preemptive worker thread pool dispatcher
//! - [`cooperative`] - Cooperative task dispatcher behind a [`gate::ConcurrencyGate`]
//! - [`result`] - Per-batch and per-load results
//!
//! # Error Handling
//!
//! Only failures that prevent a load from starting surface as [`LoadError`]:
//! an invalid configuration or an unreadable source file. Failures while
//! writing a batch are captured in that batch's [`BatchResult`] and never
//! abort sibling batches.

pub mod batch;
pub mod classify;
pub mod config;
pub mod cooperative;
pub mod executor;
pub mod gate;
pub mod result;
pub mod retry;
pub mod threaded;

pub use classify::{handle_error, ErrorAction, ErrorCategory};
pub use config::{ConfigError, LoaderConfig, Strategy};
pub use executor::BulkLoader;
pub use result::{BatchResult, LoadResult};
pub use retry::RetryHandler;

use crate::source::SourceError;

/// Errors that abort a load before or during dispatch
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Invalid loader configuration
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Source file could not be read or parsed
    #[error("source error: {0}")]
    SourceError(#[from] SourceError),

    /// The dispatcher itself failed (worker pool could not be joined)
    #[error("dispatch error: {0}")]
    DispatchError(String),
}
