//! # Bulk CSV Loader Library
//!
//! A concurrent bulk loader that moves rows of a CSV file into a
//! DynamoDB-compatible key-value store. Designed for seeding tables, backfills
//! and load testing against DynamoDB Local.
//!
//! ## Features
//!
//! - **Hot-Partition Avoidance**: Records are shuffled before batching so sorted
//!   source files do not hammer one key range
//! - **Two Scheduling Strategies**: A preemptive worker thread pool or
//!   cooperative tasks behind a concurrency gate, sharing one algorithm
//! - **Retry with Backoff**: Exponential backoff with additive jitter, capped
//!   per attempt
//! - **Error Classification**: Permanent, throttling and transient failures are
//!   told apart so permanent errors fail fast
//! - **Full Accounting**: Every input record ends up either written or failed
//!
//! ## Quick Start
//!
//! ```no_run
//! use bulk_csv_loader::loader::{BulkLoader, LoaderConfig, Strategy};
//! use bulk_csv_loader::store::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoaderConfig::new("Orders")
//!     .with_strategy(Strategy::Async)
//!     .with_max_workers(8);
//!
//! let store = Arc::new(MemoryStore::new());
//! let loader = BulkLoader::new(config, store)?;
//!
//! let result = loader.load("orders.csv").await?;
//! println!("{} of {} records written", result.successful_writes, result.total_records);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`loader`] - Configuration, retry, error classification and the load orchestrators
//! - [`source`] - CSV record source and synthetic data generator
//! - [`store`] - The batch-write boundary to the key-value store
//! - [`metrics`] - Load metrics and the Prometheus exporter
//! - [`cli`] - Command line front end

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::ser::{Serialize, SerializeMap, Serializer};

/// CLI command implementations
pub mod cli;

/// Load orchestration, configuration and retry
pub mod loader;

/// Load metrics
pub mod metrics;

/// Record sources (CSV reader and generator)
pub mod source;

/// Key-value store boundary
pub mod store;

// Re-export commonly used types
pub use loader::{BatchResult, BulkLoader, LoadResult, LoaderConfig, Strategy};

/// One row of a source file: field names mapped to string values, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(field, value)` pairs, keeping their order
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (name, value) in pairs {
            record.insert(name, value);
        }
        record
    }

    /// Set a field. An existing field keeps its position and gets the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Look up a field value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(field, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Field names in column order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A group of records submitted to the store in one write call.
///
/// The batch is the unit of a write attempt and of retry; batches are never
/// merged or split once partitioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of the batch in the partitioning (0-based)
    pub id: usize,
    /// Records in write order
    pub records: Vec<Record>,
}

impl Batch {
    /// Create a batch
    pub fn new(id: usize, records: Vec<Record>) -> Self {
        Self { id, records }
    }

    /// Number of records in the batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
