//! In-memory store
//!
//! Keeps every written record per table. Used for dry runs from the command
//! line and as the reference store in tests and benches.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{check_batch_size, BatchStore, StoreResult};
use crate::Record;

/// Store that appends written records to per-table vectors
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records written to `table`, in arrival order
    pub fn written(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of records written to `table`
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map_or(0, Vec::len)
    }

    /// Whether nothing has been written to `table`
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Number of `write_batch` calls received, including rejected ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn write_batch(&self, table: &str, records: &[Record]) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        check_batch_size(records)?;

        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
