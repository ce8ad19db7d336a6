//! Key-value store implementations
//!
//! The loader only needs one operation from the store: write a batch of
//! records to a table. Implementations report failures as [`StoreError`] so
//! the error classifier can tell permanent, throttling and transient
//! failures apart.

use crate::Record;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod dynamodb_http;
pub mod memory;

/// Maximum number of items accepted by one batch write
pub const MAX_ITEMS_PER_BATCH: usize = 25;

/// Store errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Error response returned by the service
    #[error("{code}: {message}")]
    Service {
        /// Service error code (e.g. `ValidationException`)
        code: String,
        /// Human readable message from the service
        message: String,
        /// Request id, when the service returned one
        request_id: Option<String>,
    },

    /// Some items were not processed and must be resubmitted
    #[error("{unprocessed} of {total} items were not processed")]
    Unprocessed {
        /// Items the store reported back as unprocessed
        unprocessed: usize,
        /// Items submitted in the call
        total: usize,
    },

    /// Connection could not be established
    #[error("connection error: {0}")]
    Connection(String),

    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Other network-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Request rejected locally before it was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Anything the store could not describe more precisely
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Build a service error without a request id
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Service {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    /// Service error code, if the failure came from the service
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::Service { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// Service request id, if present
    pub fn request_id(&self) -> Option<&str> {
        match self {
            StoreError::Service { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Short name of the error variant, used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Service { .. } => "service",
            StoreError::Unprocessed { .. } => "unprocessed",
            StoreError::Connection(_) => "connection",
            StoreError::Timeout(_) => "timeout",
            StoreError::Network(_) => "network",
            StoreError::InvalidRequest(_) => "invalid_request",
            StoreError::Other(_) => "other",
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Batch-write boundary to a key-value store
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Write every record of a batch to `table`.
    ///
    /// The call succeeds only when the store accepted all records. Batches
    /// larger than [`MAX_ITEMS_PER_BATCH`] are rejected with
    /// [`StoreError::InvalidRequest`].
    async fn write_batch(&self, table: &str, records: &[Record]) -> StoreResult<()>;

    /// Short description of the store, used in logs
    fn describe(&self) -> String;
}

/// Reject batches the store would refuse anyway
pub fn check_batch_size(records: &[Record]) -> StoreResult<()> {
    if records.len() > MAX_ITEMS_PER_BATCH {
        return Err(StoreError::InvalidRequest(format!(
            "batch of {} items exceeds the limit of {}",
            records.len(),
            MAX_ITEMS_PER_BATCH
        )));
    }
    Ok(())
}

/// Store backends selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// DynamoDB-compatible HTTP endpoint
    #[default]
    DynamoDb,
    /// In-process memory store (dry runs and tests)
    Memory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::DynamoDb => write!(f, "dynamodb"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dynamodb" | "ddb" => Ok(StoreKind::DynamoDb),
            "memory" | "mem" => Ok(StoreKind::Memory),
            _ => Err(format!("Invalid store: {s}. Valid options: dynamodb, memory")),
        }
    }
}

/// Create a store for the selected backend
///
/// # Arguments
/// * `kind` - Backend to create
/// * `endpoint` - Base URL of the HTTP endpoint (ignored by the memory store)
/// * `region` - Region used when signing requests
/// * `max_workers` - Loader concurrency, used to size the connection pool
///
/// # Errors
/// Returns an error if the HTTP client cannot be built
pub fn create_store(
    kind: StoreKind,
    endpoint: &str,
    region: &str,
    max_workers: usize,
) -> StoreResult<Arc<dyn BatchStore>> {
    match kind {
        StoreKind::DynamoDb => Ok(Arc::new(dynamodb_http::DynamoDbHttpStore::new(
            endpoint,
            region,
            max_workers,
        )?)),
        StoreKind::Memory => Ok(Arc::new(memory::MemoryStore::new())),
    }
}
