//! Concurrency gate for cooperative dispatch
//!
//! Bounds the number of batch writes in flight. A permit is held for the
//! whole life of a write, including its retries and backoff sleeps. Once
//! the gate is closed, waiting and later acquires fail instead of blocking.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate admitting at most `capacity` holders at once
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    /// Create a gate with `capacity` permits
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Configured number of permits
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Stop admitting holders. Permits already held stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Wait for a permit. Dropping the permit releases it.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, GateError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| GateError::Closed(e.to_string()))
    }
}

/// Gate errors
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The gate was closed while waiting
    #[error("concurrency gate closed: {0}")]
    Closed(String),
}
