//! Thread pool dispatcher
//!
//! A fixed pool of named OS threads pulls batches from a shared queue. Each
//! worker drives the store future on the runtime handle and sleeps its own
//! thread during backoff, so a slow batch only ever occupies one worker.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::vec::IntoIter;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::executor::BatchWriter;
use super::result::LoadTally;
use super::LoadError;
use crate::Batch;

/// Write `batches` on a pool of `max_workers` threads and fold their results.
///
/// The pool runs on a blocking thread so the async caller is never stalled.
///
/// # Errors
/// Returns [`LoadError::DispatchError`] if the pool itself could not be joined
pub async fn dispatch(
    writer: Arc<BatchWriter>,
    batches: Vec<Batch>,
    max_workers: usize,
) -> Result<LoadTally, LoadError> {
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || run_pool(&writer, &handle, batches, max_workers))
        .await
        .map_err(|e| LoadError::DispatchError(format!("worker pool failed: {e}")))
}

fn run_pool(
    writer: &BatchWriter,
    handle: &Handle,
    batches: Vec<Batch>,
    max_workers: usize,
) -> LoadTally {
    let workers = max_workers.clamp(1, batches.len().max(1));
    let queue = Mutex::new(batches.into_iter());
    let tally = Mutex::new(LoadTally::default());

    std::thread::scope(|scope| {
        for index in 0..workers {
            let spawned = std::thread::Builder::new()
                .name(format!("loader-worker-{index}"))
                .spawn_scoped(scope, || worker_loop(writer, handle, &queue, &tally));

            if let Err(e) = spawned {
                warn!(worker = index, error = %e, "Failed to spawn worker thread");
                break;
            }
        }
    });

    // Anything left means no worker could be spawned; drain on this thread.
    worker_loop(writer, handle, &queue, &tally);

    tally.into_inner().unwrap_or_else(PoisonError::into_inner)
}

fn worker_loop(
    writer: &BatchWriter,
    handle: &Handle,
    queue: &Mutex<IntoIter<Batch>>,
    tally: &Mutex<LoadTally>,
) {
    loop {
        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
        let Some(batch) = next else {
            break;
        };

        debug!(batch_id = batch.id, items = batch.len(), "Worker picked up batch");

        let result = match catch_unwind(AssertUnwindSafe(|| writer.write_blocking(handle, &batch))) {
            Ok(result) => result,
            Err(payload) => writer.panicked(&batch, &*payload),
        };

        tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(result);
    }
}
