//! Cooperative dispatcher
//!
//! Every batch becomes a future polled from the calling task. A
//! [`ConcurrencyGate`] admits at most `max_workers` writes at a time; the
//! rest wait for a permit. Results are folded as futures complete, so the
//! tally needs no lock. A batch whose gate closes before it is admitted is
//! counted as failed without being attempted.

use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::debug;

use super::executor::BatchWriter;
use super::gate::ConcurrencyGate;
use super::result::{BatchResult, LoadTally};
use crate::metrics::record_gate_wait;
use crate::Batch;

/// Write `batches` with at most `max_workers` in flight and fold their results
pub async fn dispatch(writer: &BatchWriter, batches: Vec<Batch>, max_workers: usize) -> LoadTally {
    drain(writer, batches, ConcurrencyGate::new(max_workers.max(1))).await
}

async fn drain(writer: &BatchWriter, batches: Vec<Batch>, gate: ConcurrencyGate) -> LoadTally {
    let mut in_flight: FuturesUnordered<_> = batches
        .into_iter()
        .map(|batch| write_gated(writer, gate.clone(), batch))
        .collect();

    let mut tally = LoadTally::default();
    while let Some(result) = in_flight.next().await {
        tally.record(result);
    }
    tally
}

async fn write_gated(writer: &BatchWriter, gate: ConcurrencyGate, batch: Batch) -> BatchResult {
    let waiting = Instant::now();
    let _permit = match gate.acquire().await {
        Ok(permit) => permit,
        Err(e) => return writer.failed(&batch, format!("Batch {} not attempted: {e}", batch.id)),
    };
    record_gate_wait(waiting.elapsed());

    debug!(batch_id = batch.id, items = batch.len(), "Batch admitted");

    match AssertUnwindSafe(writer.write_async(&batch)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => writer.panicked(&batch, &*payload),
    }
}
