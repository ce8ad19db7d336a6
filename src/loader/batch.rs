//! Shuffling and batch partitioning

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::num::NonZeroUsize;

use crate::{Batch, Record};

/// Shuffle records in place so consecutive keys land in different batches.
///
/// With a seed the permutation is reproducible; without one it is drawn
/// from the thread-local generator.
pub fn shuffle_records(records: &mut [Record], seed: Option<u64>) {
    match seed {
        Some(seed) => records.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => records.shuffle(&mut rand::rng()),
    }
}

/// Split records into consecutive batches of `batch_size`.
///
/// Produces exactly `ceil(N / batch_size)` batches with ids `0..`; every
/// batch but the last holds `batch_size` records and input order is kept.
pub fn partition(records: Vec<Record>, batch_size: NonZeroUsize) -> Vec<Batch> {
    let size = batch_size.get();
    let mut batches = Vec::with_capacity(records.len().div_ceil(size));
    let mut records = records.into_iter().peekable();

    while records.peek().is_some() {
        let chunk: Vec<Record> = records.by_ref().take(size).collect();
        batches.push(Batch::new(batches.len(), chunk));
    }

    batches
}
