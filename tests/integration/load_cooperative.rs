//! Integration tests for loads on the cooperative scheduler

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bulk_csv_loader::store::memory::MemoryStore;
use bulk_csv_loader::store::StoreError;
use bulk_csv_loader::{BulkLoader, Strategy};
use tempfile::TempDir;

use crate::support::{
    fast_config, sorted_records, write_csv, FailNthBatches, FlakyStore, PanickingStore, SlowStore,
};

/// Test that a CSV file is split into batches and fully written
#[tokio::test]
async fn test_async_load_writes_every_row() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "orders.csv", 77);
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(fast_config(Strategy::Async), store.clone()).unwrap();
    let result = loader.load(&csv).await.unwrap();

    assert_eq!(result.total_records, 77);
    assert_eq!(result.successful_writes, 77);
    assert_eq!(result.batches, 4);
    assert_eq!(result.strategy, Strategy::Async);
    assert_eq!(store.len("Orders"), 77);
}

/// Test the default worker count of the async strategy
#[tokio::test]
async fn test_async_default_workers() {
    let store = Arc::new(MemoryStore::new());
    let loader = BulkLoader::new(fast_config(Strategy::Async), store).unwrap();
    assert_eq!(loader.max_workers(), 10);
}

/// Test that a header-only file loads nothing
#[tokio::test]
async fn test_async_header_only_file() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "empty.csv", 0);
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(fast_config(Strategy::Async), store.clone()).unwrap();
    let result = loader.load(&csv).await.unwrap();

    assert_eq!(result.total_records, 0);
    assert_eq!(result.successful_writes, 0);
    assert_eq!(result.failed_writes, 0);
    assert!(result.is_complete());
    assert_eq!(store.call_count(), 0);
}

/// Test that failed batches do not affect the other batches
#[tokio::test]
async fn test_async_failed_batches_are_isolated() {
    let store = Arc::new(FailNthBatches::new(
        vec![1, 4],
        StoreError::service("ValidationException", "One or more parameter values were invalid"),
    ));

    let loader = BulkLoader::new(
        fast_config(Strategy::Async)
            .with_batch_size(20)
            .with_max_workers(3),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(200)).await.unwrap();

    assert_eq!(result.successful_writes, 160);
    assert_eq!(result.failed_writes, 40);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.contains("ValidationException")));
    assert_eq!(store.call_count(), 10);
    assert!(!result.is_complete());
}

/// Test that unprocessed items are retried as throttling
#[tokio::test]
async fn test_async_unprocessed_items_are_retried() {
    let store = Arc::new(FlakyStore::new(
        1,
        StoreError::Unprocessed {
            unprocessed: 3,
            total: 25,
        },
    ));

    let loader = BulkLoader::new(fast_config(Strategy::Async), store.clone()).unwrap();
    let result = loader.load_records(sorted_records(100)).await.unwrap();

    assert_eq!(result.successful_writes, 100);
    assert_eq!(result.retries, 4);
    assert_eq!(store.inner.len("Orders"), 100);
}

/// Test that an unclassified error fails without retrying
#[tokio::test]
async fn test_async_unknown_error_fails_immediately() {
    let store = Arc::new(FlakyStore::new(
        1,
        StoreError::Other("something odd".to_string()),
    ));

    let loader = BulkLoader::new(fast_config(Strategy::Async), store.clone()).unwrap();
    let result = loader.load_records(sorted_records(25)).await.unwrap();

    assert_eq!(result.failed_writes, 25);
    assert_eq!(result.retries, 0);
    assert!(result.errors[0].contains("failed after 1 attempts"));
}

/// Test that a panicking write only fails its own batch
#[tokio::test]
async fn test_async_panic_is_isolated() {
    let store = Arc::new(PanickingStore::new("00042"));

    let loader = BulkLoader::new(
        fast_config(Strategy::Async)
            .with_batch_size(10)
            .with_max_workers(4),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(100)).await.unwrap();

    assert_eq!(result.successful_writes, 90);
    assert_eq!(result.failed_writes, 10);
    assert_eq!(result.batches, 10);
    assert!(result.errors[0].contains("unexpected error"));
}

/// Test that the same seed gives the same write order
#[tokio::test]
async fn test_async_seeded_shuffle_is_reproducible() {
    async fn written_order(seed: u64) -> Vec<String> {
        let store = Arc::new(MemoryStore::new());
        let loader = BulkLoader::new(
            fast_config(Strategy::Async)
                .with_batch_size(10)
                .with_max_workers(1)
                .with_shuffle_seed(seed),
            store.clone(),
        )
        .unwrap();
        loader.load_records(sorted_records(100)).await.unwrap();
        store
            .written("Orders")
            .iter()
            .map(|r| r.get("id").unwrap().to_string())
            .collect()
    }

    let first = written_order(11).await;
    let second = written_order(11).await;
    let sorted: Vec<String> = (0..100).map(|i| format!("{i:05}")).collect();

    assert_eq!(first, second);
    assert_ne!(first, sorted);
}

/// Test that every record is written exactly once
#[tokio::test]
async fn test_async_no_duplicates() {
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(
        fast_config(Strategy::Async).with_max_workers(8),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(1000)).await.unwrap();

    assert_eq!(result.successful_writes, 1000);

    let ids: HashSet<String> = store
        .written("Orders")
        .iter()
        .map(|r| r.get("id").unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 1000);
}

/// Test that the gate holds concurrency at max_workers
#[tokio::test]
async fn test_async_concurrency_bound() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(10)));

    let loader = BulkLoader::new(
        fast_config(Strategy::Async)
            .with_batch_size(5)
            .with_max_workers(3),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(100)).await.unwrap();

    assert_eq!(result.successful_writes, 100);
    assert_eq!(store.peak(), 3);
}

/// Test that a sorted file is reordered when no shuffle seed is set
#[tokio::test]
async fn test_async_unseeded_load_reorders_file() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "sorted.csv", 200);
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(
        fast_config(Strategy::Async)
            .with_batch_size(10)
            .with_max_workers(1),
        store.clone(),
    )
    .unwrap();
    assert_eq!(loader.config().shuffle_seed, None);
    loader.load(&csv).await.unwrap();

    let file_order: Vec<String> = (0..200).map(|i| format!("{i:05}")).collect();
    let written: Vec<String> = store
        .written("Orders")
        .iter()
        .map(|r| r.get("id").unwrap().to_string())
        .collect();
    assert_eq!(written.len(), 200);
    assert_ne!(written, file_order);

    let mut resorted = written;
    resorted.sort();
    assert_eq!(resorted, file_order);
}
