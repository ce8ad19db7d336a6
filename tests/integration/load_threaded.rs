//! Integration tests for loads on the thread pool

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
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_load_writes_every_row() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "orders.csv", 77);
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded).with_max_workers(4),
        store.clone(),
    )
    .unwrap();
    let result = loader.load(&csv).await.unwrap();

    assert_eq!(result.total_records, 77);
    assert_eq!(result.successful_writes, 77);
    assert_eq!(result.failed_writes, 0);
    assert_eq!(result.batches, 4);
    assert_eq!(result.strategy, Strategy::Threaded);
    assert!(result.is_complete());
    assert_eq!(store.len("Orders"), 77);
    assert_eq!(store.call_count(), 4);
}

/// Test that a header-only file loads nothing and calls no store
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_header_only_file() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "empty.csv", 0);
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(fast_config(Strategy::Threaded), store.clone()).unwrap();
    let result = loader.load(&csv).await.unwrap();

    assert_eq!(result.total_records, 0);
    assert_eq!(result.batches, 0);
    assert_eq!(result.success_rate(), 0.0);
    assert!(result.errors.is_empty());
    assert_eq!(store.call_count(), 0);
}

/// Test that a missing source file is a load error, not a partial result
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(fast_config(Strategy::Threaded), store.clone()).unwrap();
    let result = loader.load(dir.path().join("missing.csv")).await;

    assert!(result.is_err());
    assert_eq!(store.call_count(), 0);
}

/// Test that failed batches do not affect the other batches
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_failed_batches_are_isolated() {
    let store = Arc::new(FailNthBatches::new(
        vec![1, 4],
        StoreError::service("ValidationException", "One or more parameter values were invalid"),
    ));

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded)
            .with_batch_size(20)
            .with_max_workers(3),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(200)).await.unwrap();

    assert_eq!(result.successful_writes, 160);
    assert_eq!(result.failed_writes, 40);
    assert_eq!(result.batches, 10);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.contains("failed permanently")));
    // Permanent errors are not retried
    assert_eq!(store.call_count(), 10);
    assert_eq!(result.retries, 0);
    assert_eq!(store.inner.len("Orders"), 160);
}

/// Test that permanent errors are retried when classification is off
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_retry_all_errors() {
    let store = Arc::new(FailNthBatches::new(
        vec![0],
        StoreError::service("ValidationException", "bad item"),
    ));

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded)
            .with_batch_size(10)
            .with_max_workers(1)
            .with_max_retries(2)
            .with_classify_errors(false),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(30)).await.unwrap();

    assert_eq!(result.successful_writes, 20);
    assert_eq!(result.failed_writes, 10);
    assert_eq!(result.retries, 2);
    assert!(result.errors[0].contains("failed after 3 attempts"));
    assert_eq!(store.call_count(), 5);
}

/// Test that throttled batches succeed after retrying
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_throttling_is_retried() {
    let store = Arc::new(FlakyStore::new(
        2,
        StoreError::service("ProvisionedThroughputExceededException", "slow down"),
    ));

    let loader = BulkLoader::new(fast_config(Strategy::Threaded), store.clone()).unwrap();
    let result = loader.load_records(sorted_records(100)).await.unwrap();

    assert_eq!(result.successful_writes, 100);
    assert_eq!(result.batches, 4);
    assert_eq!(result.retries, 8);
    assert!(result.is_complete());
    assert_eq!(store.inner.len("Orders"), 100);
}

/// Test that the retry budget bounds attempts per batch
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_retry_budget_exhausted() {
    let store = Arc::new(FlakyStore::new(
        10,
        StoreError::Timeout("operation timed out".to_string()),
    ));

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded)
            .with_batch_size(25)
            .with_max_retries(1),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(50)).await.unwrap();

    assert_eq!(result.successful_writes, 0);
    assert_eq!(result.failed_writes, 50);
    assert_eq!(result.retries, 2);
    assert!(result
        .errors
        .iter()
        .all(|e| e.contains("failed after 2 attempts")));
}

/// Test that a panicking write only fails its own batch
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_panic_is_isolated() {
    let store = Arc::new(PanickingStore::new("00042"));

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded)
            .with_batch_size(10)
            .with_max_workers(2),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(100)).await.unwrap();

    assert_eq!(result.total_records, 100);
    assert_eq!(result.successful_writes, 90);
    assert_eq!(result.failed_writes, 10);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("unexpected error"));
    assert!(result.errors[0].contains("poisoned record"));
}

/// Test that records are shuffled before they are batched
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_shuffles_before_batching() {
    let store = Arc::new(MemoryStore::new());
    let records = sorted_records(100);
    let sorted_ids: Vec<String> = records
        .iter()
        .map(|r| r.get("id").unwrap().to_string())
        .collect();

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded)
            .with_batch_size(10)
            .with_max_workers(1)
            .with_shuffle_seed(7),
        store.clone(),
    )
    .unwrap();
    loader.load_records(records).await.unwrap();

    let written_ids: Vec<String> = store
        .written("Orders")
        .iter()
        .map(|r| r.get("id").unwrap().to_string())
        .collect();
    assert_eq!(written_ids.len(), 100);
    assert_ne!(written_ids, sorted_ids);

    let mut resorted = written_ids.clone();
    resorted.sort();
    assert_eq!(resorted, sorted_ids);
}

/// Test that every record is written exactly once under contention
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_no_duplicates() {
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded).with_max_workers(8),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(1000)).await.unwrap();

    assert_eq!(result.successful_writes, 1000);
    assert_eq!(result.batches, 40);

    let ids: HashSet<String> = store
        .written("Orders")
        .iter()
        .map(|r| r.get("id").unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 1000);
}

/// Test that no more than max_workers writes run at once
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_concurrency_bound() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(20)));

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded)
            .with_batch_size(5)
            .with_max_workers(3),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(100)).await.unwrap();

    assert_eq!(result.successful_writes, 100);
    assert!(store.peak() >= 1);
    assert!(store.peak() <= 3, "peak concurrency was {}", store.peak());
}

/// Test that a single worker writes one batch at a time
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_single_worker_is_sequential() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(5)));

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded)
            .with_batch_size(10)
            .with_max_workers(1),
        store.clone(),
    )
    .unwrap();
    let result = loader.load_records(sorted_records(50)).await.unwrap();

    assert_eq!(result.successful_writes, 50);
    assert_eq!(store.peak(), 1);
}

/// Test that a sorted file is reordered when no shuffle seed is set
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_unseeded_load_reorders_file() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "sorted.csv", 200);
    let store = Arc::new(MemoryStore::new());

    let loader = BulkLoader::new(
        fast_config(Strategy::Threaded)
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
