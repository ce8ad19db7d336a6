//! Unit tests for the retry handler

use std::cell::Cell;
use std::time::Duration;

use bulk_csv_loader::loader::RetryHandler;
use bulk_csv_loader::LoaderConfig;

#[test]
fn delay_doubles_then_caps() {
    let handler = RetryHandler::new(5, 0.5, 3.0);
    assert_eq!(handler.delay_with_jitter(0, 0.0), Duration::from_millis(500));
    assert_eq!(handler.delay_with_jitter(1, 0.0), Duration::from_secs(1));
    assert_eq!(handler.delay_with_jitter(2, 0.0), Duration::from_secs(2));
    assert_eq!(handler.delay_with_jitter(3, 0.0), Duration::from_secs(3));
    assert_eq!(handler.delay_with_jitter(60, 0.0), Duration::from_secs(3));
    assert_eq!(handler.delay_with_jitter(u32::MAX, 0.9), Duration::from_secs(3));
}

#[test]
fn random_delay_stays_in_bounds() {
    let handler = RetryHandler::new(3, 0.1, 10.0);
    for _ in 0..100 {
        let delay = handler.calculate_delay(2).as_secs_f64();
        assert!(delay >= 0.4 - 1e-9);
        assert!(delay < 1.4 + 1e-9);
    }
}

#[test]
fn from_config_copies_limits() {
    let config = LoaderConfig::new("T")
        .with_max_retries(6)
        .with_delays(0.25, 4.0);
    let handler = RetryHandler::from_config(&config);
    assert_eq!(handler.max_retries(), 6);
    assert_eq!(handler.max_attempts(), 7);
    assert_eq!(handler, RetryHandler::new(6, 0.25, 4.0));
}

#[test]
fn blocking_retry_stops_at_first_success() {
    let handler = RetryHandler::new(3, 0.0, 0.0);
    let calls = Cell::new(0);

    let outcome = handler.run_blocking(
        || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("busy")
            } else {
                Ok(calls.get())
            }
        },
        |_, _| true,
    );

    assert_eq!(outcome.result, Ok(3));
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.retries(), 2);
}

#[test]
fn blocking_retry_returns_last_error() {
    let handler = RetryHandler::new(2, 0.0, 0.0);
    let calls = Cell::new(0);

    let result: Result<(), String> = handler.retry_blocking(|| {
        calls.set(calls.get() + 1);
        Err(format!("failure {}", calls.get()))
    });

    assert_eq!(result, Err("failure 3".to_string()));
    assert_eq!(calls.get(), 3);
}

#[test]
fn predicate_can_stop_early() {
    let handler = RetryHandler::new(5, 0.0, 0.0);
    let calls = Cell::new(0);

    let outcome: bulk_csv_loader::loader::retry::RetryOutcome<(), &str> = handler.run_blocking(
        || {
            calls.set(calls.get() + 1);
            Err("fatal")
        },
        |_, attempt| attempt < 1,
    );

    assert!(outcome.result.is_err());
    assert_eq!(outcome.attempts, 2);
    assert_eq!(calls.get(), 2);
}

#[tokio::test]
async fn async_retry_counts_attempts() {
    let handler = RetryHandler::new(4, 0.0, 0.0);
    let calls = std::sync::atomic::AtomicU32::new(0);

    let outcome = handler
        .run_async(
            || {
                let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                async move {
                    if n < 2 {
                        Err("timeout")
                    } else {
                        Ok(n)
                    }
                }
            },
            |_, _| true,
        )
        .await;

    assert_eq!(outcome.result, Ok(2));
    assert_eq!(outcome.retries(), 1);
}

#[tokio::test]
async fn zero_retries_means_one_attempt() {
    let handler = RetryHandler::new(0, 0.0, 0.0);
    let calls = std::sync::atomic::AtomicU32::new(0);

    let result: Result<(), &str> = handler
        .retry_async(|| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err("down") }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}
