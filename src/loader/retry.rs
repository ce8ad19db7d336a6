//! Retry with exponential backoff and jitter
//!
//! The delay before retry `n` (0-based) is
//! `min(base_delay * 2^n + jitter, max_delay)` with `jitter` drawn uniformly
//! from `[0, 1)` seconds. An operation is attempted at most
//! `max_retries + 1` times; the last failure is returned unchanged.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use super::config::LoaderConfig;

/// Largest exponent used for the backoff; larger attempts saturate.
const MAX_BACKOFF_EXPONENT: u32 = 1023;

/// Result of a retried operation together with the number of attempts made.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final result: the first success or the last failure
    pub result: Result<T, E>,
    /// Number of times the operation was invoked (at least 1)
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    /// Retries consumed, i.e. attempts after the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Retry executor with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryHandler {
    max_retries: u32,
    base_delay: f64,
    max_delay: f64,
}

impl Default for RetryHandler {
    fn default() -> Self {
        Self::new(3, 0.1, 10.0)
    }
}

impl RetryHandler {
    /// Create a handler
    ///
    /// # Arguments
    /// * `max_retries` - Retries after the first attempt
    /// * `base_delay` - Base delay in seconds
    /// * `max_delay` - Cap on a single delay in seconds
    pub fn new(max_retries: u32, base_delay: f64, max_delay: f64) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Build a handler from a validated configuration
    pub fn from_config(config: &LoaderConfig) -> Self {
        let max_retries = u32::try_from(config.max_retries.max(0)).unwrap_or(u32::MAX);
        Self::new(max_retries, config.base_delay, config.max_delay)
    }

    /// Retries after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts, `max_retries + 1`
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the retry following failed attempt `attempt` (0-based), with random jitter
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.delay_with_jitter(attempt, rand::random::<f64>())
    }

    /// Delay for `attempt` with an explicit jitter value in seconds
    pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = attempt.min(MAX_BACKOFF_EXPONENT) as i32;
        let exponential = self.base_delay * 2f64.powi(exponent);
        let secs = (exponential + jitter).min(self.max_delay).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Run a blocking operation, sleeping the current thread between attempts
    pub fn retry_blocking<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        self.run_blocking(op, |_, _| true).result
    }

    /// Run an async operation, suspending the task between attempts
    pub async fn retry_async<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_async(op, |_, _| true).await.result
    }

    /// Blocking retry loop with a caller-supplied retry predicate.
    ///
    /// `should_retry` receives each failure and its 0-based attempt number;
    /// returning `false` stops immediately. The retry budget is enforced
    /// regardless of the predicate.
    pub fn run_blocking<T, E, F, P>(&self, mut op: F, mut should_retry: P) -> RetryOutcome<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
        P: FnMut(&E, u32) -> bool,
    {
        let mut attempt = 0u32;
        loop {
            match op() {
                Ok(value) => return self.outcome(Ok(value), attempt),
                Err(e) => match self.next_delay(&e, attempt, &mut should_retry) {
                    Some(delay) => {
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                    None => return self.outcome(Err(e), attempt),
                },
            }
        }
    }

    /// Async retry loop with a caller-supplied retry predicate.
    ///
    /// Same contract as [`RetryHandler::run_blocking`].
    pub async fn run_async<T, E, F, Fut, P>(
        &self,
        mut op: F,
        mut should_retry: P,
    ) -> RetryOutcome<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E, u32) -> bool,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return self.outcome(Ok(value), attempt),
                Err(e) => match self.next_delay(&e, attempt, &mut should_retry) {
                    Some(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return self.outcome(Err(e), attempt),
                },
            }
        }
    }

    fn next_delay<E, P>(&self, err: &E, attempt: u32, should_retry: &mut P) -> Option<Duration>
    where
        E: Display,
        P: FnMut(&E, u32) -> bool,
    {
        if !should_retry(err, attempt) {
            return None;
        }

        if attempt >= self.max_retries {
            error!(
                attempts = self.max_attempts(),
                "All {} attempts failed. Last error: {}",
                self.max_attempts(),
                err
            );
            return None;
        }

        let delay = self.calculate_delay(attempt);
        warn!(
            attempt = attempt + 1,
            max_attempts = self.max_attempts(),
            delay_secs = delay.as_secs_f64(),
            "Attempt {}/{} failed: {}. Retrying in {:.2}s...",
            attempt + 1,
            self.max_attempts(),
            err,
            delay.as_secs_f64()
        );
        Some(delay)
    }

    fn outcome<T, E>(&self, result: Result<T, E>, attempt: u32) -> RetryOutcome<T, E> {
        RetryOutcome {
            result,
            attempts: attempt + 1,
        }
    }
}
