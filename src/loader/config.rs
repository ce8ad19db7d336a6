//! Loader configuration, defaults and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Hard per-call item ceiling of the store's batch write.
pub const MAX_BATCH_SIZE: i64 = 25;

/// Default number of records per batch.
pub const DEFAULT_BATCH_SIZE: i64 = 25;

/// Default number of retries after the first attempt (4 attempts in total).
pub const DEFAULT_MAX_RETRIES: i64 = 3;

/// Default base delay for exponential backoff, in seconds.
pub const DEFAULT_BASE_DELAY_SECS: f64 = 0.1;

/// Default cap on a single backoff delay, in seconds.
pub const DEFAULT_MAX_DELAY_SECS: f64 = 10.0;

/// Default region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default concurrency for the cooperative strategy.
/// There is no CPU-bound work to balance, so the width is a fixed constant.
pub const DEFAULT_ASYNC_WORKERS: i64 = 10;

/// Thread pool width used when the core count cannot be detected.
pub const FALLBACK_THREAD_WORKERS: i64 = 10;

/// Extra HTTP connections kept on top of the worker count.
pub const CONNECTION_POOL_HEADROOM: usize = 5;

/// Regions accepted by [`LoaderConfig::validate`].
pub const VALID_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
    "sa-east-1",
    "ca-central-1",
];

/// Default thread pool width: one worker per available core.
pub fn default_thread_workers() -> i64 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i64)
        .unwrap_or(FALLBACK_THREAD_WORKERS)
}

/// Scheduling strategy used to dispatch batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Fixed pool of OS worker threads, blocking writes
    #[default]
    #[serde(rename = "threaded")]
    Threaded,
    /// Cooperative tasks on one scheduler, gated by a semaphore
    #[serde(rename = "async")]
    Async,
}

impl Strategy {
    /// Concurrency width used when none is configured
    pub fn default_workers(&self) -> i64 {
        match self {
            Strategy::Threaded => default_thread_workers(),
            Strategy::Async => DEFAULT_ASYNC_WORKERS,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::Threaded => "threaded",
            Strategy::Async => "async",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "threaded" | "threads" => Ok(Strategy::Threaded),
            "async" | "cooperative" => Ok(Strategy::Async),
            _ => Err(format!(
                "Invalid strategy: {s}. Valid options: threaded, async"
            )),
        }
    }
}

/// Configuration errors. Each names the offending field and value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Empty or whitespace table name
    #[error("table_name must be a non-empty string")]
    EmptyTableName,

    /// Zero or negative batch size
    #[error("batch_size must be greater than 0, got {0}")]
    InvalidBatchSize(i64),

    /// Batch size above the store limit
    #[error("batch_size must be <= {MAX_BATCH_SIZE}, got {0}")]
    BatchSizeTooLarge(i64),

    /// Zero or negative worker count
    #[error("max_workers must be greater than 0, got {0}")]
    InvalidMaxWorkers(i64),

    /// Negative retry count
    #[error("max_retries must be >= 0, got {0}")]
    InvalidMaxRetries(i64),

    /// Region not in the allow-list
    #[error("region must be a valid AWS region, got {0}")]
    InvalidRegion(String),

    /// Negative or non-finite base delay
    #[error("base_delay must be a finite number >= 0, got {0}")]
    InvalidBaseDelay(f64),

    /// Max delay below base delay or not finite
    #[error("max_delay must be finite and >= base_delay, got max_delay={max_delay}, base_delay={base_delay}")]
    InvalidMaxDelay {
        /// Configured max delay
        max_delay: f64,
        /// Configured base delay
        base_delay: f64,
    },

    /// Config file could not be read or parsed
    #[error("failed to read config file: {0}")]
    FileError(String),
}

impl ConfigError {
    /// Name of the configuration field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::EmptyTableName => "table_name",
            ConfigError::InvalidBatchSize(_) | ConfigError::BatchSizeTooLarge(_) => "batch_size",
            ConfigError::InvalidMaxWorkers(_) => "max_workers",
            ConfigError::InvalidMaxRetries(_) => "max_retries",
            ConfigError::InvalidRegion(_) => "region",
            ConfigError::InvalidBaseDelay(_) => "base_delay",
            ConfigError::InvalidMaxDelay { .. } => "max_delay",
            ConfigError::FileError(_) => "file",
        }
    }
}

/// Loader configuration.
///
/// Numeric fields are signed so out-of-range values read from flags or
/// config files reach [`LoaderConfig::validate`] instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Target table name
    pub table_name: String,
    /// Region of the target table
    pub region: String,
    /// Concurrency width; `None` uses the strategy default
    pub max_workers: Option<i64>,
    /// Records per batch write
    pub batch_size: i64,
    /// Retries after the first attempt
    pub max_retries: i64,
    /// Base backoff delay in seconds
    pub base_delay: f64,
    /// Cap on a single backoff delay in seconds
    pub max_delay: f64,
    /// Scheduling strategy
    pub strategy: Strategy,
    /// Consult the error classifier before retrying; permanent errors fail fast
    pub classify_errors: bool,
    /// Seed for the record shuffle; random when unset
    pub shuffle_seed: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            region: DEFAULT_REGION.to_string(),
            max_workers: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY_SECS,
            max_delay: DEFAULT_MAX_DELAY_SECS,
            strategy: Strategy::default(),
            classify_errors: true,
            shuffle_seed: None,
        }
    }
}

impl LoaderConfig {
    /// Create a configuration for a table with all other fields defaulted
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("{}: {e}", path.display())))
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the concurrency width
    pub fn with_max_workers(mut self, max_workers: i64) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the retry limit
    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base and max backoff delays, in seconds
    pub fn with_delays(mut self, base_delay: f64, max_delay: f64) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Set the scheduling strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable or disable classifier-driven retry short-circuiting
    pub fn with_classify_errors(mut self, classify_errors: bool) -> Self {
        self.classify_errors = classify_errors;
        self
    }

    /// Fix the shuffle seed for reproducible write order
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Worker count after applying the strategy default
    pub fn effective_max_workers(&self) -> i64 {
        self.max_workers
            .unwrap_or_else(|| self.strategy.default_workers())
    }

    /// Validate every field, reporting the first violation.
    ///
    /// Rules are checked in a fixed order: table name, batch size, worker
    /// count, retries, region, base delay, max delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::EmptyTableName);
        }

        if self.batch_size <= 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::BatchSizeTooLarge(self.batch_size));
        }

        let max_workers = self.effective_max_workers();
        if max_workers <= 0 {
            return Err(ConfigError::InvalidMaxWorkers(max_workers));
        }

        if self.max_retries < 0 {
            return Err(ConfigError::InvalidMaxRetries(self.max_retries));
        }

        if !VALID_REGIONS.contains(&self.region.as_str()) {
            return Err(ConfigError::InvalidRegion(self.region.clone()));
        }

        // NaN and infinity are rejected along with negative values
        if !self.base_delay.is_finite() || self.base_delay < 0.0 {
            return Err(ConfigError::InvalidBaseDelay(self.base_delay));
        }

        if !self.max_delay.is_finite() || self.max_delay < self.base_delay {
            return Err(ConfigError::InvalidMaxDelay {
                max_delay: self.max_delay,
                base_delay: self.base_delay,
            });
        }

        Ok(())
    }
}
