//! CLI error types and conversions

use crate::loader::{ConfigError, LoadError};
use crate::metrics::MetricsError;
use crate::source::SourceError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Load error
    #[error("load error: {0}")]
    LoadError(#[from] LoadError),

    /// Store setup error
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Source error
    #[error("source error: {0}")]
    SourceError(#[from] SourceError),

    /// Metrics setup error
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
