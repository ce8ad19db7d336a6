//! Record sources
//!
//! Reads source files into [`Record`](crate::Record)s and generates synthetic
//! source files for load testing.

pub mod csv;
pub mod generate;

pub use self::csv::read_source;
pub use self::generate::CsvGenerator;

/// Source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV parse error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// A data row does not supply every header field
    #[error("malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        /// 1-based line number in the file
        line: u64,
        /// Number of header fields
        expected: u64,
        /// Number of fields in the row
        found: u64,
    },

    /// Synthetic data could not be generated
    #[error("generation error: {0}")]
    GenerateError(String),
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;
