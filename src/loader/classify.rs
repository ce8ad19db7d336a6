//! Error classification for batch writes.
//!
//! Store failures fall into four categories. Permanent failures will fail
//! again no matter how often they are retried, throttling and transient
//! failures usually clear after a backoff, and anything else is treated as
//! unknown. [`handle_error`] turns a failure and the attempt count into an
//! [`ErrorAction`].

use tracing::{debug, error, warn};

use crate::store::StoreError;

/// Service error codes that never succeed on retry.
pub const PERMANENT_ERROR_CODES: &[&str] = &[
    "ValidationException",
    "ResourceNotFoundException",
    "AccessDeniedException",
    "UnrecognizedClientException",
    "InvalidParameterException",
    "InvalidParameterValueException",
    "InvalidParameterCombination",
    "MissingParameter",
    "ItemCollectionSizeLimitExceededException",
    "ConditionalCheckFailedException",
];

/// Service error codes signalling the caller is going too fast.
pub const THROTTLING_ERROR_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

/// Service error codes for temporary service-side trouble.
pub const TRANSIENT_ERROR_CODES: &[&str] = &[
    "ServiceUnavailable",
    "InternalServerError",
    "InternalFailure",
    "ServiceException",
    "RequestTimeout",
];

/// Category of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input, missing table or missing permissions
    Permanent,
    /// Provisioned throughput or request rate exceeded
    Throttling,
    /// Service hiccup, timeout or network failure
    Transient,
    /// Anything not recognized above
    Unclassified,
}

impl ErrorCategory {
    /// Short label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Throttling => "throttling",
            Self::Transient => "transient",
            Self::Unclassified => "unclassified",
        }
    }

    /// Suggested remediation shown next to failures.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Permanent => "Check the table name, item attributes and credentials",
            Self::Throttling => "Reduce --workers or raise the table's write capacity",
            Self::Transient => "Check that the store endpoint is reachable and try again",
            Self::Unclassified => "Inspect the error message and store logs",
        }
    }
}

/// What the caller should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Sleep for the backoff delay, then try again
    RetryWithBackoff,
    /// Stop now, retrying cannot help
    FailImmediately,
    /// Stop, the retry budget is spent
    FailAfterRetries,
}

/// Classify a store failure.
pub fn classify(err: &StoreError) -> ErrorCategory {
    match err {
        StoreError::Service { code, .. } => classify_code(code),
        StoreError::InvalidRequest(_) => ErrorCategory::Permanent,
        StoreError::Unprocessed { .. } => ErrorCategory::Throttling,
        StoreError::Connection(_) | StoreError::Timeout(_) | StoreError::Network(_) => {
            ErrorCategory::Transient
        }
        StoreError::Other(_) => ErrorCategory::Unclassified,
    }
}

/// Classify a bare service error code.
pub fn classify_code(code: &str) -> ErrorCategory {
    if PERMANENT_ERROR_CODES.contains(&code) {
        ErrorCategory::Permanent
    } else if THROTTLING_ERROR_CODES.contains(&code) {
        ErrorCategory::Throttling
    } else if TRANSIENT_ERROR_CODES.contains(&code) {
        ErrorCategory::Transient
    } else {
        ErrorCategory::Unclassified
    }
}

/// Whether retrying `err` can never succeed.
pub fn is_permanent_error(err: &StoreError) -> bool {
    classify(err) == ErrorCategory::Permanent
}

/// Whether `err` means the store is throttling requests.
pub fn is_throttling_error(err: &StoreError) -> bool {
    classify(err) == ErrorCategory::Throttling
}

/// Whether `err` is a temporary failure worth retrying.
pub fn is_transient_error(err: &StoreError) -> bool {
    classify(err) == ErrorCategory::Transient
}

/// Decide what to do after a failed attempt.
///
/// `attempt` is 0-based. The checks run in order: permanent errors fail
/// immediately, then an exhausted retry budget fails, then throttling and
/// transient errors retry. Unknown errors fail immediately.
///
/// Terminal dispositions log at debug level. The writer reports the failed
/// batch once through [`log_error_details`].
pub fn handle_error(err: &StoreError, attempt: u32, max_retries: u32) -> ErrorAction {
    let category = classify(err);

    if category == ErrorCategory::Permanent {
        debug!(category = category.as_str(), error = %err, "Permanent error detected");
        return ErrorAction::FailImmediately;
    }

    if attempt >= max_retries {
        debug!(
            category = category.as_str(),
            max_retries,
            error = %err,
            "Max retries reached"
        );
        return ErrorAction::FailAfterRetries;
    }

    match category {
        ErrorCategory::Throttling | ErrorCategory::Transient => {
            warn!(
                category = category.as_str(),
                attempt = attempt + 1,
                error = %err,
                "Retryable error detected"
            );
            ErrorAction::RetryWithBackoff
        }
        _ => {
            debug!(
                category = category.as_str(),
                error = %err,
                "Unknown error type, failing immediately"
            );
            ErrorAction::FailImmediately
        }
    }
}

/// Where a failure happened, attached to diagnostic logs.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Batch being written
    pub batch_id: Option<usize>,
    /// Operation name (e.g. `write_batch`)
    pub operation: String,
    /// Target table
    pub table: String,
}

impl ErrorContext {
    /// Context for a batch write
    pub fn batch_write(batch_id: usize, table: impl Into<String>) -> Self {
        Self {
            batch_id: Some(batch_id),
            operation: "write_batch".to_string(),
            table: table.into(),
        }
    }
}

/// Log a failure with everything needed to troubleshoot it.
pub fn log_error_details(err: &StoreError, context: &ErrorContext) {
    let category = classify(err);
    error!(
        batch_id = ?context.batch_id,
        operation = %context.operation,
        table = %context.table,
        error_type = err.kind(),
        category = category.as_str(),
        error_code = err.code().unwrap_or("Unknown"),
        request_id = err.request_id().unwrap_or(""),
        error_message = %err,
        suggestion = category.suggestion(),
        "Error details"
    );
}
