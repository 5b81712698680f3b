//! Error triage for remote calls
//!
//! Classifiers decide whether a failed attempt is worth repeating. The
//! defaults here only treat rate limiting as transient; callers that know
//! more about their service (e.g. a local daemon that may still be booting)
//! supply their own.

use reqwest::StatusCode;

/// Outcome of classifying a raw error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient failure; another attempt may succeed
    Retryable,
    /// Persistent failure; retrying wastes budget
    Fatal,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        self == ErrorClass::Retryable
    }
}

/// Error codes AWS services use to signal throttling
pub const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "ThrottledException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
];

/// Classify an AWS-style error code. Only throttling codes are retryable.
pub fn classify_error_code(code: Option<&str>) -> ErrorClass {
    match code {
        Some(code) if THROTTLING_CODES.contains(&code) => ErrorClass::Retryable,
        _ => ErrorClass::Fatal,
    }
}

/// Classify an HTTP status. `429 Too Many Requests` is the only retryable status
/// by default.
pub fn classify_status(status: StatusCode) -> ErrorClass {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ErrorClass::Retryable
    } else {
        ErrorClass::Fatal
    }
}

/// Classify a transport-level reqwest failure. Timeouts and refused connections
/// are retryable; everything else (bad URL, body decode, redirect loop) is fatal.
pub fn classify_reqwest_error(err: &reqwest::Error) -> ErrorClass {
    if err.is_timeout() || err.is_connect() {
        return ErrorClass::Retryable;
    }
    match err.status() {
        Some(status) => classify_status(status),
        None => ErrorClass::Fatal,
    }
}

/// Classifier that disables retries entirely
pub fn fatal_always<E>(_: &E) -> ErrorClass {
    ErrorClass::Fatal
}
