//! Error surface of the metrics engine.

use thiserror::Error;

/// Stable, machine-readable error codes (used in log fields and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    SchemaMismatch,
    InvalidDelta,
    InvalidObservation,
    InvalidBuckets,
    DuplicateMetric,
    InvalidName,
}

impl ErrorCode {
    /// String representation used in structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SchemaMismatch => "SCHEMA_MISMATCH",
            ErrorCode::InvalidDelta => "INVALID_DELTA",
            ErrorCode::InvalidObservation => "INVALID_OBSERVATION",
            ErrorCode::InvalidBuckets => "INVALID_BUCKETS",
            ErrorCode::DuplicateMetric => "DUPLICATE_METRIC",
            ErrorCode::InvalidName => "INVALID_NAME",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// All failures are local to the call that produced them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("label schema mismatch on {metric}: expected [{expected}], got [{got}]")]
    SchemaMismatch {
        metric: String,
        expected: String,
        got: String,
    },
    #[error("invalid counter delta: {0}")]
    InvalidDelta(String),
    #[error("invalid observation: {0}")]
    InvalidObservation(String),
    #[error("invalid buckets: {0}")]
    InvalidBuckets(String),
    #[error("metric already registered with a different definition: {0}")]
    DuplicateMetric(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
}

impl MetricsError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            MetricsError::InvalidDelta(_) => ErrorCode::InvalidDelta,
            MetricsError::InvalidObservation(_) => ErrorCode::InvalidObservation,
            MetricsError::InvalidBuckets(_) => ErrorCode::InvalidBuckets,
            MetricsError::DuplicateMetric(_) => ErrorCode::DuplicateMetric,
            MetricsError::InvalidName(_) => ErrorCode::InvalidName,
        }
    }
}
