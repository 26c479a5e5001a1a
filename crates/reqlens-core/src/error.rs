//! Shared error type across reqlens crates.

use thiserror::Error;

/// Stable error codes (used in log fields and asserted by tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Metric family registered twice in one registry.
    DuplicateMetric,
    /// Metric name fails the exposition-format grammar.
    InvalidMetricName,
    /// Label name fails the grammar, is reserved, or is declared twice.
    InvalidLabelName,
    /// Observation label names don't match the registered schema.
    LabelMismatch,
    /// Invalid static configuration (buckets, quantiles, windows, yaml).
    InvalidConfig,
    /// Unsupported config file version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateMetric => "DUPLICATE_METRIC",
            ErrorCode::InvalidMetricName => "INVALID_METRIC_NAME",
            ErrorCode::InvalidLabelName => "INVALID_LABEL_NAME",
            ErrorCode::LabelMismatch => "LABEL_MISMATCH",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ReqLensError>;

/// Unified error type used by core and the http adapter.
#[derive(Debug, Error)]
pub enum ReqLensError {
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("invalid metric name: {0}")]
    InvalidMetricName(String),
    #[error("invalid label name: {0}")]
    InvalidLabelName(String),
    #[error("label mismatch on {metric}: {detail}")]
    LabelMismatch { metric: String, detail: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl ReqLensError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ReqLensError::DuplicateMetric(_) => ErrorCode::DuplicateMetric,
            ReqLensError::InvalidMetricName(_) => ErrorCode::InvalidMetricName,
            ReqLensError::InvalidLabelName(_) => ErrorCode::InvalidLabelName,
            ReqLensError::LabelMismatch { .. } => ErrorCode::LabelMismatch,
            ReqLensError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            ReqLensError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            ReqLensError::Internal(_) => ErrorCode::Internal,
        }
    }
}
