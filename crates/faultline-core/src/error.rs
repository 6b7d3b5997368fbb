//! Shared error type across faultline crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed config.
    BadRequest,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Metric registry misuse (unknown name, wrong kind, wrong labels).
    Metrics,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Metrics => "METRICS",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FaultlineError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum FaultlineError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("metric {name} is a {actual}, not a {expected}")]
    MetricKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("label mismatch for {name}: expected {expected:?}, got {got:?}")]
    LabelMismatch {
        name: String,
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("internal: {0}")]
    Internal(String),
}

impl FaultlineError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            FaultlineError::BadRequest(_) => ClientCode::BadRequest,
            FaultlineError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            FaultlineError::DuplicateMetric(_)
            | FaultlineError::UnknownMetric(_)
            | FaultlineError::MetricKind { .. }
            | FaultlineError::LabelMismatch { .. } => ClientCode::Metrics,
            FaultlineError::Internal(_) => ClientCode::Internal,
        }
    }
}
