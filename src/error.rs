use std::io;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for perfmon
#[derive(Error, Debug)]
pub enum PerfmonError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("Metric '{0}' already has an active polling task")]
    DuplicateMetric(String),

    #[error("Monitor has been shut down")]
    ShutDown,

    #[error("Metric refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("{0}")]
    Other(String),
}

/// Failure reported by a metric source while refreshing itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    /// The shared cancel signal fired while the refresh was in flight.
    #[error("refresh cancelled")]
    Cancelled,

    #[error("source error: {0}")]
    Source(String),

    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),

    #[error("source panicked during refresh: {0}")]
    Panicked(String),
}

impl RefreshError {
    pub fn source<S: Into<String>>(msg: S) -> Self {
        RefreshError::Source(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RefreshError::Cancelled)
    }
}

/// Result type alias for perfmon
pub type Result<T> = std::result::Result<T, PerfmonError>;

impl PerfmonError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PerfmonError::Config(msg.into())
    }

    /// Create a duplicate registration error
    pub fn duplicate_metric<S: Into<String>>(id: S) -> Self {
        PerfmonError::DuplicateMetric(id.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PerfmonError::Other(msg.into())
    }
}
