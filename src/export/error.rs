use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("log group discovery failed: {0}")]
    Discovery(String),
    #[error("log query failed for {log_group}: {message}")]
    SourceQuery { log_group: String, message: String },
    #[error("invalid event timestamp {0}")]
    InvalidTimestamp(i64),
    #[error("failed to read existing export at {key}: {message}")]
    DestinationRead { key: String, message: String },
    #[error("failed to write export to {key}: {message}")]
    DestinationWrite { key: String, message: String },
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
    #[error("run deadline exceeded before this target started")]
    DeadlineExceeded,
}

impl ExportError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Stable code recorded in failure entries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Discovery(_) => "DISCOVERY_ERROR",
            Self::SourceQuery { .. } => "SOURCE_QUERY_ERROR",
            Self::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            Self::DestinationRead { .. } => "DESTINATION_READ_ERROR",
            Self::DestinationWrite { .. } => "DESTINATION_WRITE_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }
}

/// Await a service call, failing with `Timeout` once `limit` elapses.
pub(crate) async fn bounded<F, T>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, ExportError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ExportError::Timeout {
            operation,
            secs: limit.as_secs(),
        })
}
