//! Error taxonomy for the harness.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias used across the benchmark harness.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Every way a benchmark run can fail. None of these are retried.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The cluster could not be reached or the session could not be built.
    #[error("failed to connect to cluster: {0}")]
    Connection(String),
    /// The server rejected a statement during preparation.
    #[error("failed to prepare statement `{statement}`: {message}")]
    Prepare {
        /// CQL text that was being prepared.
        statement: String,
        /// Driver-reported reason.
        message: String,
    },
    /// A request failed on the wire (timeout, unavailable, ...).
    #[error("request failed: {0}")]
    Execution(String),
    /// A select returned values that differ from the expected record.
    #[error("bad data for pk {pk}: expected {expected:?}, got {actual:?}")]
    DataIntegrity {
        /// Key whose row failed verification.
        pk: i64,
        /// `(v1, v2)` the workload generator expects.
        expected: (i64, i64),
        /// `(v1, v2)` the store returned.
        actual: (i64, i64),
    },
    /// A select for a populated key returned no row.
    #[error("no row returned for pk {pk}")]
    MissingRow {
        /// Key that was expected to exist.
        pk: i64,
    },
    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for this tool.
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A worker task panicked or was torn down unexpectedly.
    #[error("worker terminated abnormally: {message}")]
    WorkerPanicked {
        /// Panic payload or join failure description.
        message: String,
    },
    /// The tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl BenchError {
    pub(crate) fn execution(err: impl std::fmt::Display) -> Self {
        BenchError::Execution(err.to_string())
    }

    pub(crate) fn prepare(statement: &str, err: impl std::fmt::Display) -> Self {
        BenchError::Prepare {
            statement: statement.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether the error came from a failed verification rather than from
    /// the transport or configuration.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            BenchError::DataIntegrity { .. } | BenchError::MissingRow { .. }
        )
    }
}

impl From<tokio::task::JoinError> for BenchError {
    fn from(err: tokio::task::JoinError) -> Self {
        let message = if err.is_panic() {
            let payload = err.into_panic();
            if let Some(msg) = payload.downcast_ref::<&str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "panic with non-string payload".to_string()
            }
        } else {
            err.to_string()
        };
        BenchError::WorkerPanicked { message }
    }
}
