//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{BenchError, Result};

/// Installs the global `tracing` subscriber.
///
/// `level` is an `EnvFilter` directive (`info`, `cqlbench=debug,scylla=warn`,
/// ...). When it is `None`, `RUST_LOG` is consulted, then `info`. Events go
/// to stderr so the report on stdout stays parseable.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| BenchError::Logging(format!("invalid log level: {e}")))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| BenchError::Logging("logging already initialized".into()))
}
