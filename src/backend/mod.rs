//! Database client seam.
//!
//! The harness only needs four things from a cluster: preparing a
//! statement, writing a [`Record`], reading one back, and running schema
//! DDL. [`ScyllaBackend`] talks to a real cluster through the `scylla`
//! driver; [`MemoryBackend`] keeps rows in process for smoke runs and tests.

use std::future::Future;

use crate::error::Result;
use crate::workload::Record;

pub mod cluster;
pub mod memory;

pub use self::cluster::{ConnectOptions, ScyllaBackend};
pub use self::memory::MemoryBackend;

/// Keyspace the benchmark owns.
pub const KEYSPACE: &str = "benchks";
/// Table the benchmark owns, qualified with its keyspace.
pub const TABLE: &str = "benchks.benchtab";

/// Parametrized insert bound to `(pk, v1, v2)`.
pub const INSERT_STMT: &str = "INSERT INTO benchks.benchtab (pk, v1, v2) VALUES(?, ?, ?)";
/// Parametrized select bound to `pk`, returning `(v1, v2)`.
pub const SELECT_STMT: &str = "SELECT v1, v2 FROM benchks.benchtab WHERE pk = ?";

/// Client operations the worker pool and schema setup rely on.
///
/// Implementations must be shareable across workers; every method takes
/// `&self` and returns a `Send` future so calls can run on any runtime
/// thread.
pub trait Backend: Send + Sync + 'static {
    /// Prepared statement handle. Workers prepare once and reuse it for
    /// every key they claim.
    type Statement: Send + Sync + 'static;

    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Prepares `cql` on the server.
    fn prepare(&self, cql: &str) -> impl Future<Output = Result<Self::Statement>> + Send;

    /// Writes `record` through a statement prepared from [`INSERT_STMT`].
    fn insert(
        &self,
        statement: &Self::Statement,
        record: Record,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Reads `(v1, v2)` for `pk` through a statement prepared from
    /// [`SELECT_STMT`]. `Ok(None)` means the row does not exist.
    fn select(
        &self,
        statement: &Self::Statement,
        pk: i64,
    ) -> impl Future<Output = Result<Option<(i64, i64)>>> + Send;

    /// Runs an unprepared schema statement.
    fn execute_ddl(&self, cql: &str) -> impl Future<Output = Result<()>> + Send;

    /// Waits until every node reports the same schema version.
    fn await_schema_agreement(&self) -> impl Future<Output = Result<()>> + Send;
}
