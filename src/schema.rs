//! Drops and recreates the benchmark keyspace.

use tracing::info;

use crate::backend::{Backend, KEYSPACE, TABLE};
use crate::error::Result;

/// Statements run by [`prepare_keyspace`], in order.
pub const SCHEMA_STATEMENTS: [&str; 3] = [
    "DROP KEYSPACE IF EXISTS benchks",
    "CREATE KEYSPACE IF NOT EXISTS benchks WITH REPLICATION = {'class' : 'SimpleStrategy', 'replication_factor' : 1}",
    "CREATE TABLE IF NOT EXISTS benchks.benchtab (pk bigint PRIMARY KEY, v1 bigint, v2 bigint)",
];

/// Starts from an empty `benchks.benchtab`, waiting for schema agreement
/// after every statement so workers never prepare against a stale schema.
pub async fn prepare_keyspace<B: Backend>(backend: &B) -> Result<()> {
    info!(keyspace = KEYSPACE, table = TABLE, "schema.prepare.begin");
    for statement in SCHEMA_STATEMENTS {
        backend.execute_ddl(statement).await?;
        backend.await_schema_agreement().await?;
    }
    info!(keyspace = KEYSPACE, table = TABLE, "schema.prepare.complete");
    Ok(())
}
