//! In-process store standing in for a cluster.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use super::{Backend, INSERT_STMT, KEYSPACE, SELECT_STMT, TABLE};
use crate::error::{BenchError, Result};
use crate::workload::Record;

/// Statements the in-memory store understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryStatement {
    /// Prepared from [`INSERT_STMT`].
    Insert,
    /// Prepared from [`SELECT_STMT`].
    Select,
}

#[derive(Clone, Copy, Debug)]
struct StoredRow {
    v1: i64,
    v2: i64,
    writes: u32,
}

#[derive(Default)]
struct State {
    keyspace: bool,
    table: Option<HashMap<i64, StoredRow>>,
}

/// Single-table store that mimics the cluster closely enough to exercise the
/// harness: statements must be prepared, the table must exist, and every
/// request can carry an artificial round-trip delay.
pub struct MemoryBackend {
    state: RwLock<State>,
    latency: Option<Duration>,
    inserts: AtomicU64,
    selects: AtomicU64,
    prepares: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Empty store with no keyspace.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            latency: None,
            inserts: AtomicU64::new(0),
            selects: AtomicU64::new(0),
            prepares: AtomicU64::new(0),
        }
    }

    /// Store whose `benchks.benchtab` table already exists and is empty.
    pub fn with_schema() -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.write();
            state.keyspace = true;
            state.table = Some(HashMap::new());
        }
        backend
    }

    /// Adds a fixed delay to every request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Writes a row directly, bypassing statements and counters.
    pub fn put(&self, pk: i64, v1: i64, v2: i64) -> Result<()> {
        let mut state = self.state.write();
        let table = table_mut(&mut state)?;
        table.insert(pk, StoredRow { v1, v2, writes: 0 });
        Ok(())
    }

    /// Reads a row directly.
    pub fn get(&self, pk: i64) -> Option<(i64, i64)> {
        let state = self.state.read();
        state
            .table
            .as_ref()
            .and_then(|table| table.get(&pk))
            .map(|row| (row.v1, row.v2))
    }

    /// Times `pk` was written through an insert statement.
    pub fn write_count(&self, pk: i64) -> u32 {
        let state = self.state.read();
        state
            .table
            .as_ref()
            .and_then(|table| table.get(&pk))
            .map_or(0, |row| row.writes)
    }

    /// Rows currently stored.
    pub fn len(&self) -> usize {
        self.state.read().table.as_ref().map_or(0, HashMap::len)
    }

    /// Whether the table is missing or holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `benchks.benchtab` currently exists.
    pub fn has_table(&self) -> bool {
        self.state.read().table.is_some()
    }

    /// Insert statements executed so far.
    pub fn inserts_executed(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Select statements executed so far.
    pub fn selects_executed(&self) -> u64 {
        self.selects.load(Ordering::Relaxed)
    }

    /// Statements prepared so far.
    pub fn statements_prepared(&self) -> u64 {
        self.prepares.load(Ordering::Relaxed)
    }

    async fn round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn apply_ddl(&self, cql: &str) -> Result<()> {
        let normalized = cql.split_whitespace().collect::<Vec<_>>().join(" ");
        let upper = normalized.to_ascii_uppercase();
        let mut state = self.state.write();
        if upper.starts_with("DROP KEYSPACE") {
            if upper.contains(&KEYSPACE.to_ascii_uppercase()) {
                state.keyspace = false;
                state.table = None;
            }
            Ok(())
        } else if upper.starts_with("CREATE KEYSPACE") {
            state.keyspace = true;
            Ok(())
        } else if upper.starts_with("CREATE TABLE") && upper.contains(&TABLE.to_ascii_uppercase()) {
            if !state.keyspace {
                return Err(BenchError::execution(format!(
                    "keyspace {KEYSPACE} does not exist"
                )));
            }
            state.table.get_or_insert_with(HashMap::new);
            Ok(())
        } else {
            Err(BenchError::execution(format!(
                "unsupported statement: {normalized}"
            )))
        }
    }
}

fn table_mut(state: &mut State) -> Result<&mut HashMap<i64, StoredRow>> {
    state
        .table
        .as_mut()
        .ok_or_else(|| BenchError::execution(format!("unconfigured table {TABLE}")))
}

impl Backend for MemoryBackend {
    type Statement = MemoryStatement;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn prepare(&self, cql: &str) -> impl Future<Output = Result<Self::Statement>> + Send {
        async move {
            self.round_trip().await;
            let statement = match cql {
                INSERT_STMT => MemoryStatement::Insert,
                SELECT_STMT => MemoryStatement::Select,
                other => return Err(BenchError::prepare(other, "unsupported statement")),
            };
            if !self.has_table() {
                return Err(BenchError::prepare(cql, format!("unconfigured table {TABLE}")));
            }
            self.prepares.fetch_add(1, Ordering::Relaxed);
            Ok(statement)
        }
    }

    fn insert(
        &self,
        statement: &Self::Statement,
        record: Record,
    ) -> impl Future<Output = Result<()>> + Send {
        let statement = *statement;
        async move {
            if statement != MemoryStatement::Insert {
                return Err(BenchError::execution("select statement bound as insert"));
            }
            self.round_trip().await;
            let mut state = self.state.write();
            let table = table_mut(&mut state)?;
            let row = table.entry(record.pk).or_insert(StoredRow {
                v1: record.v1,
                v2: record.v2,
                writes: 0,
            });
            row.v1 = record.v1;
            row.v2 = record.v2;
            row.writes += 1;
            self.inserts.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn select(
        &self,
        statement: &Self::Statement,
        pk: i64,
    ) -> impl Future<Output = Result<Option<(i64, i64)>>> + Send {
        let statement = *statement;
        async move {
            if statement != MemoryStatement::Select {
                return Err(BenchError::execution("insert statement bound as select"));
            }
            self.round_trip().await;
            let state = self.state.read();
            let table = state
                .table
                .as_ref()
                .ok_or_else(|| BenchError::execution(format!("unconfigured table {TABLE}")))?;
            self.selects.fetch_add(1, Ordering::Relaxed);
            Ok(table.get(&pk).map(|row| (row.v1, row.v2)))
        }
    }

    fn execute_ddl(&self, cql: &str) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.round_trip().await;
            debug!(statement = cql, "backend.memory.ddl");
            self.apply_ddl(cql)
        }
    }

    fn await_schema_agreement(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.round_trip().await;
            Ok(())
        }
    }
}
