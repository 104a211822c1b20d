//! ScyllaDB driver backend.

use std::future::Future;
use std::time::Duration;

use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::prepared::PreparedStatement;
use tracing::{debug, info};

use super::Backend;
use crate::error::{BenchError, Result};
use crate::workload::Record;

/// Session settings for [`ScyllaBackend::connect`].
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Contact points as `host:port`.
    pub nodes: Vec<String>,
    /// Per-request timeout enforced by the driver.
    pub request_timeout: Duration,
    /// Timeout for establishing each connection.
    pub connect_timeout: Duration,
}

impl ConnectOptions {
    /// Options for `nodes` with the default timeouts.
    pub fn new(nodes: Vec<String>) -> Self {
        Self {
            nodes,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Cluster access through the ScyllaDB driver.
///
/// Load balancing is the driver's default token-aware policy, so each
/// request is routed to a replica owning its partition key.
pub struct ScyllaBackend {
    session: Session,
}

impl ScyllaBackend {
    /// Opens a session against the cluster.
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        if options.nodes.is_empty() {
            return Err(BenchError::Connection("no contact points given".into()));
        }
        info!(
            nodes = ?options.nodes,
            request_timeout_ms = options.request_timeout.as_millis() as u64,
            "backend.scylla.connect"
        );
        let profile = ExecutionProfile::builder()
            .request_timeout(Some(options.request_timeout))
            .build();
        let session = SessionBuilder::new()
            .known_nodes(&options.nodes)
            .connection_timeout(options.connect_timeout)
            .default_execution_profile_handle(profile.into_handle())
            .build()
            .await
            .map_err(|err| BenchError::Connection(err.to_string()))?;
        Ok(Self { session })
    }
}

impl Backend for ScyllaBackend {
    type Statement = PreparedStatement;

    fn name(&self) -> &'static str {
        "scylla"
    }

    fn prepare(&self, cql: &str) -> impl Future<Output = Result<Self::Statement>> + Send {
        async move {
            self.session
                .prepare(cql)
                .await
                .map_err(|err| BenchError::prepare(cql, err))
        }
    }

    fn insert(
        &self,
        statement: &Self::Statement,
        record: Record,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.session
                .execute_unpaged(statement, (record.pk, record.v1, record.v2))
                .await
                .map_err(BenchError::execution)?;
            Ok(())
        }
    }

    fn select(
        &self,
        statement: &Self::Statement,
        pk: i64,
    ) -> impl Future<Output = Result<Option<(i64, i64)>>> + Send {
        async move {
            let result = self
                .session
                .execute_unpaged(statement, (pk,))
                .await
                .map_err(BenchError::execution)?;
            let rows = result.into_rows_result().map_err(BenchError::execution)?;
            let row = rows
                .maybe_first_row::<(i64, i64)>()
                .map_err(BenchError::execution)?;
            Ok(row)
        }
    }

    fn execute_ddl(&self, cql: &str) -> impl Future<Output = Result<()>> + Send {
        async move {
            debug!(statement = cql, "backend.scylla.ddl");
            self.session
                .query_unpaged(cql, ())
                .await
                .map_err(BenchError::execution)?;
            Ok(())
        }
    }

    fn await_schema_agreement(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.session
                .await_schema_agreement()
                .await
                .map_err(BenchError::execution)?;
            Ok(())
        }
    }
}
