//! Benchmark driver: schema setup, the untimed pre-population pass and the
//! timed phase.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::backend::Backend;
use crate::config::BenchConfig;
use crate::error::Result;
use crate::partition::Partitioner;
use crate::pool::{run_statement_pool, PoolSummary};
use crate::report::BenchReport;
use crate::schema;
use crate::workload::Workload;

/// Step of [`Benchmark::run_with_progress`] about to start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Dropping and recreating the schema.
    Schema,
    /// Untimed insert pass ahead of a selects run.
    Prepopulate,
    /// The measured phase.
    Timed,
}

/// A configured run against one backend.
pub struct Benchmark<B: Backend> {
    config: BenchConfig,
    backend: Arc<B>,
}

impl<B: Backend> Benchmark<B> {
    /// Binds a validated configuration to a backend.
    pub fn new(config: BenchConfig, backend: Arc<B>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    /// Settings this run uses.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Drops and recreates the benchmark table.
    async fn prepare_schema(&self) -> Result<()> {
        schema::prepare_keyspace(self.backend.as_ref()).await
    }

    /// Inserts every expected row with a pool of at least 1024 workers so a
    /// selects run has data to verify. Not timed.
    async fn prepopulate(&self) -> Result<PoolSummary> {
        let workers = self.config.prepopulation_workers();
        let partitioner = Arc::new(Partitioner::new(
            self.config.tasks,
            self.config.batch_size(),
        ));
        info!(
            tasks = self.config.tasks,
            workers,
            batch_size = partitioner.batch_size(),
            "bench.prepopulate.start"
        );
        let summary = run_statement_pool(
            Arc::clone(&self.backend),
            Workload::Inserts,
            workers,
            partitioner,
        )
        .await?;
        info!(keys = summary.keys(), "bench.prepopulate.complete");
        Ok(summary)
    }

    /// Runs the configured workload over `[0, tasks)` and measures it.
    ///
    /// The clock starts right before the workers are spawned and stops when
    /// the last one observes exhaustion. No report is produced if any worker
    /// fails.
    async fn run_timed(&self) -> Result<BenchReport> {
        let partitioner = Arc::new(Partitioner::new(
            self.config.tasks,
            self.config.batch_size(),
        ));
        info!(
            backend = self.backend.name(),
            workload = %self.config.workload,
            tasks = self.config.tasks,
            concurrency = self.config.concurrency,
            batch_size = partitioner.batch_size(),
            "bench.run.start"
        );
        let started = Instant::now();
        let summary = run_statement_pool(
            Arc::clone(&self.backend),
            self.config.workload,
            self.config.concurrency,
            partitioner,
        )
        .await?;
        let elapsed = started.elapsed();
        let report = BenchReport::new(&self.config, &summary, elapsed);
        info!(
            elapsed_ms = report.elapsed_ms,
            requests = report.requests,
            batches = report.batches,
            idle_workers = report.idle_workers,
            "bench.run.complete"
        );
        Ok(report)
    }

    /// Full run: schema setup and pre-population unless `skip_setup`, then
    /// the timed phase.
    pub async fn run(&self) -> Result<BenchReport> {
        self.run_with_progress(|_| {}).await
    }

    /// Same as [`run`](Self::run), calling `on_phase` as each phase starts.
    pub async fn run_with_progress<F>(&self, mut on_phase: F) -> Result<BenchReport>
    where
        F: FnMut(Phase),
    {
        if !self.config.skip_setup {
            on_phase(Phase::Schema);
            self.prepare_schema().await?;
        }
        if self.config.needs_prepopulation() {
            on_phase(Phase::Prepopulate);
            self.prepopulate().await?;
        }
        on_phase(Phase::Timed);
        self.run_timed().await
    }
}
