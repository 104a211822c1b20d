//! Fixed-size worker pools draining a shared [`Partitioner`].
//!
//! [`run_partitioned`] is the single pool primitive: it spawns `workers`
//! tasks, lets each one build its own [`KeyWorker`] (so per-worker setup such
//! as statement preparation happens once), then feeds every claimed key to
//! that worker until the partitioner is exhausted.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::backend::{Backend, INSERT_STMT, SELECT_STMT};
use crate::error::Result;
use crate::partition::Partitioner;
use crate::workload::{self, Record, Workload};

/// Per-key work executed by one pool member.
pub trait KeyWorker: Send + 'static {
    /// Handles a single primary key. Any error aborts the whole pool.
    fn process(&mut self, pk: i64) -> impl Future<Output = Result<()>> + Send;
}

/// What one worker did before it observed exhaustion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Index of the worker within its pool.
    pub worker: usize,
    /// Batches claimed.
    pub batches: u64,
    /// Keys processed.
    pub keys: u64,
}

/// Outcome of a pool that ran to exhaustion.
#[derive(Clone, Debug, Default)]
pub struct PoolSummary {
    /// Per-worker statistics, ordered by worker index.
    pub workers: Vec<WorkerStats>,
}

impl PoolSummary {
    /// Batches claimed across the pool.
    pub fn batches(&self) -> u64 {
        self.workers.iter().map(|w| w.batches).sum()
    }

    /// Keys processed across the pool.
    pub fn keys(&self) -> u64 {
        self.workers.iter().map(|w| w.keys).sum()
    }

    /// Workers that never claimed a batch.
    pub fn idle_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.batches == 0).count()
    }
}

/// Runs `workers` concurrent loops over one partitioner.
///
/// `spawn_worker(index)` builds the future that initialises worker `index`.
/// The call returns once every worker has seen exhaustion. On the first
/// failure (error or panic) the remaining workers are aborted and that
/// failure is returned.
pub async fn run_partitioned<W, F, Fut>(
    workers: usize,
    partitioner: Arc<Partitioner>,
    spawn_worker: F,
) -> Result<PoolSummary>
where
    W: KeyWorker,
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<W>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for index in 0..workers {
        let init = spawn_worker(index);
        let partitioner = Arc::clone(&partitioner);
        set.spawn(async move {
            let worker = init.await?;
            drain(index, worker, &partitioner).await
        });
    }

    let mut stats = Vec::with_capacity(workers);
    while let Some(joined) = set.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(join_err) => Err(join_err.into()),
        };
        match outcome {
            Ok(worker_stats) => stats.push(worker_stats),
            Err(err) => {
                error!(error = %err, finished = stats.len(), workers, "pool.worker.failed");
                set.abort_all();
                return Err(err);
            }
        }
    }
    stats.sort_by_key(|s| s.worker);
    Ok(PoolSummary { workers: stats })
}

async fn drain<W: KeyWorker>(
    index: usize,
    mut worker: W,
    partitioner: &Partitioner,
) -> Result<WorkerStats> {
    let mut stats = WorkerStats {
        worker: index,
        ..WorkerStats::default()
    };
    while let Some(batch) = partitioner.claim() {
        stats.batches += 1;
        for pk in batch {
            worker.process(pk).await?;
            stats.keys += 1;
        }
    }
    debug!(
        worker = index,
        batches = stats.batches,
        keys = stats.keys,
        "pool.worker.exhausted"
    );
    Ok(stats)
}

/// Worker that issues the workload's statements for every key.
///
/// Statements are prepared in [`StatementWorker::prepare`] and reused for
/// the worker's whole lifetime.
pub struct StatementWorker<B: Backend> {
    backend: Arc<B>,
    insert: Option<B::Statement>,
    select: Option<B::Statement>,
}

impl<B: Backend> StatementWorker<B> {
    /// Prepares the statements `workload` needs.
    pub async fn prepare(backend: Arc<B>, workload: Workload) -> Result<Self> {
        let insert = if workload.inserts() {
            Some(backend.prepare(INSERT_STMT).await?)
        } else {
            None
        };
        let select = if workload.selects() {
            Some(backend.prepare(SELECT_STMT).await?)
        } else {
            None
        };
        Ok(Self {
            backend,
            insert,
            select,
        })
    }
}

impl<B: Backend> KeyWorker for StatementWorker<B> {
    fn process(&mut self, pk: i64) -> impl Future<Output = Result<()>> + Send {
        async move {
            // Insert goes first so a mixed select observes this pass's write.
            if let Some(insert) = &self.insert {
                self.backend.insert(insert, Record::for_key(pk)).await?;
            }
            if let Some(select) = &self.select {
                let observed = self.backend.select(select, pk).await?;
                workload::verify(pk, observed)?;
            }
            Ok(())
        }
    }
}

/// Runs the workload's statements over `partitioner` with `workers` tasks.
pub async fn run_statement_pool<B: Backend>(
    backend: Arc<B>,
    workload: Workload,
    workers: usize,
    partitioner: Arc<Partitioner>,
) -> Result<PoolSummary> {
    run_partitioned(workers, partitioner, move |_| {
        StatementWorker::prepare(Arc::clone(&backend), workload)
    })
    .await
}
