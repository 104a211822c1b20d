//! Result of a timed run.

use std::io::{self, Write};
use std::time::Duration;

use serde::Serialize;

use crate::config::{BackendKind, BenchConfig};
use crate::pool::PoolSummary;
use crate::workload::Workload;

/// Measurement produced by a successful benchmark run.
#[derive(Clone, Debug, Serialize)]
pub struct BenchReport {
    /// Request target.
    pub backend: BackendKind,
    /// Statements issued per key.
    pub workload: Workload,
    /// Keys covered.
    pub tasks: i64,
    /// Workers in the timed pool.
    pub concurrency: usize,
    /// Keys per claim.
    pub batch_size: i64,
    /// Batches claimed during the timed phase.
    pub batches: u64,
    /// Workers that finished without claiming a batch.
    pub idle_workers: usize,
    /// Requests issued during the timed phase.
    pub requests: u64,
    /// Wall-clock time of the timed phase, in milliseconds.
    pub elapsed_ms: f64,
    /// Requests per second over the timed phase.
    pub throughput: f64,
    #[serde(skip)]
    elapsed: Duration,
}

impl BenchReport {
    /// Builds the report for a finished timed phase.
    pub fn new(config: &BenchConfig, summary: &PoolSummary, elapsed: Duration) -> Self {
        let requests = summary.keys() * config.workload.requests_per_key();
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            requests as f64 / secs
        } else {
            0.0
        };
        Self {
            backend: config.backend,
            workload: config.workload,
            tasks: config.tasks,
            concurrency: config.concurrency,
            batch_size: config.batch_size(),
            batches: summary.batches(),
            idle_workers: summary.idle_workers(),
            requests,
            elapsed_ms: secs * 1_000.0,
            throughput,
            elapsed,
        }
    }

    /// Elapsed time as a `Duration`.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Human-readable summary.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Finished")?;
        writeln!(out, "Benchmark time: {} ms", self.elapsed.as_millis())?;
        writeln!(
            out,
            "{} requests ({} x {} keys) in {} batches, {:.0} req/s",
            self.requests,
            self.workload,
            self.tasks,
            self.batches,
            self.throughput
        )
    }

    /// Single-line JSON rendering.
    pub fn write_json<W: Write>(&self, out: &mut W) -> io::Result<()> {
        serde_json::to_writer(&mut *out, self)?;
        writeln!(out)
    }
}
