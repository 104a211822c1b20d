#![allow(missing_docs)]

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cqlbench::backend::{Backend, MemoryBackend};
use cqlbench::config::{BackendKind, BenchConfig};
use cqlbench::workload::Record;
use cqlbench::{BenchError, Benchmark, Result, Workload};

fn config(workload: Workload, tasks: i64, concurrency: usize) -> BenchConfig {
    BenchConfig {
        workload,
        tasks,
        concurrency,
        backend: BackendKind::Memory,
        ..BenchConfig::default()
    }
}

/// Wraps the in-memory store and fails or corrupts on chosen keys.
struct FaultyBackend {
    inner: MemoryBackend,
    corrupt_pk: Option<i64>,
    fail_insert_pk: Option<i64>,
    selects: AtomicU64,
}

impl FaultyBackend {
    fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            corrupt_pk: None,
            fail_insert_pk: None,
            selects: AtomicU64::new(0),
        }
    }
}

impl Backend for FaultyBackend {
    type Statement = <MemoryBackend as Backend>::Statement;

    fn name(&self) -> &'static str {
        "faulty"
    }

    fn prepare(&self, cql: &str) -> impl Future<Output = Result<Self::Statement>> + Send {
        self.inner.prepare(cql)
    }

    fn insert(
        &self,
        statement: &Self::Statement,
        record: Record,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            if Some(record.pk) == self.fail_insert_pk {
                return Err(BenchError::Execution("write timeout".into()));
            }
            self.inner.insert(statement, record).await
        }
    }

    fn select(
        &self,
        statement: &Self::Statement,
        pk: i64,
    ) -> impl Future<Output = Result<Option<(i64, i64)>>> + Send {
        async move {
            self.selects.fetch_add(1, Ordering::Relaxed);
            let row = self.inner.select(statement, pk).await?;
            if Some(pk) == self.corrupt_pk {
                return Ok(row.map(|(v1, v2)| (v1 + 1, v2)));
            }
            Ok(row)
        }
    }

    fn execute_ddl(&self, cql: &str) -> impl Future<Output = Result<()>> + Send {
        self.inner.execute_ddl(cql)
    }

    fn await_schema_agreement(&self) -> impl Future<Output = Result<()>> + Send {
        self.inner.await_schema_agreement()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn insert_run_leaves_expected_rows() {
    let backend = Arc::new(MemoryBackend::new());
    let bench = Benchmark::new(config(Workload::Inserts, 5_000, 64), Arc::clone(&backend))
        .expect("bench");
    let report = bench.run().await.expect("run");

    assert_eq!(report.workload, Workload::Inserts);
    assert_eq!(report.requests, 5_000);
    assert_eq!(backend.len(), 5_000);
    for pk in 0..5_000 {
        assert_eq!(backend.get(pk), Some((2 * pk, 3 * pk)), "pk {pk}");
        assert_eq!(backend.write_count(pk), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rerunning_setup_gives_same_data_set() {
    let backend = Arc::new(MemoryBackend::new());
    let bench = Benchmark::new(config(Workload::Inserts, 300, 8), Arc::clone(&backend))
        .expect("bench");
    bench.run().await.expect("first run");
    backend.put(1_000, 1, 1).expect("stray row");
    bench.run().await.expect("second run");

    let fresh = Arc::new(MemoryBackend::new());
    Benchmark::new(config(Workload::Inserts, 300, 8), Arc::clone(&fresh))
        .expect("bench")
        .run()
        .await
        .expect("fresh run");

    assert_eq!(backend.len(), fresh.len());
    assert_eq!(backend.get(1_000), None);
    for pk in 0..300 {
        assert_eq!(backend.get(pk), fresh.get(pk));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_run_inserts_then_selects_each_key() {
    let backend = Arc::new(MemoryBackend::new());
    let bench = Benchmark::new(config(Workload::Mixed, 100, 8), Arc::clone(&backend))
        .expect("bench");
    let report = bench.run().await.expect("run");

    assert_eq!(report.requests, 200);
    assert_eq!(backend.inserts_executed(), 100);
    assert_eq!(backend.selects_executed(), 100);
    for pk in 0..100 {
        assert_eq!(backend.write_count(pk), 1);
    }
}

#[tokio::test]
async fn zero_tasks_completes_immediately() {
    let backend = Arc::new(MemoryBackend::new());
    let bench =
        Benchmark::new(config(Workload::Mixed, 0, 16), Arc::clone(&backend)).expect("bench");
    let report = bench.run().await.expect("run");
    assert_eq!(report.batches, 0);
    assert_eq!(report.requests, 0);
    assert_eq!(report.idle_workers, 16);
    assert!(report.elapsed() < Duration::from_secs(1));
    assert!(backend.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn small_run_leaves_most_workers_idle() {
    let backend = Arc::new(MemoryBackend::new());
    let bench = Benchmark::new(config(Workload::Inserts, 3, 8), Arc::clone(&backend))
        .expect("bench");
    assert_eq!(bench.config().batch_size(), 1);
    let report = bench.run().await.expect("run");
    assert_eq!(report.batches, 3);
    assert_eq!(report.idle_workers, 5);
    assert_eq!(backend.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn workers_prepare_statements_once() {
    let backend = Arc::new(MemoryBackend::with_schema());
    let mut cfg = config(Workload::Mixed, 10_000, 4);
    cfg.skip_setup = true;
    let bench = Benchmark::new(cfg, Arc::clone(&backend)).expect("bench");
    bench.run().await.expect("run");
    // one insert and one select statement per worker
    assert_eq!(backend.statements_prepared(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn corrupted_row_fails_the_run() {
    let mut faulty = FaultyBackend::new(MemoryBackend::new());
    faulty.corrupt_pk = Some(77);
    let backend = Arc::new(faulty);
    let bench = Benchmark::new(config(Workload::Selects, 200, 4), backend).expect("bench");
    let err = bench.run().await.unwrap_err();
    match err {
        BenchError::DataIntegrity {
            pk,
            expected,
            actual,
        } => {
            assert_eq!(pk, 77);
            assert_eq!(expected, (154, 231));
            assert_eq!(actual, (155, 231));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn injected_corruption_stops_a_selects_run() {
    let backend = Arc::new(MemoryBackend::with_schema());
    for pk in 0..50 {
        backend.put(pk, 2 * pk, 3 * pk).unwrap();
    }
    backend.put(13, 0, 39).unwrap();
    let mut cfg = config(Workload::Selects, 50, 4);
    cfg.skip_setup = true;
    let err = Benchmark::new(cfg, backend)
        .expect("bench")
        .run()
        .await
        .unwrap_err();
    assert!(err.is_integrity_violation());
    assert!(matches!(err, BenchError::DataIntegrity { pk: 13, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_insert_aborts_remaining_workers() {
    let mut faulty =
        FaultyBackend::new(MemoryBackend::new().with_latency(Duration::from_millis(1)));
    faulty.fail_insert_pk = Some(5);
    let backend = Arc::new(faulty);
    let bench =
        Benchmark::new(config(Workload::Mixed, 100_000, 8), Arc::clone(&backend)).expect("bench");
    let err = bench.run().await.unwrap_err();
    assert!(matches!(err, BenchError::Execution(_)));
    // The pool stopped long before draining the key space.
    assert!(backend.selects.load(Ordering::Relaxed) < 100_000);
}

#[tokio::test]
async fn missing_table_fails_at_prepare() {
    let backend = Arc::new(MemoryBackend::new());
    let mut cfg = config(Workload::Inserts, 10, 2);
    cfg.skip_setup = true;
    let err = Benchmark::new(cfg, backend)
        .expect("bench")
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, BenchError::Prepare { .. }));
}
