#![allow(missing_docs)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use cqlbench::partition::{derive_batch_size, Partitioner};
use cqlbench::pool::{run_partitioned, KeyWorker};
use cqlbench::{BenchError, Result};
use parking_lot::Mutex;

/// Records which worker handled which key.
struct Recorder {
    index: usize,
    log: Arc<Mutex<HashMap<i64, usize>>>,
}

impl KeyWorker for Recorder {
    fn process(&mut self, pk: i64) -> impl Future<Output = Result<()>> + Send {
        let previous = self.log.lock().insert(pk, self.index);
        async move {
            match previous {
                None => Ok(()),
                Some(other) => Err(BenchError::Execution(format!(
                    "pk {pk} handed out twice (first to worker {other})"
                ))),
            }
        }
    }
}

async fn record_pool(
    tasks: i64,
    batch_size: i64,
    workers: usize,
) -> (cqlbench::pool::PoolSummary, HashMap<i64, usize>) {
    let log = Arc::new(Mutex::new(HashMap::new()));
    let partitioner = Arc::new(Partitioner::new(tasks, batch_size));
    let summary = run_partitioned(workers, partitioner, |index| {
        let log = Arc::clone(&log);
        async move { Ok::<_, BenchError>(Recorder { index, log }) }
    })
    .await
    .expect("pool run");
    let log = log.lock().clone();
    (summary, log)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_key_is_processed_exactly_once() {
    let cases = [(10_000, 256, 64), (9_999, 7, 33), (1, 1, 4), (257, 256, 2)];
    for (tasks, batch_size, workers) in cases {
        let (summary, log) = record_pool(tasks, batch_size, workers).await;
        assert_eq!(log.len() as i64, tasks, "tasks={tasks} batch={batch_size}");
        assert!((0..tasks).all(|pk| log.contains_key(&pk)));
        assert_eq!(summary.keys() as i64, tasks);
        assert_eq!(summary.workers.len(), workers);
    }
}

#[tokio::test]
async fn zero_tasks_claims_nothing() {
    let (summary, log) = record_pool(0, derive_batch_size(0, 16), 16).await;
    assert!(log.is_empty());
    assert_eq!(summary.batches(), 0);
    assert_eq!(summary.idle_workers(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fewer_tasks_than_workers_leaves_workers_idle() {
    let batch_size = derive_batch_size(3, 8);
    assert_eq!(batch_size, 1);
    let (summary, log) = record_pool(3, batch_size, 8).await;
    assert_eq!(summary.batches(), 3);
    assert_eq!(summary.keys(), 3);
    assert_eq!(summary.idle_workers(), 5);
    assert!(summary.workers.iter().all(|w| w.keys == w.batches));
    assert_eq!(log.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batches_are_contiguous_per_worker() {
    let (_, log) = record_pool(1_000, 50, 8).await;
    for start in (0..1_000).step_by(50) {
        let owner = log[&start];
        assert!(
            (start..start + 50).all(|pk| log[&pk] == owner),
            "batch starting at {start} split across workers"
        );
    }
}
