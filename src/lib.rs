//! Fixed-volume throughput benchmark for CQL clusters.
//!
//! A shared [`partition::Partitioner`] hands contiguous key batches to a
//! pool of workers; each worker inserts and/or selects every key it claims
//! and verifies reads against [`workload::expected_values`]. The
//! [`bench::Benchmark`] driver times how long the pool takes to drain
//! `[0, tasks)`.

#![warn(missing_docs)]

pub mod backend;
pub mod bench;
pub mod config;
pub mod error;
pub mod logging;
pub mod partition;
pub mod pool;
pub mod report;
pub mod schema;
pub mod workload;

pub use backend::{Backend, MemoryBackend, ScyllaBackend};
pub use bench::{Benchmark, Phase};
pub use config::BenchConfig;
pub use error::{BenchError, Result};
pub use partition::Partitioner;
pub use report::BenchReport;
pub use workload::{Record, Workload};
