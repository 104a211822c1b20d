//! Lock-free hand-out of contiguous key ranges.

use std::ops::Range;
use std::sync::atomic::{AtomicI64, Ordering};

/// Largest batch handed to a worker in one claim.
pub const MAX_BATCH_SIZE: i64 = 256;

/// Batch size for `tasks` keys spread over `concurrency` workers.
///
/// Small task counts shrink the batch so every worker still has a chance to
/// claim something; the floor is one key per batch.
pub fn derive_batch_size(tasks: i64, concurrency: usize) -> i64 {
    let workers = i64::try_from(concurrency.max(1)).unwrap_or(i64::MAX);
    (tasks.max(0) / workers).clamp(1, MAX_BATCH_SIZE)
}

/// Shared counter that splits `[0, tasks)` into disjoint batches.
///
/// Each [`claim`](Partitioner::claim) advances one atomic counter. The
/// counter saturates at `i64::MAX` instead of wrapping, so once it reaches
/// `tasks` every later claim reports exhaustion.
#[derive(Debug)]
pub struct Partitioner {
    next: AtomicI64,
    tasks: i64,
    batch_size: i64,
}

impl Partitioner {
    /// Creates a partitioner over `[0, tasks)`.
    ///
    /// Negative `tasks` is treated as zero and `batch_size` is raised to at
    /// least one.
    pub fn new(tasks: i64, batch_size: i64) -> Self {
        Self {
            next: AtomicI64::new(0),
            tasks: tasks.max(0),
            batch_size: batch_size.max(1),
        }
    }

    /// Total number of keys covered.
    pub fn tasks(&self) -> i64 {
        self.tasks
    }

    /// Keys per claim (the last batch may be shorter).
    pub fn batch_size(&self) -> i64 {
        self.batch_size
    }

    /// Claims the next batch, or `None` when every key has been handed out.
    pub fn claim(&self) -> Option<Range<i64>> {
        let step = self.batch_size;
        let (Ok(start) | Err(start)) = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                Some(next.saturating_add(step))
            });
        if start >= self.tasks {
            return None;
        }
        let end = start.saturating_add(step).min(self.tasks);
        Some(start..end)
    }
}
