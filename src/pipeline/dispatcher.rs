//! Chunk dispatcher - fans one chunk's instrument groups out to a worker pool
//!
//! ## Architecture
//!
//! ```text
//! dispatch_chunk(groups)
//!     ├─ group "A" ──┐
//!     ├─ group "B" ──┼──mpsc (shared queue)──► idle worker (own store + MultiplierCache)
//!     └─ ...       ──┘
//!     ◄──oneshot── (key, result) per group
//! barrier: every reply awaited before the ChunkResult is returned
//! ```
//!
//! Workers are blocking threads (SQLite I/O) that live for the whole run. They
//! all pull from one queue, so an idle worker always takes the next group. No
//! memory is shared between them besides the queue; each keeps its own store
//! connection and cache, and results travel back over oneshot channels.

use super::aggregator::ChunkResult;
use super::cache::{CacheStats, MultiplierCache};
use super::error::PipelineError;
use super::partition::InstrumentGroup;
use super::strategy::{self, DEFAULT_MULTIPLIER};
use crate::store::{MultiplierStore, StoreError};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Pending tasks buffered in the shared queue before `dispatch_chunk` waits
const TASK_QUEUE_DEPTH: usize = 256;

struct InstrumentTask {
    group: InstrumentGroup,
    reply: oneshot::Sender<(String, Option<f64>)>,
}

type TaskQueue = Arc<Mutex<mpsc::Receiver<InstrumentTask>>>;

pub struct ChunkDispatcher {
    tx: mpsc::Sender<InstrumentTask>,
    workers: Vec<JoinHandle<CacheStats>>,
}

impl ChunkDispatcher {
    /// Start `worker_count` workers, each with its own store from `open_store`
    ///
    /// Stores are opened up front; any failure aborts before work starts.
    /// Must be called from within a tokio runtime.
    pub fn spawn<S, F>(worker_count: usize, mut open_store: F) -> Result<Self, PipelineError>
    where
        S: MultiplierStore + Send + 'static,
        F: FnMut(usize) -> Result<S, StoreError>,
    {
        if worker_count == 0 {
            return Err(PipelineError::Worker(
                "worker pool needs at least one worker".to_string(),
            ));
        }

        let caches = (0..worker_count)
            .map(|id| open_store(id).map(MultiplierCache::new))
            .collect::<Result<Vec<_>, _>>()?;

        let (tx, rx) = mpsc::channel(TASK_QUEUE_DEPTH);
        let queue: TaskQueue = Arc::new(Mutex::new(rx));

        let workers = caches
            .into_iter()
            .enumerate()
            .map(|(id, cache)| {
                let queue = Arc::clone(&queue);
                tokio::task::spawn_blocking(move || run_worker(id, queue, cache))
            })
            .collect();

        log::info!("👷 Started {} instrument workers", worker_count);
        Ok(Self { tx, workers })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Process every group of one chunk and wait for all of them
    ///
    /// The returned result follows the order of `groups`, whatever order the
    /// workers finish in. A worker that disappears or panics mid-task fails
    /// the whole chunk.
    pub async fn dispatch_chunk(
        &self,
        groups: Vec<InstrumentGroup>,
    ) -> Result<ChunkResult, PipelineError> {
        let mut pending = Vec::with_capacity(groups.len());

        for group in groups {
            let key = group.key.clone();
            let (reply, rx) = oneshot::channel();

            self.tx
                .send(InstrumentTask { group, reply })
                .await
                .map_err(|_| PipelineError::Worker("worker pool has stopped".to_string()))?;

            pending.push((key, rx));
        }

        let mut result = ChunkResult::new();
        for (key, rx) in pending {
            let (key, value) = rx.await.map_err(|_| {
                PipelineError::Worker(format!("task for {} was dropped by its worker", key))
            })?;
            result.insert(key, value);
        }

        Ok(result)
    }

    /// Stop all workers and return their combined cache counters
    pub async fn shutdown(self) -> Result<CacheStats, PipelineError> {
        // Closing the queue ends every worker loop
        drop(self.tx);

        let mut total = CacheStats::default();
        for (id, handle) in self.workers.into_iter().enumerate() {
            let stats = handle
                .await
                .map_err(|e| PipelineError::Worker(format!("worker {} failed: {}", id, e)))?;
            total += stats;
        }

        Ok(total)
    }
}

/// Take the next task, holding the queue lock only while waiting for it
fn next_task(queue: &TaskQueue) -> Option<InstrumentTask> {
    let mut rx = match queue.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    rx.blocking_recv()
}

fn run_worker<S: MultiplierStore>(
    id: usize,
    queue: TaskQueue,
    mut cache: MultiplierCache<S>,
) -> CacheStats {
    log::debug!("👷 Worker {} ready", id);

    while let Some(InstrumentTask { group, reply }) = next_task(&queue) {
        let multiplier = cache
            .get(&group.key, Instant::now())
            .unwrap_or(DEFAULT_MULTIPLIER);
        let value = strategy::process(&group.key, &group.records, multiplier);

        // Receiver gone means the run is already aborting
        let _ = reply.send((group.key, value));
    }

    let stats = cache.stats();
    log::debug!(
        "👷 Worker {} stopped (cache hits: {}, misses: {})",
        id,
        stats.hits,
        stats.misses
    );
    stats
}
