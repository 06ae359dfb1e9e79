//! Background generation pipeline.
//!
//! A fixed pool of worker threads pulls chunk keys off a channel, re-checks
//! them against the freshest desired-set snapshot (keys the observer has
//! since walked away from are answered `Stale` without generating), and
//! runs the generator under panic protection. A panicking generation is
//! reported as `Failed` for that one chunk; the worker and the rest of the
//! stream keep going.

use ahash::AHashSet;
use arc_swap::ArcSwap;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use dashmap::DashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use worldgen::{generate_chunk, Chunk, ChunkKey, GenContext};

use crate::world_file::WorldVolume;

const IDLE_POLL: Duration = Duration::from_millis(25);
const RESULT_WAIT: Duration = Duration::from_secs(10);

/// Where finished chunks come from: the procedural generator, or slices of
/// a fully materialized world loaded from a snapshot.
pub enum ChunkSource {
    Generate,
    Volume(Arc<WorldVolume>),
}

impl ChunkSource {
    fn build(&self, key: ChunkKey, ctx: &GenContext) -> Chunk {
        match self {
            ChunkSource::Generate => generate_chunk(key, ctx),
            ChunkSource::Volume(volume) => {
                let edge = ctx.cfg.chunk_edge;
                let (cells, any_solid) = volume.chunk_cells(key, edge);
                Chunk::from_cells(
                    key,
                    edge,
                    ctx.cfg.chunk_min_corner(key),
                    ctx.cfg.voxel_size,
                    cells,
                    any_solid,
                )
            }
        }
    }
}

/// Every submitted key produces exactly one outcome.
#[derive(Debug)]
pub enum GenOutcome {
    Generated { key: ChunkKey, chunk: Chunk },
    /// No longer in the desired set by the time a worker picked it up.
    Stale { key: ChunkKey },
    /// The generator panicked for this chunk.
    Failed { key: ChunkKey },
}

impl GenOutcome {
    pub fn key(&self) -> ChunkKey {
        match *self {
            GenOutcome::Generated { key, .. }
            | GenOutcome::Stale { key }
            | GenOutcome::Failed { key } => key,
        }
    }
}

#[derive(Debug, Default)]
struct GenCounters {
    generated: AtomicU64,
    stale: AtomicU64,
    failed: AtomicU64,
    build_nanos: AtomicU64,
}

/// Point-in-time pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenStats {
    pub generated: u64,
    pub stale: u64,
    pub failed: u64,
    pub build_nanos: u64,
}

impl GenStats {
    /// Mean wall time per successful build, `None` before the first one.
    pub fn avg_build_time(&self) -> Option<Duration> {
        if self.generated == 0 {
            return None;
        }
        Some(Duration::from_nanos(self.build_nanos / self.generated))
    }
}

pub struct GenPipeline {
    job_tx: Sender<ChunkKey>,
    result_rx: Receiver<GenOutcome>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<GenCounters>,
}

impl GenPipeline {
    /// Spawn `worker_count` generation threads. Workers read the live
    /// desired-set snapshot and the attached-membership set to skip stale
    /// or redundant work, and pull chunks from whatever source is current.
    pub fn spawn(
        ctx: Arc<GenContext>,
        desired: Arc<ArcSwap<AHashSet<ChunkKey>>>,
        attached: Arc<DashSet<ChunkKey>>,
        source: Arc<ArcSwap<ChunkSource>>,
        worker_count: usize,
    ) -> Self {
        let (job_tx, job_rx) = unbounded::<ChunkKey>();
        let (result_tx, result_rx) = unbounded::<GenOutcome>();
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(GenCounters::default());

        let workers = (0..worker_count.max(1))
            .map(|id| {
                let ctx = Arc::clone(&ctx);
                let desired = Arc::clone(&desired);
                let attached = Arc::clone(&attached);
                let source = Arc::clone(&source);
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let running = Arc::clone(&running);
                let counters = Arc::clone(&counters);
                std::thread::Builder::new()
                    .name(format!("chunk-gen-{id}"))
                    .spawn(move || {
                        worker_loop(
                            id, ctx, desired, attached, source, job_rx, result_tx, running,
                            counters,
                        )
                    })
                    .unwrap_or_else(|e| panic!("failed to spawn chunk-gen-{id}: {e}"))
            })
            .collect();

        Self {
            job_tx,
            result_rx,
            running,
            workers,
            counters,
        }
    }

    /// Queue a key for generation. Quietly dropped if the pool is gone; the
    /// caller finds out through the missing outcome only after shutdown,
    /// which is the only time the pool can be gone.
    pub fn submit(&self, key: ChunkKey) {
        let _ = self.job_tx.send(key);
    }

    /// Next outcome if one is ready.
    pub fn try_recv(&self) -> Option<GenOutcome> {
        self.result_rx.try_recv().ok()
    }

    /// Wait for the next outcome. `None` only if the workers are gone or
    /// wedged for longer than the safety timeout.
    pub fn recv_blocking(&self) -> Option<GenOutcome> {
        match self.result_rx.recv_timeout(RESULT_WAIT) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("generation pipeline produced nothing for {RESULT_WAIT:?}");
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn stats(&self) -> GenStats {
        GenStats {
            generated: self.counters.generated.load(Ordering::Relaxed),
            stale: self.counters.stale.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            build_nanos: self.counters.build_nanos.load(Ordering::Relaxed),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for GenPipeline {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    id: usize,
    ctx: Arc<GenContext>,
    desired: Arc<ArcSwap<AHashSet<ChunkKey>>>,
    attached: Arc<DashSet<ChunkKey>>,
    source: Arc<ArcSwap<ChunkSource>>,
    job_rx: Receiver<ChunkKey>,
    result_tx: Sender<GenOutcome>,
    running: Arc<AtomicBool>,
    counters: Arc<GenCounters>,
) {
    loop {
        let key = match job_rx.recv_timeout(IDLE_POLL) {
            Ok(key) => key,
            Err(RecvTimeoutError::Timeout) => {
                if running.load(Ordering::Relaxed) {
                    continue;
                }
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        // The observer may have moved on while this key sat in the queue,
        // or the chunk may already be live; either way skip the build.
        if !desired.load().contains(&key) || attached.contains(&key) {
            counters.stale.fetch_add(1, Ordering::Relaxed);
            let _ = result_tx.send(GenOutcome::Stale { key });
            continue;
        }

        let src = source.load();
        let started = std::time::Instant::now();
        let outcome = match catch_unwind(AssertUnwindSafe(|| src.build(key, &ctx))) {
            Ok(chunk) => {
                counters.generated.fetch_add(1, Ordering::Relaxed);
                counters
                    .build_nanos
                    .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
                GenOutcome::Generated { key, chunk }
            }
            Err(payload) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(worker = id, ?key, panic = %msg, "chunk generation panicked");
                GenOutcome::Failed { key }
            }
        };
        if result_tx.send(outcome).is_err() {
            break;
        }
    }
    tracing::debug!(worker = id, "generation worker stopped");
}
