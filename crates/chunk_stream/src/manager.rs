//! The streaming manager: ties view tracking, the build pipeline, the
//! detached-chunk cache and the scene together.
//!
//! Residency invariant: at any instant a chunk key is in at most one of
//! attached, the detached cache, or in-flight. Outcomes always clear the
//! in-flight marker before the chunk enters another state, including stale
//! and failed outcomes, so a key can always be re-requested later.
//!
//! All scene mutation and all attached/cache mutation happens on the thread
//! calling [`ChunkStreamManager::load_chunks_around`]; workers only hand
//! finished chunks over a channel. The attached-membership set they share
//! is a read-only fast path on the worker side.

use ahash::{AHashMap, AHashSet};
use arc_swap::ArcSwap;
use dashmap::DashSet;
use glam::Vec3;
use std::path::Path;
use std::sync::Arc;
use worldgen::{block_at, Chunk, ChunkKey, GenContext, VoxelCell};

use crate::cache::DetachedCache;
use crate::error::WorldFileError;
use crate::job::{ChunkSource, GenOutcome, GenPipeline, GenStats};
use crate::view::ViewTracker;
use crate::world_file;

/// Receives chunks as they become visible and gives them back when they
/// leave the view. All-air chunks are tracked as resident but never reach
/// the sink.
pub trait SceneSink {
    fn attach(&mut self, chunk: &Arc<Chunk>);
    fn detach(&mut self, key: ChunkKey);
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub worker_count: usize,
    pub cache_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().saturating_sub(1).max(1),
            cache_capacity: 512,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStats {
    pub attached: usize,
    pub cached: usize,
    pub in_flight: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub gen: GenStats,
}

pub struct ChunkStreamManager {
    ctx: Arc<GenContext>,
    view: ViewTracker,
    desired: Arc<ArcSwap<AHashSet<ChunkKey>>>,
    in_flight: Arc<DashSet<ChunkKey>>,
    /// Key set mirrored from `attached`, shared read-only with workers.
    attached_keys: Arc<DashSet<ChunkKey>>,
    attached: AHashMap<ChunkKey, Arc<Chunk>>,
    cache: DetachedCache,
    source: Arc<ArcSwap<ChunkSource>>,
    pipeline: GenPipeline,
    /// Jobs submitted whose outcome has not been consumed yet.
    pending: usize,
}

impl ChunkStreamManager {
    pub fn new(ctx: Arc<GenContext>, stream: StreamConfig) -> Self {
        let desired: Arc<ArcSwap<AHashSet<ChunkKey>>> =
            Arc::new(ArcSwap::from_pointee(AHashSet::default()));
        let attached_keys = Arc::new(DashSet::new());
        let source = Arc::new(ArcSwap::from_pointee(ChunkSource::Generate));
        let pipeline = GenPipeline::spawn(
            Arc::clone(&ctx),
            Arc::clone(&desired),
            Arc::clone(&attached_keys),
            Arc::clone(&source),
            stream.worker_count,
        );
        let view = ViewTracker::new(Arc::clone(&ctx.cfg));
        Self {
            ctx,
            view,
            desired,
            in_flight: Arc::new(DashSet::new()),
            attached_keys,
            attached: AHashMap::new(),
            cache: DetachedCache::new(stream.cache_capacity),
            source,
            pipeline,
            pending: 0,
        }
    }

    /// Feed the observer position and absorb any finished build work. Call
    /// once per tick; always non-blocking.
    ///
    /// When the observer crossed into a new chunk column this publishes the
    /// new desired set, evicts residents that left it into the cache, and
    /// requests missing chunks nearest column first.
    pub fn load_chunks_around(&mut self, observer: Vec3, sink: &mut impl SceneSink) {
        if let Some(change) = self.view.update(observer) {
            let evict: Vec<ChunkKey> = self
                .attached
                .keys()
                .filter(|k| !change.desired_set.contains(k))
                .copied()
                .collect();
            for key in evict {
                self.detach_to_cache(key, sink);
            }
            self.desired.store(Arc::new(change.desired_set));
            tracing::debug!(
                center = ?change.center,
                desired = change.desired.len(),
                attached = self.attached.len(),
                "view moved"
            );

            for key in change.desired {
                if self.attached.contains_key(&key) {
                    continue;
                }
                if let Some(chunk) = self.cache.take(key) {
                    self.attach(chunk, sink);
                    continue;
                }
                // insert() is the in-flight dedupe: false means a request
                // for this key is already queued or running.
                if self.in_flight.insert(key) {
                    self.pipeline.submit(key);
                    self.pending += 1;
                }
            }
        }

        while let Some(outcome) = self.pipeline.try_recv() {
            self.apply(outcome, sink);
        }
    }

    /// Blocking variant for initial placement: request the view around the
    /// observer, then wait until every outstanding build has resolved.
    /// Returns false if the pipeline went quiet without delivering.
    pub fn ensure_view_loaded(&mut self, observer: Vec3, sink: &mut impl SceneSink) -> bool {
        self.load_chunks_around(observer, sink);
        while self.pending > 0 {
            match self.pipeline.recv_blocking() {
                Some(outcome) => self.apply(outcome, sink),
                None => return false,
            }
        }
        true
    }

    /// Detach everything, drop the cache, and discard outstanding builds.
    /// The next `load_chunks_around` starts from a blank slate.
    pub fn clear_loaded(&mut self, sink: &mut impl SceneSink) {
        self.desired.store(Arc::new(AHashSet::default()));
        self.view.reset();

        let keys: Vec<ChunkKey> = self.attached.keys().copied().collect();
        for key in keys {
            if let Some(chunk) = self.attached.remove(&key) {
                self.attached_keys.remove(&key);
                if chunk.any_solid {
                    sink.detach(key);
                }
            }
        }
        let capacity = self.cache.capacity();
        self.cache = DetachedCache::new(capacity);

        // Outstanding builds may be against a source about to change; wait
        // them out and throw the results away.
        while self.pending > 0 {
            match self.pipeline.recv_blocking() {
                Some(outcome) => {
                    self.in_flight.remove(&outcome.key());
                    self.pending -= 1;
                }
                None => break,
            }
        }
        self.pending = 0;
        self.in_flight.clear();
    }

    /// Generate the whole world synchronously and write it as a snapshot.
    pub fn generate_and_save_world(&self, path: &Path) -> Result<(), WorldFileError> {
        world_file::save_world(path, &self.ctx)
    }

    /// Switch from procedural generation to slicing chunks out of a saved
    /// world. Validates the file fully before any resident state changes;
    /// on success the current scene is cleared and subsequent requests are
    /// served from the file's contents.
    pub fn reload_from_existing_file(
        &mut self,
        path: &Path,
        sink: &mut impl SceneSink,
    ) -> Result<(), WorldFileError> {
        let volume = world_file::load_world(path, &self.ctx.cfg)?;
        self.clear_loaded(sink);
        self.source
            .store(Arc::new(ChunkSource::Volume(Arc::new(volume))));
        tracing::info!(path = %path.display(), "streaming source switched to world snapshot");
        Ok(())
    }

    fn apply(&mut self, outcome: GenOutcome, sink: &mut impl SceneSink) {
        let key = outcome.key();
        self.in_flight.remove(&key);
        self.pending = self.pending.saturating_sub(1);
        match outcome {
            GenOutcome::Generated { chunk, .. } => {
                if self.attached.contains_key(&key) || self.cache.contains(key) {
                    // Duplicate of something already resident.
                    return;
                }
                let chunk = Arc::new(chunk);
                if self.desired.load().contains(&key) {
                    self.attach(chunk, sink);
                } else {
                    // Finished work for a view we left: park it.
                    self.cache.insert(chunk);
                }
            }
            GenOutcome::Stale { .. } => {}
            GenOutcome::Failed { key } => {
                tracing::warn!(?key, "chunk dropped after failed build");
            }
        }
    }

    fn attach(&mut self, chunk: Arc<Chunk>, sink: &mut impl SceneSink) {
        if chunk.any_solid {
            sink.attach(&chunk);
        }
        self.attached_keys.insert(chunk.key);
        self.attached.insert(chunk.key, chunk);
    }

    fn detach_to_cache(&mut self, key: ChunkKey, sink: &mut impl SceneSink) {
        if let Some(chunk) = self.attached.remove(&key) {
            self.attached_keys.remove(&key);
            if chunk.any_solid {
                sink.detach(key);
            }
            self.cache.insert(chunk);
        }
    }

    /// The voxel at a world grid position: from the attached chunk when
    /// resident, otherwise from the active chunk source, so the answer
    /// stays consistent with resident chunks after a snapshot reload.
    pub fn voxel_at(&self, x: i32, y: i32, z: i32) -> VoxelCell {
        let edge = self.ctx.cfg.chunk_edge as i32;
        let key = ChunkKey::new(x.div_euclid(edge), y.div_euclid(edge), z.div_euclid(edge));
        if let Some(chunk) = self.attached.get(&key) {
            return chunk.get(
                x.rem_euclid(edge) as usize,
                y.rem_euclid(edge) as usize,
                z.rem_euclid(edge) as usize,
            );
        }
        match &**self.source.load() {
            ChunkSource::Generate => block_at(x, y, z, &self.ctx),
            ChunkSource::Volume(volume) => volume.cell_at(x, y, z),
        }
    }

    pub fn attached_chunk(&self, key: ChunkKey) -> Option<&Arc<Chunk>> {
        self.attached.get(&key)
    }

    pub fn is_attached(&self, key: ChunkKey) -> bool {
        self.attached.contains_key(&key)
    }

    pub fn is_cached(&self, key: ChunkKey) -> bool {
        self.cache.contains(key)
    }

    pub fn is_in_flight(&self, key: ChunkKey) -> bool {
        self.in_flight.contains(&key)
    }

    pub fn desired_snapshot(&self) -> Arc<AHashSet<ChunkKey>> {
        self.desired.load_full()
    }

    pub fn context(&self) -> &Arc<GenContext> {
        &self.ctx
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            attached: self.attached.len(),
            cached: self.cache.len(),
            in_flight: self.in_flight.len(),
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
            gen: self.pipeline.stats(),
        }
    }
}
