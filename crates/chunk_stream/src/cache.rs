//! Bounded LRU cache for detached chunks.
//!
//! Chunks leaving the view are parked here instead of being dropped, so an
//! observer doubling back gets them re-attached without regeneration. The
//! capacity bound makes eviction the only way the streaming layer's memory
//! can grow past the view itself.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use worldgen::{Chunk, ChunkKey};

pub struct DetachedCache {
    inner: LruCache<ChunkKey, Arc<Chunk>>,
    hits: u64,
    misses: u64,
}

impl DetachedCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Park a chunk, evicting the least recently used one if full.
    pub fn insert(&mut self, chunk: Arc<Chunk>) {
        self.inner.put(chunk.key, chunk);
    }

    /// Remove and return a cached chunk, counting hit or miss.
    pub fn take(&mut self, key: ChunkKey) -> Option<Arc<Chunk>> {
        match self.inner.pop(&key) {
            Some(chunk) => {
                self.hits += 1;
                Some(chunk)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    #[inline]
    pub fn contains(&self, key: ChunkKey) -> bool {
        self.inner.contains(&key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
