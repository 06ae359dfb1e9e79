//! View tracking: which chunks the observer should have resident.
//!
//! The desired set is every world chunk whose column lies within the
//! horizontal view distance of the observer's chunk, all vertical layers
//! included. It is the single authority on residency: anything attached
//! that is not in it gets evicted to the cache on the same tick.

use ahash::AHashSet;
use glam::{IVec3, Vec3};
use std::sync::Arc;
use worldgen::{ChunkKey, WorldConfig};

/// Result of an observer move that crossed a chunk-column border.
pub struct ViewChange {
    /// Observer chunk column after the move.
    pub center: IVec3,
    /// Chunks that should be resident, nearest column first.
    pub desired: Vec<ChunkKey>,
    /// Same set, for membership checks and the worker stale test.
    pub desired_set: AHashSet<ChunkKey>,
}

/// Tracks the observer's chunk column and recomputes the desired set when
/// it changes.
pub struct ViewTracker {
    cfg: Arc<WorldConfig>,
    current: Option<IVec3>,
}

impl ViewTracker {
    pub fn new(cfg: Arc<WorldConfig>) -> Self {
        Self { cfg, current: None }
    }

    /// Observer chunk column from the last accepted update, if any.
    pub fn center(&self) -> Option<IVec3> {
        self.current
    }

    /// Forget the tracked position, forcing the next update to recompute.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Feed an observer position. Returns `None` while the observer stays
    /// within the same chunk column; vertical motion alone never changes
    /// the desired set.
    pub fn update(&mut self, pos: Vec3) -> Option<ViewChange> {
        let center = self.cfg.chunk_at(pos);
        if let Some(cur) = self.current {
            if cur.x == center.x && cur.z == center.z {
                self.current = Some(center);
                return None;
            }
        }
        self.current = Some(center);

        let desired_set = chunks_within(&self.cfg, center, self.cfg.view_distance);

        // Nearest column first, lower layers first within a column.
        let center_key = ChunkKey::new(center.x, 0, center.z);
        let mut desired: Vec<ChunkKey> = desired_set.iter().copied().collect();
        desired.sort_unstable_by_key(|k| (k.horizontal_dist_sq(center_key), k.y, *k));

        Some(ViewChange {
            center,
            desired,
            desired_set,
        })
    }
}

/// All world chunks whose column is within `radius` (Euclidean, horizontal)
/// of the center column. Clipped to the world's bounded chunk grid.
fn chunks_within(cfg: &WorldConfig, center: IVec3, radius: i32) -> AHashSet<ChunkKey> {
    let mut set = AHashSet::new();
    let r_sq = (radius as i64) * (radius as i64);
    for cx in center.x - radius..=center.x + radius {
        for cz in center.z - radius..=center.z + radius {
            let dx = (cx - center.x) as i64;
            let dz = (cz - center.z) as i64;
            if dx * dx + dz * dz > r_sq {
                continue;
            }
            for cy in 0..cfg.chunks.y {
                let key = ChunkKey::new(cx, cy, cz);
                if cfg.contains_chunk(key) {
                    set.insert(key);
                }
            }
        }
    }
    set
}
