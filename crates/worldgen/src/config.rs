//! Immutable world configuration, created once at world setup and shared
//! read-only by every generation worker.

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk edge length must be at least 2 (got {0})")]
    ChunkEdgeTooSmall(usize),
    #[error("chunk counts per axis must all be positive (got {0}x{1}x{2})")]
    EmptyWorld(i32, i32, i32),
    #[error("view distance must be at least 1 chunk (got {0})")]
    ViewDistanceTooSmall(i32),
    #[error("voxel size must be positive and finite (got {0})")]
    BadVoxelSize(f32),
}

/// Which river strategy shapes the terrain.
///
/// `Warped` rivers come from a per-column noise band and can be evaluated
/// chunk-locally. `FlowAccumulation` routes drainage over the whole
/// heightmap up front and carves where accumulated flow is large; it needs a
/// precomputed flow field, so the streaming path builds one at startup. The
/// two strategies place rivers differently for the same seed and are never
/// mixed within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HydrologyMode {
    #[default]
    Warped,
    FlowAccumulation,
}

/// Tunable generation parameters. Defaults match the stock terrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenParams {
    pub hydrology: HydrologyMode,
    /// Target river channel width, in columns.
    pub river_width: f32,
    /// Accumulated-flow threshold above which a column is carved.
    pub flow_threshold: f32,
    /// Fraction of world height below the lowest terrain.
    pub base_offset_frac: f32,
    /// Fraction of world height spanned by terrain relief.
    pub relief_frac: f32,
    /// Minimum column moisture for tree placement.
    pub tree_min_moisture: f32,
    /// Maximum column slope (voxels per column step) for tree placement.
    pub tree_max_slope: i32,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            hydrology: HydrologyMode::Warped,
            river_width: 6.0,
            flow_threshold: 240.0,
            base_offset_frac: 0.12,
            relief_frac: 0.55,
            tree_min_moisture: 0.28,
            tree_max_slope: 2,
        }
    }
}

/// World setup: geometry, seed and generation parameters.
///
/// Constructed once via [`WorldConfig::new`], then read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Voxels along one chunk edge.
    pub chunk_edge: usize,
    /// Number of chunks per axis; the world is a finite bounded volume.
    pub chunks: IVec3,
    /// View distance in chunks, horizontal.
    pub view_distance: i32,
    /// World-space position of voxel (0, 0, 0).
    pub origin: Vec3,
    /// Physical edge length of one voxel.
    pub voxel_size: f32,
    pub seed: u32,
    pub params: GenParams,
}

impl WorldConfig {
    pub fn new(
        chunk_edge: usize,
        chunks: IVec3,
        view_distance: i32,
        origin: Vec3,
        voxel_size: f32,
        seed: u32,
        params: GenParams,
    ) -> Result<Self, ConfigError> {
        if chunk_edge < 2 {
            return Err(ConfigError::ChunkEdgeTooSmall(chunk_edge));
        }
        if chunks.x <= 0 || chunks.y <= 0 || chunks.z <= 0 {
            return Err(ConfigError::EmptyWorld(chunks.x, chunks.y, chunks.z));
        }
        if view_distance < 1 {
            return Err(ConfigError::ViewDistanceTooSmall(view_distance));
        }
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(ConfigError::BadVoxelSize(voxel_size));
        }
        Ok(Self {
            chunk_edge,
            chunks,
            view_distance,
            origin,
            voxel_size,
            seed,
            params,
        })
    }

    /// World extent in voxels.
    #[inline]
    pub fn world_size(&self) -> IVec3 {
        self.chunks * self.chunk_edge as i32
    }

    #[inline]
    pub fn world_height(&self) -> i32 {
        self.chunks.y * self.chunk_edge as i32
    }

    /// Nominal sea level, a quarter of world height.
    #[inline]
    pub fn sea_level(&self) -> i32 {
        self.world_height() / 4
    }

    /// Elevation above which exposed surfaces turn to snow.
    #[inline]
    pub fn snow_level(&self) -> i32 {
        self.world_height() * 5 / 8
    }

    /// World-space minimum corner of a chunk.
    #[inline]
    pub fn chunk_min_corner(&self, key: crate::voxel::ChunkKey) -> Vec3 {
        self.origin
            + IVec3::new(key.x, key.y, key.z).as_vec3() * self.chunk_edge as f32 * self.voxel_size
    }

    /// Whether a chunk key lies inside the world's bounded chunk grid.
    #[inline]
    pub fn contains_chunk(&self, key: crate::voxel::ChunkKey) -> bool {
        (0..self.chunks.x).contains(&key.x)
            && (0..self.chunks.y).contains(&key.y)
            && (0..self.chunks.z).contains(&key.z)
    }

    /// Chunk grid coordinates of a world-space position.
    pub fn chunk_at(&self, pos: Vec3) -> IVec3 {
        let rel = (pos - self.origin) / (self.chunk_edge as f32 * self.voxel_size);
        IVec3::new(
            rel.x.floor() as i32,
            rel.y.floor() as i32,
            rel.z.floor() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Result<WorldConfig, ConfigError> {
        WorldConfig::new(
            32,
            IVec3::new(16, 8, 16),
            4,
            Vec3::ZERO,
            1.0,
            0,
            GenParams::default(),
        )
    }

    #[test]
    fn valid_config_derives_levels() {
        let cfg = base().unwrap();
        assert_eq!(cfg.world_height(), 256);
        assert_eq!(cfg.sea_level(), 64);
        assert_eq!(cfg.snow_level(), 160);
        assert_eq!(cfg.world_size(), IVec3::new(512, 256, 512));
    }

    #[test]
    fn rejects_degenerate_geometry() {
        assert!(matches!(
            WorldConfig::new(1, IVec3::splat(4), 2, Vec3::ZERO, 1.0, 0, GenParams::default()),
            Err(ConfigError::ChunkEdgeTooSmall(1))
        ));
        assert!(matches!(
            WorldConfig::new(16, IVec3::new(4, 0, 4), 2, Vec3::ZERO, 1.0, 0, GenParams::default()),
            Err(ConfigError::EmptyWorld(4, 0, 4))
        ));
        assert!(matches!(
            WorldConfig::new(16, IVec3::splat(4), 0, Vec3::ZERO, 1.0, 0, GenParams::default()),
            Err(ConfigError::ViewDistanceTooSmall(0))
        ));
        assert!(matches!(
            WorldConfig::new(16, IVec3::splat(4), 2, Vec3::ZERO, 0.0, 0, GenParams::default()),
            Err(ConfigError::BadVoxelSize(_))
        ));
    }

    #[test]
    fn chunk_at_floors_toward_negative() {
        let cfg = base().unwrap();
        assert_eq!(cfg.chunk_at(Vec3::new(0.5, 0.5, 0.5)), IVec3::ZERO);
        assert_eq!(cfg.chunk_at(Vec3::new(33.0, 0.0, 63.9)), IVec3::new(1, 0, 1));
        assert_eq!(cfg.chunk_at(Vec3::new(-0.1, 0.0, 0.0)), IVec3::new(-1, 0, 0));
    }
}
