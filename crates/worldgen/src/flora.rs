//! Deterministic vegetation: blue-noise tree placement and ground cover.
//!
//! Tree sites come from a jittered grid: each placement cell elects exactly
//! one hashed representative column, which enforces a minimum spacing
//! without any neighbour search. Both the chunked generator and the
//! single-voxel query enumerate the same tree shapes, so a canopy that
//! straddles a chunk border looks identical from either side.

use crate::biome::{surface_cell, Biome};
use crate::config::WorldConfig;
use crate::ctx::GenContext;
use crate::hydrology::river_mask_01;
use crate::noise::{fast_hash, hash_unit};
use crate::voxel::{Material, VoxelCell};

const SEED_CELL_X: u32 = 701;
const SEED_CELL_Z: u32 = 727;
const SEED_TREE_KIND: u32 = 733;
const SEED_TRUNK: u32 = 739;
const SEED_COVER: u32 = 811;
const SEED_COVER_META: u32 = 823;

/// Maximum lateral reach of any canopy; callers generating a chunk must
/// consider tree sites up to this many columns outside the chunk.
pub const CANOPY_RADIUS: i32 = 2;
/// A tree occupies `trunk_height + CANOPY_TOP` cells above its base.
const CANOPY_TOP: i32 = 1;

const RIVER_MASK_REJECT: f32 = 0.25;
const COVER_CHANCE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    Broadleaf,
    Conifer,
}

/// A fully determined tree: shape depends only on these fields.
#[derive(Debug, Clone, Copy)]
pub struct TreeInstance {
    pub x: i32,
    pub z: i32,
    /// First trunk cell, one above the surface.
    pub base_y: i32,
    pub trunk_height: i32,
    pub kind: TreeKind,
}

impl TreeInstance {
    /// Highest cell the tree occupies.
    #[inline]
    pub fn top_y(&self) -> i32 {
        self.base_y + self.trunk_height + CANOPY_TOP
    }
}

/// Column facts a tree decision needs; produced by the chunk generator's
/// column pass.
#[derive(Debug, Clone, Copy)]
pub struct FloraColumn {
    pub ground: i32,
    pub slope: i32,
    pub moisture: f32,
    pub biome: Biome,
    pub river_core: bool,
}

/// Placement-cell edge from the moisture band: wetter terrain packs trees
/// tighter.
fn cell_size(moisture: f32) -> i32 {
    if moisture > 0.66 {
        6
    } else if moisture > 0.45 {
        8
    } else if moisture > 0.34 {
        11
    } else {
        14
    }
}

fn near_river(x: i32, z: i32, ctx: &GenContext) -> bool {
    match &ctx.flow {
        Some(field) => {
            for dx in -CANOPY_RADIUS..=CANOPY_RADIUS {
                for dz in -CANOPY_RADIUS..=CANOPY_RADIUS {
                    if field.is_river(x + dx, z + dz) {
                        return true;
                    }
                }
            }
            false
        }
        None => river_mask_01(x, z, &ctx.cfg) >= RIVER_MASK_REJECT,
    }
}

/// Decide whether a column hosts a tree, and which one.
///
/// Returns `None` unless the column is the blue-noise representative of its
/// placement cell, passes the biome/moisture/slope/river gates, and the
/// whole tree fits inside the vertical chunk slice of its base and under
/// the world ceiling. The fit rule is phrased against the fixed world-wide
/// chunk grid so every caller rejects the same sites.
pub fn tree_at(col: &FloraColumn, x: i32, z: i32, ctx: &GenContext) -> Option<TreeInstance> {
    let cfg = &ctx.cfg;
    if !matches!(col.biome, Biome::Plains | Biome::Forest | Biome::Taiga) {
        return None;
    }
    if col.moisture < cfg.params.tree_min_moisture || col.slope > cfg.params.tree_max_slope {
        return None;
    }
    if surface_cell(x, z, col.ground, col.biome, col.slope, cfg).material != Material::Grass {
        return None;
    }
    if col.river_core || near_river(x, z, ctx) {
        return None;
    }

    let cell = cell_size(col.moisture);
    let cx = x.div_euclid(cell);
    let cz = z.div_euclid(cell);
    let jx = (fast_hash(cx, 0, cz, cfg.seed.wrapping_add(SEED_CELL_X)) as u32 % cell as u32) as i32;
    let jz = (fast_hash(cx, 0, cz, cfg.seed.wrapping_add(SEED_CELL_Z)) as u32 % cell as u32) as i32;
    if x != cx * cell + jx || z != cz * cell + jz {
        return None;
    }

    // Conifers uphill, broadleaves in the wet lowlands, hashed otherwise.
    let kind = if col.ground > cfg.snow_level() * 7 / 10 {
        TreeKind::Conifer
    } else if col.moisture > 0.55 {
        TreeKind::Broadleaf
    } else if fast_hash(x, 1, z, cfg.seed.wrapping_add(SEED_TREE_KIND)) & 3 == 0 {
        TreeKind::Conifer
    } else {
        TreeKind::Broadleaf
    };

    let trunk_height = match kind {
        TreeKind::Broadleaf => 4 + (fast_hash(x, 2, z, cfg.seed.wrapping_add(SEED_TRUNK)) as u32 % 3) as i32,
        TreeKind::Conifer => 5 + (fast_hash(x, 2, z, cfg.seed.wrapping_add(SEED_TRUNK)) as u32 % 3) as i32,
    };

    let tree = TreeInstance {
        x,
        z,
        base_y: col.ground + 1,
        trunk_height,
        kind,
    };

    if tree.top_y() >= cfg.world_height() {
        return None;
    }
    let edge = cfg.chunk_edge as i32;
    let base_layer = tree.base_y.div_euclid(edge);
    if tree.top_y() >= (base_layer + 1) * edge {
        return None;
    }
    Some(tree)
}

/// Enumerate every cell of a tree in a fixed order (trunk first, canopy
/// layers bottom-up). Callers must only write into replaceable cells; the
/// fixed order is what keeps independent writers byte-identical.
pub fn for_each_tree_cell(tree: &TreeInstance, mut f: impl FnMut(i32, i32, i32, VoxelCell)) {
    let trunk = VoxelCell::new(Material::Trunk);
    for i in 0..tree.trunk_height {
        f(tree.x, tree.base_y + i, tree.z, trunk);
    }
    let variant = match tree.kind {
        TreeKind::Broadleaf => 0,
        TreeKind::Conifer => 1,
    };
    let leaves = VoxelCell::with_meta(Material::Leaves, variant);
    match tree.kind {
        TreeKind::Broadleaf => {
            // Two wide square layers (outer corners skipped), then a 3x3 cap.
            for (dy, radius, skip_corners) in [
                (tree.trunk_height - 2, 2i32, true),
                (tree.trunk_height - 1, 2, true),
                (tree.trunk_height, 1, false),
                (tree.trunk_height + 1, 1, false),
            ] {
                for dx in -radius..=radius {
                    for dz in -radius..=radius {
                        if dx == 0 && dz == 0 && dy < tree.trunk_height {
                            continue; // trunk runs through here
                        }
                        if skip_corners && dx.abs() == radius && dz.abs() == radius {
                            continue;
                        }
                        f(tree.x + dx, tree.base_y + dy, tree.z + dz, leaves);
                    }
                }
            }
        }
        TreeKind::Conifer => {
            // Narrowing diamond layers up to a single-cell tip.
            for (dy, radius) in [
                (tree.trunk_height - 3, 2i32),
                (tree.trunk_height - 2, 2),
                (tree.trunk_height - 1, 1),
                (tree.trunk_height, 1),
                (tree.trunk_height + 1, 0),
            ] {
                for dx in -radius..=radius {
                    for dz in -radius..=radius {
                        if dx.abs() + dz.abs() > radius {
                            continue;
                        }
                        if dx == 0 && dz == 0 && dy < tree.trunk_height {
                            continue;
                        }
                        f(tree.x + dx, tree.base_y + dy, tree.z + dz, leaves);
                    }
                }
            }
        }
    }
}

/// Tall-grass ground cover for a column, placed one cell above the surface.
/// Runs after tree placement and only ever fills air.
pub fn ground_cover(col: &FloraColumn, x: i32, z: i32, cfg: &WorldConfig) -> Option<VoxelCell> {
    if !matches!(col.biome, Biome::Plains | Biome::Forest) {
        return None;
    }
    if col.moisture <= 0.4 {
        return None;
    }
    if surface_cell(x, z, col.ground, col.biome, col.slope, cfg).material != Material::Grass {
        return None;
    }
    if hash_unit(x, 3, z, cfg.seed.wrapping_add(SEED_COVER)) >= COVER_CHANCE {
        return None;
    }
    let meta = (fast_hash(x, 4, z, cfg.seed.wrapping_add(SEED_COVER_META)) as u32 % 3) as u8;
    Some(VoxelCell::with_meta(Material::TallGrass, meta))
}
