//! Chunk assembly and the single-voxel query.
//!
//! `generate_chunk` fills a dense chunk in three passes (columns, terrain,
//! flora); `block_at` answers for one voxel without building a chunk. Both
//! are pure functions of the context and must agree exactly: a chunk cell
//! equals `block_at` at the same world position, whatever partition the
//! caller chose. The flora pass is the delicate part, see the write-order
//! notes below.

use crate::biome::{classify, subsurface_cell, surface_cell, Biome};
use crate::caves::{should_carve, try_ore_at};
use crate::config::WorldConfig;
use crate::ctx::GenContext;
use crate::flora::{for_each_tree_cell, ground_cover, tree_at, FloraColumn, CANOPY_RADIUS};
use crate::height::compute_height;
use crate::hydrology::{in_river_core, river_bed_y, river_surface_y, water_surface_at};
use crate::voxel::{cell_index, Chunk, ChunkKey, Material, VoxelCell};

/// Everything the voxel decision needs to know about one column. Computed
/// once per column and reused for the whole vertical run.
#[derive(Debug, Clone, Copy)]
pub struct ColumnInfo {
    /// Final solid-ground elevation, river carving included.
    pub ground: i32,
    /// Max height delta to the four axis neighbours of the carved
    /// heightmap; channel bed lowering is not part of it.
    pub slope: i32,
    pub moisture: f32,
    pub biome: Biome,
    pub river_core: bool,
    /// Still or flowing water table; at or below `ground` when the column
    /// holds no water.
    pub water_surface: i32,
}

impl ColumnInfo {
    #[inline]
    fn flora(&self) -> FloraColumn {
        FloraColumn {
            ground: self.ground,
            slope: self.slope,
            moisture: self.moisture,
            biome: self.biome,
            river_core: self.river_core,
        }
    }
}

pub fn column_info(x: i32, z: i32, ctx: &GenContext) -> ColumnInfo {
    let cfg = &ctx.cfg;
    let raw = ctx.ground_height(x, z);
    let slope = [(-1, 0), (1, 0), (0, -1), (0, 1)]
        .iter()
        .map(|&(dx, dz)| (raw - ctx.ground_height(x + dx, z + dz)).abs())
        .max()
        .unwrap_or(0);

    let (ground, river_core, water_surface) = match &ctx.flow {
        Some(field) => {
            if field.is_river(x, z) {
                // Carving already lowered the ground; the channel fills back
                // up toward the uncarved terrain.
                let uncarved = compute_height(x, z, cfg);
                (raw, true, river_surface_y(uncarved, raw))
            } else {
                (raw, false, water_surface_at(x, z, raw, slope, cfg))
            }
        }
        None => {
            if in_river_core(x, z, cfg.params.river_width, cfg) {
                let bed = river_bed_y(x, z, raw, cfg);
                (bed, true, river_surface_y(raw, bed))
            } else {
                (raw, false, water_surface_at(x, z, raw, slope, cfg))
            }
        }
    };

    let moisture = crate::biome::moisture_01(x, z, cfg);
    let biome = classify(x, z, ground, slope, cfg);
    ColumnInfo {
        ground,
        slope,
        moisture,
        biome,
        river_core,
        water_surface,
    }
}

/// Terrain voxel for a position: ground, strata, caves, ore and water.
/// Flora is layered on separately by the callers.
pub fn terrain_cell(x: i32, y: i32, z: i32, col: &ColumnInfo, cfg: &WorldConfig) -> VoxelCell {
    if y < 0 || y >= cfg.world_height() {
        return VoxelCell::AIR;
    }
    if y > col.ground {
        if y <= col.water_surface {
            return VoxelCell::new(Material::Water);
        }
        return VoxelCell::AIR;
    }
    if y == col.ground {
        if col.river_core && col.water_surface > col.ground {
            return VoxelCell::new(Material::Sand);
        }
        return surface_cell(x, z, col.ground, col.biome, col.slope, cfg);
    }
    if should_carve(x, y, z, col.ground, cfg) {
        return VoxelCell::AIR;
    }
    let cell = subsurface_cell(x, y, z, col.ground, col.biome, cfg);
    if cell.material == Material::Stone {
        if let Some(ore) = try_ore_at(x, y, z, cfg) {
            return VoxelCell::new(ore);
        }
    }
    cell
}

/// Fill one chunk's cell array. Returns the cells and whether any is
/// non-air.
///
/// Flora discipline: tree sites are scanned over the chunk plus a
/// `CANOPY_RADIUS` apron, in ascending x then ascending z, and each tree
/// cell is written only over replaceable cells. First writer wins, and
/// because `block_at` scans candidate sites in the same order, both paths
/// resolve overlapping canopies identically.
pub fn generate_chunk_cells(key: ChunkKey, ctx: &GenContext) -> (Box<[VoxelCell]>, bool) {
    let cfg = &ctx.cfg;
    let edge = cfg.chunk_edge as i32;
    let base = key.as_ivec3() * edge;
    let apron = edge + 2 * CANOPY_RADIUS;

    let mut columns = Vec::with_capacity((apron * apron) as usize);
    for lx in -CANOPY_RADIUS..edge + CANOPY_RADIUS {
        for lz in -CANOPY_RADIUS..edge + CANOPY_RADIUS {
            columns.push(column_info(base.x + lx, base.z + lz, ctx));
        }
    }
    let col_at = |lx: i32, lz: i32| {
        &columns[((lx + CANOPY_RADIUS) * apron + (lz + CANOPY_RADIUS)) as usize]
    };

    let edge_u = cfg.chunk_edge;
    let mut cells = vec![VoxelCell::AIR; edge_u * edge_u * edge_u].into_boxed_slice();
    let mut any_solid = false;
    for lx in 0..edge {
        for lz in 0..edge {
            let col = col_at(lx, lz);
            for ly in 0..edge {
                let cell = terrain_cell(base.x + lx, base.y + ly, base.z + lz, col, cfg);
                if !cell.is_air() {
                    cells[cell_index(edge_u, lx as usize, ly as usize, lz as usize)] = cell;
                    any_solid = true;
                }
            }
        }
    }

    let mut place = |wx: i32, wy: i32, wz: i32, cell: VoxelCell, any_solid: &mut bool| {
        let (lx, ly, lz) = (wx - base.x, wy - base.y, wz - base.z);
        if lx < 0 || ly < 0 || lz < 0 || lx >= edge || ly >= edge || lz >= edge {
            return;
        }
        let i = cell_index(edge_u, lx as usize, ly as usize, lz as usize);
        if cells[i].material.is_replaceable() {
            cells[i] = cell;
            *any_solid = true;
        }
    };

    for lx in -CANOPY_RADIUS..edge + CANOPY_RADIUS {
        for lz in -CANOPY_RADIUS..edge + CANOPY_RADIUS {
            let col = col_at(lx, lz);
            if let Some(tree) = tree_at(&col.flora(), base.x + lx, base.z + lz, ctx) {
                for_each_tree_cell(&tree, |wx, wy, wz, cell| {
                    place(wx, wy, wz, cell, &mut any_solid);
                });
            }
        }
    }

    // Ground cover fills leftover air one cell above the surface; a trunk
    // written above beats it, same as in the single-voxel path.
    for lx in 0..edge {
        for lz in 0..edge {
            let col = col_at(lx, lz);
            let wy = col.ground + 1;
            let ly = wy - base.y;
            if ly < 0 || ly >= edge {
                continue;
            }
            let i = cell_index(edge_u, lx as usize, ly as usize, lz as usize);
            if !cells[i].is_air() {
                continue;
            }
            if let Some(cover) = ground_cover(&col.flora(), base.x + lx, base.z + lz, cfg) {
                cells[i] = cover;
                any_solid = true;
            }
        }
    }

    (cells, any_solid)
}

/// Generate a complete chunk, with its world-space placement filled in from
/// the config.
pub fn generate_chunk(key: ChunkKey, ctx: &GenContext) -> Chunk {
    let (cells, any_solid) = generate_chunk_cells(key, ctx);
    Chunk::from_cells(
        key,
        ctx.cfg.chunk_edge,
        ctx.cfg.chunk_min_corner(key),
        ctx.cfg.voxel_size,
        cells,
        any_solid,
    )
}

/// Every voxel of one column, bottom to top, length `world_height()`.
///
/// Equivalent to `block_at` at each height but pays the neighbour-column
/// scan once per column instead of once per voxel. Whole-world exports use
/// this.
pub fn generate_column(x: i32, z: i32, ctx: &GenContext) -> Vec<VoxelCell> {
    let cfg = &ctx.cfg;
    let wh = cfg.world_height();
    let col = column_info(x, z, ctx);
    let mut cells: Vec<VoxelCell> = (0..wh).map(|y| terrain_cell(x, y, z, &col, cfg)).collect();

    for wx in x - CANOPY_RADIUS..=x + CANOPY_RADIUS {
        for wz in z - CANOPY_RADIUS..=z + CANOPY_RADIUS {
            let site_col = if wx == x && wz == z {
                col
            } else {
                column_info(wx, wz, ctx)
            };
            if let Some(tree) = tree_at(&site_col.flora(), wx, wz, ctx) {
                for_each_tree_cell(&tree, |cx, cy, cz, cell| {
                    if cx == x && cz == z && (0..wh).contains(&cy) {
                        let slot = &mut cells[cy as usize];
                        if slot.material.is_replaceable() {
                            *slot = cell;
                        }
                    }
                });
            }
        }
    }

    let cover_y = col.ground + 1;
    if (0..wh).contains(&cover_y) && cells[cover_y as usize].is_air() {
        if let Some(cover) = ground_cover(&col.flora(), x, z, cfg) {
            cells[cover_y as usize] = cover;
        }
    }
    cells
}

/// The voxel at one world position, without generating any chunk.
///
/// Exactly equal to the corresponding cell of `generate_chunk` for every
/// position and every chunk partition.
pub fn block_at(x: i32, y: i32, z: i32, ctx: &GenContext) -> VoxelCell {
    let cfg = &ctx.cfg;
    if y < 0 || y >= cfg.world_height() {
        return VoxelCell::AIR;
    }
    let col = column_info(x, z, ctx);
    let terrain = terrain_cell(x, y, z, &col, cfg);
    if !terrain.is_air() {
        return terrain;
    }

    // Same candidate order as the chunked flora pass: ascending x, then
    // ascending z, first tree to claim the cell wins.
    for wx in x - CANOPY_RADIUS..=x + CANOPY_RADIUS {
        for wz in z - CANOPY_RADIUS..=z + CANOPY_RADIUS {
            let site_col = if wx == x && wz == z {
                col
            } else {
                column_info(wx, wz, ctx)
            };
            if let Some(tree) = tree_at(&site_col.flora(), wx, wz, ctx) {
                let mut hit = None;
                for_each_tree_cell(&tree, |cx, cy, cz, cell| {
                    if hit.is_none() && cx == x && cy == y && cz == z {
                        hit = Some(cell);
                    }
                });
                if let Some(cell) = hit {
                    return cell;
                }
            }
        }
    }

    if y == col.ground + 1 {
        if let Some(cover) = ground_cover(&col.flora(), x, z, cfg) {
            return cover;
        }
    }
    VoxelCell::AIR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenParams, HydrologyMode, WorldConfig};
    use crate::hydrology::effective_sea_level;
    use glam::{IVec3, Vec3};
    use std::sync::Arc;

    fn ctx_with(seed: u32, mode: HydrologyMode, chunks: IVec3, edge: usize) -> GenContext {
        let params = GenParams {
            hydrology: mode,
            ..GenParams::default()
        };
        let cfg =
            WorldConfig::new(edge, chunks, 4, Vec3::ZERO, 1.0, seed, params).unwrap();
        GenContext::new(Arc::new(cfg))
    }

    fn assert_chunk_matches_blocks(key: ChunkKey, ctx: &GenContext) {
        let chunk = generate_chunk(key, ctx);
        let edge = ctx.cfg.chunk_edge as i32;
        let base = key.as_ivec3() * edge;
        for lx in 0..edge {
            for ly in 0..edge {
                for lz in 0..edge {
                    let from_chunk = chunk.get(lx as usize, ly as usize, lz as usize);
                    let from_query = block_at(base.x + lx, base.y + ly, base.z + lz, ctx);
                    assert_eq!(
                        from_chunk, from_query,
                        "mismatch at world ({}, {}, {})",
                        base.x + lx,
                        base.y + ly,
                        base.z + lz
                    );
                }
            }
        }
    }

    #[test]
    fn chunk_cells_agree_with_single_voxel_query() {
        let ctx = ctx_with(7, HydrologyMode::Warped, IVec3::new(16, 8, 16), 16);
        // Surface-level chunks in a few spots, including neighbours sharing
        // a border, so straddling canopies are exercised.
        for key in [
            ChunkKey::new(3, 2, 3),
            ChunkKey::new(4, 2, 3),
            ChunkKey::new(3, 3, 3),
        ] {
            assert_chunk_matches_blocks(key, &ctx);
        }
    }

    #[test]
    fn chunk_cells_agree_under_flow_hydrology() {
        let ctx = ctx_with(11, HydrologyMode::FlowAccumulation, IVec3::new(8, 8, 8), 16);
        for key in [ChunkKey::new(2, 2, 2), ChunkKey::new(3, 2, 2)] {
            assert_chunk_matches_blocks(key, &ctx);
        }
    }

    #[test]
    fn generation_is_reproducible_and_seed_sensitive() {
        let a = ctx_with(42, HydrologyMode::Warped, IVec3::new(16, 8, 16), 16);
        let b = ctx_with(42, HydrologyMode::Warped, IVec3::new(16, 8, 16), 16);
        let c = ctx_with(43, HydrologyMode::Warped, IVec3::new(16, 8, 16), 16);
        let key = ChunkKey::new(5, 2, 5);
        let (cells_a, _) = generate_chunk_cells(key, &a);
        let (cells_b, _) = generate_chunk_cells(key, &b);
        let (cells_c, _) = generate_chunk_cells(key, &c);
        assert_eq!(cells_a, cells_b);
        assert_ne!(cells_a, cells_c);
    }

    #[test]
    fn sky_chunks_are_empty_and_flagged() {
        let ctx = ctx_with(1, HydrologyMode::Warped, IVec3::new(16, 8, 16), 16);
        let key = ChunkKey::new(4, 7, 4);
        let chunk = generate_chunk(key, &ctx);
        assert!(!chunk.any_solid);
        assert!(chunk.cells().iter().all(|c| c.is_air()));

        let ground_chunk = generate_chunk(ChunkKey::new(4, 0, 4), &ctx);
        assert!(ground_chunk.any_solid);
    }

    #[test]
    fn oceans_fill_to_sea_level() {
        let ctx = ctx_with(13, HydrologyMode::Warped, IVec3::new(16, 8, 16), 16);
        let sea = effective_sea_level(&ctx.cfg);
        let size = ctx.cfg.world_size();
        let submarine = (0..size.x)
            .step_by(16)
            .flat_map(|x| (0..size.z).step_by(16).map(move |z| (x, z)))
            .find(|&(x, z)| column_info(x, z, &ctx).ground < sea - 2);
        let (x, z) = submarine.expect("no submarine column found on the sample grid");
        assert_eq!(block_at(x, sea - 1, z, &ctx).material, Material::Water);
        assert_eq!(block_at(x, sea + 1, z, &ctx).material, Material::Air);
    }

    #[test]
    fn column_export_matches_single_voxel_query() {
        let ctx = ctx_with(21, HydrologyMode::Warped, IVec3::new(16, 8, 16), 16);
        for (x, z) in [(40, 40), (41, 40), (200, 133), (7, 500)] {
            let column = generate_column(x, z, &ctx);
            assert_eq!(column.len(), ctx.cfg.world_height() as usize);
            for (y, cell) in column.iter().enumerate() {
                assert_eq!(
                    *cell,
                    block_at(x, y as i32, z, &ctx),
                    "mismatch in column ({x}, {z}) at y {y}"
                );
            }
        }
    }

    #[test]
    fn river_channels_hold_water_over_sand() {
        let ctx = ctx_with(0, HydrologyMode::Warped, IVec3::new(16, 8, 16), 16);
        let size = ctx.cfg.world_size();
        let mut checked = 0;
        for x in 0..size.x {
            for z in (0..size.z).step_by(7) {
                let col = column_info(x, z, &ctx);
                if !col.river_core || col.water_surface <= col.ground {
                    continue;
                }
                assert_eq!(
                    block_at(x, col.ground, z, &ctx).material,
                    Material::Sand
                );
                assert_eq!(
                    block_at(x, col.ground + 1, z, &ctx).material,
                    Material::Water
                );
                checked += 1;
                if checked >= 32 {
                    return;
                }
            }
        }
        assert!(checked > 0, "no wet river columns found");
    }
}
