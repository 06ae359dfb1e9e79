//! Biome classification and strata layering: which voxel goes at and below
//! the surface of a column.

use crate::config::WorldConfig;
use crate::hydrology::effective_sea_level;
use crate::noise::{fbm_2d, hash_unit, ridged_fbm_2d};
use crate::voxel::{Material, VoxelCell};

const SEED_MOISTURE: u32 = 53;
const SEED_DRYNESS: u32 = 61;
const SEED_STRATA: u32 = 71;

/// Columns at most this far above sea level are beach.
const BEACH_BAND: i32 = 2;
/// Slope at which the surface breaks open to bare stone.
const STEEP_SLOPE: i32 = 3;
/// Thickness of the dirt band over stone.
const TOPSOIL_DEPTH: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Biome {
    Ocean,
    Beach,
    Plains,
    Forest,
    Desert,
    Taiga,
    Alpine,
}

/// Column moisture in `[0, 1]`.
pub fn moisture_01(x: i32, z: i32, cfg: &WorldConfig) -> f32 {
    fbm_2d(
        x as f32,
        z as f32,
        4,
        2.0,
        0.5,
        0.003,
        cfg.seed.wrapping_add(SEED_MOISTURE),
    )
}

fn dryness_01(x: i32, z: i32, moisture: f32, cfg: &WorldConfig) -> f32 {
    let ridged = ridged_fbm_2d(
        x as f32,
        z as f32,
        3,
        2.0,
        0.5,
        0.004,
        cfg.seed.wrapping_add(SEED_DRYNESS),
    );
    0.55 * ridged + 0.45 * (1.0 - moisture)
}

/// Biome for a column. Hard overrides (ocean, beach) first, then the
/// moisture/dryness split.
pub fn classify(x: i32, z: i32, ground: i32, slope: i32, cfg: &WorldConfig) -> Biome {
    let sea = effective_sea_level(cfg);
    if ground < sea {
        return Biome::Ocean;
    }
    if ground <= sea + BEACH_BAND {
        return Biome::Beach;
    }
    if ground >= cfg.snow_level() || (slope >= STEEP_SLOPE + 2 && ground >= cfg.snow_level() * 7 / 8) {
        return Biome::Alpine;
    }
    let moisture = moisture_01(x, z, cfg);
    if dryness_01(x, z, moisture, cfg) > 0.62 {
        return Biome::Desert;
    }
    if ground > cfg.snow_level() * 3 / 4 && moisture > 0.35 {
        return Biome::Taiga;
    }
    if moisture > 0.45 {
        Biome::Forest
    } else {
        Biome::Plains
    }
}

/// Simulated strata: rock meta from altitude banding, perturbed by
/// low-frequency noise so the bands undulate instead of forming flat lines.
pub fn stone_meta(x: i32, y: i32, z: i32, cfg: &WorldConfig) -> u8 {
    let wobble = (fbm_2d(
        x as f32,
        z as f32,
        2,
        2.0,
        0.5,
        0.008,
        cfg.seed.wrapping_add(SEED_STRATA),
    ) - 0.5)
        * 16.0;
    let band_height = (cfg.world_height() / 16).max(4);
    (((y as f32 + wobble) as i32).div_euclid(band_height).rem_euclid(4)) as u8
}

/// Voxel at the surface of a column.
pub fn surface_cell(x: i32, z: i32, ground: i32, biome: Biome, slope: i32, cfg: &WorldConfig) -> VoxelCell {
    match biome {
        Biome::Ocean => {
            // Shallow shelves keep sand; deep floor is gravel with the
            // occasional exposed stone patch.
            let sea = effective_sea_level(cfg);
            if ground >= sea - 4 {
                VoxelCell::new(Material::Sand)
            } else if hash_unit(x, ground, z, cfg.seed.wrapping_add(SEED_STRATA)) < 0.15 {
                VoxelCell::with_meta(Material::Stone, stone_meta(x, ground, z, cfg))
            } else {
                VoxelCell::new(Material::Gravel)
            }
        }
        Biome::Beach | Biome::Desert => VoxelCell::new(Material::Sand),
        Biome::Alpine => {
            if slope >= STEEP_SLOPE {
                VoxelCell::with_meta(Material::Stone, stone_meta(x, ground, z, cfg))
            } else {
                VoxelCell::new(Material::Snow)
            }
        }
        Biome::Plains | Biome::Forest | Biome::Taiga => {
            if slope >= STEEP_SLOPE {
                VoxelCell::with_meta(Material::Stone, stone_meta(x, ground, z, cfg))
            } else {
                VoxelCell::new(Material::Grass)
            }
        }
    }
}

/// Voxel below the surface: a topsoil band matching the biome, stone with
/// strata meta underneath.
pub fn subsurface_cell(x: i32, y: i32, z: i32, ground: i32, biome: Biome, cfg: &WorldConfig) -> VoxelCell {
    let depth = ground - y;
    if depth <= TOPSOIL_DEPTH {
        match biome {
            Biome::Beach | Biome::Desert => return VoxelCell::new(Material::Sand),
            Biome::Ocean => return VoxelCell::new(Material::Gravel),
            _ => return VoxelCell::new(Material::Dirt),
        }
    }
    VoxelCell::with_meta(Material::Stone, stone_meta(x, y, z, cfg))
}
