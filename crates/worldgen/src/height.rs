//! Per-column terrain elevation from composed noise layers.

use crate::config::{HydrologyMode, WorldConfig};
use crate::hydrology;
use crate::noise::{fbm_2d, gradient_noise_2d, ridged_fbm_2d, smoothstep};

// Seed salts keep the layers decorrelated.
const SEED_WARP_X1: u32 = 101;
const SEED_WARP_Z1: u32 = 131;
const SEED_WARP_X2: u32 = 157;
const SEED_WARP_Z2: u32 = 173;
const SEED_CONTINENT: u32 = 11;
const SEED_RIDGE: u32 = 23;
const SEED_DETAIL: u32 = 37;
const SEED_JITTER: u32 = 91;

const CONTINENT_BLEND: f32 = 0.42;
const RIDGE_BLEND: f32 = 0.40;
const DETAIL_BLEND: f32 = 0.18;

/// Continent exponent; higher values push more area below sea level.
const CONTINENT_EXP: f32 = 1.4;
/// Continent value under which the ocean bias starts pulling columns down.
const OCEAN_SHELF: f32 = 0.34;
const OCEAN_BIAS: f32 = 1.1;
const RIVER_CARVE: f32 = 0.16;

/// Two-stage domain warp: a broad low-frequency displacement followed by a
/// smaller one evaluated at the already-warped position, which breaks up the
/// axis alignment a single warp leaves behind.
pub fn warp(x: f32, z: f32, seed: u32) -> (f32, f32) {
    let wx1 = x + 48.0 * (fbm_2d(x, z, 3, 2.0, 0.5, 0.0035, seed.wrapping_add(SEED_WARP_X1)) - 0.5) * 2.0;
    let wz1 = z + 48.0 * (fbm_2d(x, z, 3, 2.0, 0.5, 0.0035, seed.wrapping_add(SEED_WARP_Z1)) - 0.5) * 2.0;
    let wx = wx1 + 14.0 * (fbm_2d(wx1, wz1, 2, 2.0, 0.5, 0.013, seed.wrapping_add(SEED_WARP_X2)) - 0.5) * 2.0;
    let wz = wz1 + 14.0 * (fbm_2d(wx1, wz1, 2, 2.0, 0.5, 0.013, seed.wrapping_add(SEED_WARP_Z2)) - 0.5) * 2.0;
    (wx, wz)
}

/// Continent field in `[0, 1]`; near zero over open ocean.
pub fn continent_01(wx: f32, wz: f32, seed: u32) -> f32 {
    fbm_2d(wx, wz, 5, 2.0, 0.5, 0.0016, seed.wrapping_add(SEED_CONTINENT)).powf(CONTINENT_EXP)
}

/// Terrain elevation for a column, in `[1, world_height - 2]`.
pub fn compute_height(x: i32, z: i32, cfg: &WorldConfig) -> i32 {
    let fx = x as f32;
    let fz = z as f32;
    let seed = cfg.seed;

    let (wx, wz) = warp(fx, fz, seed);

    let continent = continent_01(wx, wz, seed);
    let ridge = ridged_fbm_2d(wx, wz, 5, 2.0, 0.5, 0.006, seed.wrapping_add(SEED_RIDGE));
    let detail = fbm_2d(fx, fz, 4, 2.0, 0.5, 0.02, seed.wrapping_add(SEED_DETAIL));

    let mut h = CONTINENT_BLEND * continent + RIDGE_BLEND * ridge + DETAIL_BLEND * detail;

    // Warped-mode rivers notch the heightfield directly; flow-accumulation
    // carving happens later against the finished heightmap.
    if cfg.params.hydrology == HydrologyMode::Warped {
        h -= RIVER_CARVE * hydrology::river_mask_01(x, z, cfg);
    }

    h += gradient_noise_2d(fx * 0.11, fz * 0.11, seed.wrapping_add(SEED_JITTER)) * 0.008;

    // Columns on a weak continent sink below sea level.
    h -= (OCEAN_SHELF - continent).max(0.0) * OCEAN_BIAS;

    let h = smoothstep(h.clamp(0.0, 1.0));

    let world_h = cfg.world_height() as f32;
    let base = cfg.params.base_offset_frac * world_h;
    let relief = cfg.params.relief_frac * world_h;
    let y = (base + h * relief) as i32;
    y.clamp(1, cfg.world_height() - 2)
}
