//! Cave carving and ore placement.

use crate::config::WorldConfig;
use crate::noise::{fast_hash, fbm_3d};
use crate::voxel::Material;

const SEED_CAVE: u32 = 503;
const SEED_ORE_MASK: u32 = 607;
const SEED_ORE_KIND: u32 = 613;

/// Solid shell kept intact directly under the surface so caves never open
/// pits in the terrain skin.
const SURFACE_SHELL: i32 = 4;
/// Base carve threshold at the surface shell; relaxes with depth.
const THRESHOLD_SURFACE: f32 = 0.62;
const THRESHOLD_DEPTH_RELAX: f32 = 0.14;
/// Below this elevation the noise gets a multiplicative boost, widening the
/// deep galleries near bedrock.
const BEDROCK_BOOST_Y: i32 = 6;
const BEDROCK_BOOST: f32 = 1.15;

/// Whether the voxel at (x, y, z) is carved out of the ground into a cavern.
pub fn should_carve(x: i32, y: i32, z: i32, ground: i32, cfg: &WorldConfig) -> bool {
    if y > ground - SURFACE_SHELL {
        return false;
    }
    if y <= 1 {
        return false;
    }
    let depth_frac = ((ground - y) as f32 / ground.max(1) as f32).clamp(0.0, 1.0);
    let threshold = THRESHOLD_SURFACE - THRESHOLD_DEPTH_RELAX * depth_frac;
    let mut n = fbm_3d(
        x as f32,
        y as f32,
        z as f32,
        3,
        2.0,
        0.5,
        0.045,
        cfg.seed.wrapping_add(SEED_CAVE),
    );
    if y < BEDROCK_BOOST_Y {
        n *= BEDROCK_BOOST;
    }
    n > threshold
}

/// Deterministic ore substitution for stone voxels: a hashed ~1/64 presence
/// mask and an independent hash for the variant. Never touches gameplay RNG.
pub fn try_ore_at(x: i32, y: i32, z: i32, cfg: &WorldConfig) -> Option<Material> {
    if y <= 0 {
        return None;
    }
    if fast_hash(x, y, z, cfg.seed.wrapping_add(SEED_ORE_MASK)) & 63 != 0 {
        return None;
    }
    Some(
        match (fast_hash(x, y, z, cfg.seed.wrapping_add(SEED_ORE_KIND)) as u32) % 3 {
            0 => Material::IronOre,
            1 => Material::CopperOre,
            _ => Material::GoldOre,
        },
    )
}
