//! Sea level, rivers and lakes.
//!
//! Two river strategies exist behind [`HydrologyMode`]: a per-column warped
//! noise band that any chunk worker can evaluate in isolation, and a global
//! flow-accumulation pass that routes drainage over the finished heightmap.
//! A world uses exactly one of them, chosen in the immutable config.

use rayon::prelude::*;

use crate::config::WorldConfig;
use crate::height::compute_height;
use crate::noise::fbm_2d;

const SEED_RIVER: u32 = 211;
const SEED_RIVER_WARP_X: u32 = 401;
const SEED_RIVER_WARP_Z: u32 = 433;
const SEED_LAKE: u32 = 307;

/// Signal-space half width of the carve mask around a river centerline.
const MASK_BAND: f32 = 0.06;
/// Extra channel depth below the local terrain, scaled by the mask.
const BED_DEPTH_BASE: i32 = 2;
const BED_DEPTH_SCALE: f32 = 3.0;
/// Water depth of a river channel above its bed.
const CHANNEL_DEPTH: i32 = 2;

/// Configured water level clamped into a sane fraction of world height.
#[inline]
pub fn effective_sea_level(cfg: &WorldConfig) -> i32 {
    let wh = cfg.world_height();
    cfg.sea_level().clamp(wh / 8, wh / 2)
}

/// Continuous centerline signal in `[-1, 1]`; rivers run along its zero set.
pub fn river_center_signal(x: i32, z: i32, cfg: &WorldConfig) -> f32 {
    let fx = x as f32;
    let fz = z as f32;
    let seed = cfg.seed;
    let wx = fx
        + 30.0 * (fbm_2d(fx, fz, 2, 2.0, 0.5, 0.006, seed.wrapping_add(SEED_RIVER_WARP_X)) - 0.5) * 2.0;
    let wz = fz
        + 30.0 * (fbm_2d(fx, fz, 2, 2.0, 0.5, 0.006, seed.wrapping_add(SEED_RIVER_WARP_Z)) - 0.5) * 2.0;
    2.0 * fbm_2d(wx, wz, 3, 2.0, 0.5, 0.0045, seed.wrapping_add(SEED_RIVER)) - 1.0
}

/// Narrow-band river mask in `[0, 1]`, 1 on the centerline.
pub fn river_mask_01(x: i32, z: i32, cfg: &WorldConfig) -> f32 {
    let s = river_center_signal(x, z, cfg).abs();
    let m = (1.0 - s / MASK_BAND).clamp(0.0, 1.0);
    m * m
}

/// Columns flatter than this carry no channel; where the signal hovers near
/// zero with no direction there is no centerline to be near.
const MIN_CORE_GRADIENT: f32 = 0.01;

/// Whether a column sits inside the river channel proper.
///
/// The centerline signal steepens or flattens with the underlying noise, so
/// a fixed signal threshold would give wildly varying widths in world units.
/// Scaling the acceptance band by the local gradient magnitude (central
/// differences) keeps the channel close to `target_width` columns across.
/// The band is capped at `MASK_BAND` in signal space and rejected outright
/// on near-flat signal, so broad flat valleys cannot balloon into channel.
pub fn in_river_core(x: i32, z: i32, target_width: f32, cfg: &WorldConfig) -> bool {
    let s = river_center_signal(x, z, cfg);
    if s.abs() >= MASK_BAND {
        return false;
    }
    let gx = (river_center_signal(x + 1, z, cfg) - river_center_signal(x - 1, z, cfg)) * 0.5;
    let gz = (river_center_signal(x, z + 1, cfg) - river_center_signal(x, z - 1, cfg)) * 0.5;
    let gmag = (gx * gx + gz * gz).sqrt();
    if gmag < MIN_CORE_GRADIENT {
        return false;
    }
    s.abs() <= 0.5 * target_width * gmag
}

/// Carved channel floor for a river column.
pub fn river_bed_y(x: i32, z: i32, ground: i32, cfg: &WorldConfig) -> i32 {
    let depth = BED_DEPTH_BASE + (BED_DEPTH_SCALE * river_mask_01(x, z, cfg)) as i32;
    (ground - depth).max(2)
}

/// Water surface of a river channel; never above the local terrain.
#[inline]
pub fn river_surface_y(ground: i32, bed: i32) -> i32 {
    (bed + CHANNEL_DEPTH).min(ground).max(bed)
}

/// Candidate flat water table. Biased below sea level so most terrain has
/// none; rare noise peaks push it above, where it can form hill lakes.
pub fn lake_table_height(x: i32, z: i32, cfg: &WorldConfig) -> i32 {
    let l = fbm_2d(
        x as f32,
        z as f32,
        3,
        2.0,
        0.5,
        0.002,
        cfg.seed.wrapping_add(SEED_LAKE),
    );
    effective_sea_level(cfg) + ((l - 0.68) * 40.0) as i32
}

/// Local still-water surface: the higher of sea level and an accepted lake
/// table. A lake is only accepted over low, flat terrain shallowly below the
/// candidate table.
pub fn water_surface_at(x: i32, z: i32, ground: i32, slope: i32, cfg: &WorldConfig) -> i32 {
    let sea = effective_sea_level(cfg);
    let lake = lake_table_height(x, z, cfg);
    if lake > sea && slope <= 1 && ground < lake && ground >= lake - 4 {
        lake
    } else {
        sea
    }
}

/// Whole-world drainage field for [`HydrologyMode::FlowAccumulation`].
///
/// Every column routes to its steepest-descent 8-neighbour; processing
/// columns from highest to lowest accumulates upstream contributing area in
/// one sweep. Columns whose accumulated flow exceeds the configured
/// threshold are carved proportionally to the excess, capped.
#[derive(Debug)]
pub struct FlowField {
    nx: i32,
    nz: i32,
    carve: Vec<u8>,
}

const MAX_FLOW_CARVE: f32 = 5.0;

impl FlowField {
    pub fn build(cfg: &WorldConfig) -> Self {
        let size = cfg.world_size();
        let (nx, nz) = (size.x, size.z);
        let n = (nx as usize) * (nz as usize);

        let mut heights = vec![0i32; n];
        heights
            .par_chunks_mut(nz as usize)
            .enumerate()
            .for_each(|(ix, row)| {
                for (iz, h) in row.iter_mut().enumerate() {
                    *h = compute_height(ix as i32, iz as i32, cfg);
                }
            });

        // Highest first, ties broken by index so the order is deterministic.
        let mut order: Vec<u32> = (0..n as u32).collect();
        order.sort_unstable_by_key(|&i| (-heights[i as usize], i));

        let mut flow = vec![1.0f32; n];
        for &i in &order {
            let i = i as usize;
            let ix = i as i32 / nz;
            let iz = i as i32 % nz;
            let mut best: Option<(usize, i32)> = None;
            for (dx, dz) in [
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ] {
                let (jx, jz) = (ix + dx, iz + dz);
                if jx < 0 || jz < 0 || jx >= nx || jz >= nz {
                    continue;
                }
                let j = (jx * nz + jz) as usize;
                let drop = heights[i] - heights[j];
                if drop > 0 && best.map_or(true, |(_, d)| drop > d) {
                    best = Some((j, drop));
                }
            }
            if let Some((j, _)) = best {
                flow[j] += flow[i];
            }
        }

        let threshold = cfg.params.flow_threshold.max(1.0);
        let carve = flow
            .iter()
            .map(|&f| {
                let excess = f - threshold;
                if excess <= 0.0 {
                    0
                } else {
                    (1.0 + (excess / threshold).sqrt() * 2.0).min(MAX_FLOW_CARVE) as u8
                }
            })
            .collect();

        Self { nx, nz, carve }
    }

    /// Carve depth at a column; zero outside the world bounds.
    #[inline]
    pub fn carve_at(&self, x: i32, z: i32) -> i32 {
        if x < 0 || z < 0 || x >= self.nx || z >= self.nz {
            return 0;
        }
        self.carve[(x * self.nz + z) as usize] as i32
    }

    /// A column is river channel when any flow carving applies to it.
    #[inline]
    pub fn is_river(&self, x: i32, z: i32) -> bool {
        self.carve_at(x, z) > 0
    }
}
