//! Whole-world binary snapshots.
//!
//! Layout, all integers little-endian i32:
//!   magic `VG01` (4 bytes), then dimensions nx ny nz, then nx*ny*nz
//!   records of (material, meta), x outermost, y middle, z innermost.
//!
//! Loading validates the header against the active configuration before
//! touching any record, so a wrong file fails fast instead of producing a
//! half-loaded world.

use glam::IVec3;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use worldgen::voxel::cell_index;
use worldgen::{generate_column, GenContext, Material, VoxelCell, WorldConfig};

use crate::error::WorldFileError;

pub const WORLD_MAGIC: [u8; 4] = *b"VG01";

pub fn save_world(path: &Path, ctx: &GenContext) -> Result<(), WorldFileError> {
    let file = File::create(path)?;
    save_world_to(BufWriter::new(file), ctx)
}

/// Generate and write the whole world. Works one x-slab at a time, columns
/// within the slab generated in parallel, so peak memory is one ny*nz plane
/// regardless of world size and the byte stream stays deterministic.
pub fn save_world_to<W: Write>(mut w: W, ctx: &GenContext) -> Result<(), WorldFileError> {
    let size = ctx.cfg.world_size();
    w.write_all(&WORLD_MAGIC)?;
    for d in [size.x, size.y, size.z] {
        w.write_all(&d.to_le_bytes())?;
    }

    let (ny, nz) = (size.y as usize, size.z as usize);
    for x in 0..size.x {
        let columns: Vec<Vec<VoxelCell>> = (0..size.z)
            .into_par_iter()
            .map(|z| generate_column(x, z, ctx))
            .collect();
        let mut plane = vec![VoxelCell::AIR; ny * nz];
        for (z, column) in columns.into_iter().enumerate() {
            for (y, cell) in column.into_iter().enumerate() {
                plane[y * nz + z] = cell;
            }
        }
        for cell in &plane {
            w.write_all(&(cell.material.id() as i32).to_le_bytes())?;
            w.write_all(&(cell.meta as i32).to_le_bytes())?;
        }
        if x % 64 == 0 {
            tracing::debug!(x, total = size.x, "world export progress");
        }
    }
    w.flush()?;
    Ok(())
}

pub fn load_world(path: &Path, cfg: &WorldConfig) -> Result<WorldVolume, WorldFileError> {
    let file = File::open(path)?;
    load_world_from(BufReader::new(file), cfg)
}

pub fn load_world_from<R: Read>(mut r: R, cfg: &WorldConfig) -> Result<WorldVolume, WorldFileError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != WORLD_MAGIC {
        return Err(WorldFileError::BadMagic(magic));
    }

    let nx = read_i32(&mut r)?;
    let ny = read_i32(&mut r)?;
    let nz = read_i32(&mut r)?;
    if nx <= 0 || ny <= 0 || nz <= 0 {
        return Err(WorldFileError::BadDimensions(nx, ny, nz));
    }
    let found = IVec3::new(nx, ny, nz);
    let expected = cfg.world_size();
    if found != expected {
        return Err(WorldFileError::DimensionMismatch { expected, found });
    }

    let total = (nx as u64) * (ny as u64) * (nz as u64);
    let mut cells = Vec::with_capacity(total as usize);
    for record in 0..total {
        let material = read_i32(&mut r)?;
        let meta = read_i32(&mut r)?;
        let material = u8::try_from(material)
            .ok()
            .and_then(Material::from_id)
            .ok_or(WorldFileError::UnknownMaterial(material, record))?;
        let meta = u8::try_from(meta).map_err(|_| WorldFileError::MetaOutOfRange(meta, record))?;
        cells.push(VoxelCell::with_meta(material, meta));
    }

    Ok(WorldVolume { size: found, cells })
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32, WorldFileError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// A fully materialized world loaded from a snapshot.
pub struct WorldVolume {
    size: IVec3,
    cells: Vec<VoxelCell>,
}

impl WorldVolume {
    #[inline]
    pub fn size(&self) -> IVec3 {
        self.size
    }

    /// Cell at a world grid position; air outside the bounds.
    pub fn cell_at(&self, x: i32, y: i32, z: i32) -> VoxelCell {
        if x < 0 || y < 0 || z < 0 || x >= self.size.x || y >= self.size.y || z >= self.size.z {
            return VoxelCell::AIR;
        }
        let i = ((x as usize * self.size.y as usize) + y as usize) * self.size.z as usize
            + z as usize;
        self.cells[i]
    }

    /// Extract one chunk's cells in chunk storage order, plus the solid flag.
    pub fn chunk_cells(&self, key: worldgen::ChunkKey, edge: usize) -> (Box<[VoxelCell]>, bool) {
        let base = key.as_ivec3() * edge as i32;
        let mut cells = vec![VoxelCell::AIR; edge * edge * edge].into_boxed_slice();
        let mut any_solid = false;
        for lx in 0..edge {
            for ly in 0..edge {
                for lz in 0..edge {
                    let cell =
                        self.cell_at(base.x + lx as i32, base.y + ly as i32, base.z + lz as i32);
                    if !cell.is_air() {
                        cells[cell_index(edge, lx, ly, lz)] = cell;
                        any_solid = true;
                    }
                }
            }
        }
        (cells, any_solid)
    }
}
