//! Voxel cells, material kinds, chunk keys and the dense chunk container.

use glam::{IVec3, Vec3};

use crate::noise::fast_hash;

/// Every material the generator can emit. The discriminant is the id stored
/// in world files; `Air` is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Material {
    Air = 0,
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Sand = 4,
    Gravel = 5,
    Snow = 6,
    Water = 7,
    Trunk = 8,
    Leaves = 9,
    TallGrass = 10,
    IronOre = 11,
    CopperOre = 12,
    GoldOre = 13,
}

impl Material {
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Air,
            1 => Self::Stone,
            2 => Self::Dirt,
            3 => Self::Grass,
            4 => Self::Sand,
            5 => Self::Gravel,
            6 => Self::Snow,
            7 => Self::Water,
            8 => Self::Trunk,
            9 => Self::Leaves,
            10 => Self::TallGrass,
            11 => Self::IronOre,
            12 => Self::CopperOre,
            13 => Self::GoldOre,
            _ => return None,
        })
    }

    /// Physically solid: blocks movement and carries terrain.
    #[inline]
    pub fn is_solid(self) -> bool {
        !matches!(self, Self::Air | Self::Water | Self::TallGrass)
    }

    #[inline]
    pub fn is_water(self) -> bool {
        self == Self::Water
    }

    /// Flora may grow through these.
    #[inline]
    pub fn is_replaceable(self) -> bool {
        matches!(self, Self::Air | Self::TallGrass)
    }
}

/// One cell of the world grid: a material plus a small metadata byte
/// (rock strata band, flora variant). Material ids are opaque to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelCell {
    pub material: Material,
    pub meta: u8,
}

impl VoxelCell {
    pub const AIR: VoxelCell = VoxelCell {
        material: Material::Air,
        meta: 0,
    };

    #[inline]
    pub fn new(material: Material) -> Self {
        Self { material, meta: 0 }
    }

    #[inline]
    pub fn with_meta(material: Material, meta: u8) -> Self {
        Self { material, meta }
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.material == Material::Air
    }
}

/// Position of a chunk in chunk-grid coordinates. Plain value type, used as
/// a map key everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkKey {
    #[inline]
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    /// Well-mixed 32-bit spread of the key. Axis-aligned neighbours land far
    /// apart, unlike a plain xor of the components.
    #[inline]
    pub fn spread_hash(self, seed: u32) -> i32 {
        fast_hash(self.x, self.y, self.z, seed)
    }

    /// Squared horizontal (x/z) chunk distance to another key.
    #[inline]
    pub fn horizontal_dist_sq(self, other: ChunkKey) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }
}

impl From<IVec3> for ChunkKey {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// A generated chunk: dense `edge³` cell array plus its world-space minimum
/// corner. `any_solid` is true iff any cell is non-air; all-air chunks are
/// never attached to a scene.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub key: ChunkKey,
    pub edge: usize,
    pub min_corner: Vec3,
    pub voxel_size: f32,
    pub any_solid: bool,
    cells: Box<[VoxelCell]>,
}

impl Chunk {
    pub fn new(key: ChunkKey, edge: usize, min_corner: Vec3, voxel_size: f32) -> Self {
        Self {
            key,
            edge,
            min_corner,
            voxel_size,
            any_solid: false,
            cells: vec![VoxelCell::AIR; edge * edge * edge].into_boxed_slice(),
        }
    }

    pub fn from_cells(
        key: ChunkKey,
        edge: usize,
        min_corner: Vec3,
        voxel_size: f32,
        cells: Box<[VoxelCell]>,
        any_solid: bool,
    ) -> Self {
        debug_assert_eq!(cells.len(), edge * edge * edge);
        Self {
            key,
            edge,
            min_corner,
            voxel_size,
            any_solid,
            cells,
        }
    }

    #[inline]
    fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.edge + z * self.edge * self.edge
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> VoxelCell {
        self.cells[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, cell: VoxelCell) {
        let i = self.idx(x, y, z);
        self.cells[i] = cell;
        if !cell.is_air() {
            self.any_solid = true;
        }
    }

    #[inline]
    pub fn cells(&self) -> &[VoxelCell] {
        &self.cells
    }
}

/// Flat index into a chunk-local `edge³` slice.
#[inline]
pub fn cell_index(edge: usize, x: usize, y: usize, z: usize) -> usize {
    x + y * edge + z * edge * edge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_ids_round_trip() {
        for id in 0..=13u8 {
            let m = Material::from_id(id).unwrap();
            assert_eq!(m.id(), id);
        }
        assert!(Material::from_id(14).is_none());
        assert!(Material::from_id(255).is_none());
    }

    #[test]
    fn solidity_predicates() {
        assert!(!Material::Air.is_solid());
        assert!(!Material::Water.is_solid());
        assert!(!Material::TallGrass.is_solid());
        assert!(Material::Stone.is_solid());
        assert!(Material::Leaves.is_solid());
        assert!(Material::Air.is_replaceable());
        assert!(Material::TallGrass.is_replaceable());
        assert!(!Material::Sand.is_replaceable());
    }

    #[test]
    fn chunk_set_tracks_any_solid() {
        let mut c = Chunk::new(ChunkKey::new(0, 0, 0), 8, Vec3::ZERO, 1.0);
        assert!(!c.any_solid);
        c.set(1, 2, 3, VoxelCell::AIR);
        assert!(!c.any_solid);
        c.set(1, 2, 3, VoxelCell::new(Material::Water));
        assert!(c.any_solid);
        assert_eq!(c.get(1, 2, 3).material, Material::Water);
    }

    #[test]
    fn spread_hash_separates_axis_neighbours() {
        let a = ChunkKey::new(0, 0, 1).spread_hash(0);
        let b = ChunkKey::new(0, 1, 0).spread_hash(0);
        let c = ChunkKey::new(1, 0, 0).spread_hash(0);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }
}
