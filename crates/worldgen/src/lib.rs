//! Deterministic, seed-driven voxel terrain generation.
//!
//! Everything in this crate is a pure function of coordinates, the world seed
//! and the immutable [`WorldConfig`]: the same inputs produce the same terrain
//! bit-for-bit, regardless of thread count or call order. That contract is
//! what lets chunks be generated independently by a worker pool and still
//! agree with a whole-world pass at every voxel.

pub mod biome;
pub mod caves;
pub mod chunk_gen;
pub mod config;
pub mod ctx;
pub mod flora;
pub mod height;
pub mod hydrology;
pub mod noise;
pub mod voxel;

pub use chunk_gen::{block_at, generate_chunk, generate_chunk_cells, generate_column, ColumnInfo};
pub use config::{ConfigError, GenParams, HydrologyMode, WorldConfig};
pub use ctx::GenContext;
pub use voxel::{Chunk, ChunkKey, Material, VoxelCell};
