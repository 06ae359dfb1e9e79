//! World snapshot format: round trips and corruption handling.

use chunk_stream::{load_world_from, save_world_to, WorldFileError, WORLD_MAGIC};
use glam::{IVec3, Vec3};
use std::io::Cursor;
use std::sync::Arc;
use worldgen::{block_at, generate_chunk_cells, ChunkKey, GenContext, GenParams, WorldConfig};

fn tiny_cfg(chunks: IVec3) -> WorldConfig {
    WorldConfig::new(
        8,
        chunks,
        1,
        Vec3::ZERO,
        1.0,
        23,
        GenParams::default(),
    )
    .unwrap()
}

fn saved_bytes(cfg: &WorldConfig) -> Vec<u8> {
    let ctx = GenContext::new(Arc::new(cfg.clone()));
    let mut buf = Vec::new();
    save_world_to(&mut buf, &ctx).unwrap();
    buf
}

#[test]
fn round_trip_reproduces_the_generator() {
    let cfg = tiny_cfg(IVec3::new(2, 2, 2));
    let ctx = GenContext::new(Arc::new(cfg.clone()));
    let bytes = saved_bytes(&cfg);

    let expected_len = 16 + 16 * 16 * 16 * 8;
    assert_eq!(bytes.len(), expected_len);
    assert_eq!(&bytes[..4], &WORLD_MAGIC);

    let volume = load_world_from(Cursor::new(&bytes), &cfg).unwrap();
    assert_eq!(volume.size(), cfg.world_size());

    for (x, y, z) in [(0, 0, 0), (5, 3, 9), (15, 15, 15), (8, 7, 2), (3, 12, 14)] {
        assert_eq!(
            volume.cell_at(x, y, z),
            block_at(x, y, z, &ctx),
            "mismatch at ({x}, {y}, {z})"
        );
    }

    // A chunk sliced out of the volume equals one generated directly.
    for key in [ChunkKey::new(0, 0, 0), ChunkKey::new(1, 1, 0)] {
        let (from_volume, solid_v) = volume.chunk_cells(key, cfg.chunk_edge);
        let (from_gen, solid_g) = generate_chunk_cells(key, &ctx);
        assert_eq!(from_volume, from_gen);
        assert_eq!(solid_v, solid_g);
    }
}

#[test]
fn out_of_bounds_reads_are_air() {
    let cfg = tiny_cfg(IVec3::new(2, 2, 2));
    let bytes = saved_bytes(&cfg);
    let volume = load_world_from(Cursor::new(&bytes), &cfg).unwrap();
    assert!(volume.cell_at(-1, 0, 0).is_air());
    assert!(volume.cell_at(0, 16, 0).is_air());
    assert!(volume.cell_at(0, 0, 99).is_air());
}

#[test]
fn rejects_bad_magic() {
    let cfg = tiny_cfg(IVec3::new(2, 2, 2));
    let mut bytes = saved_bytes(&cfg);
    bytes[0] = b'X';
    let err = load_world_from(Cursor::new(&bytes), &cfg).map(|_| ()).unwrap_err();
    assert!(matches!(err, WorldFileError::BadMagic([b'X', ..])));
}

#[test]
fn rejects_dimension_mismatch_before_reading_records() {
    let cfg = tiny_cfg(IVec3::new(2, 2, 2));
    let bytes = saved_bytes(&cfg);
    let other_cfg = tiny_cfg(IVec3::new(3, 2, 2));
    let err = load_world_from(Cursor::new(&bytes), &other_cfg)
        .map(|_| ())
        .unwrap_err();
    match err {
        WorldFileError::DimensionMismatch { expected, found } => {
            assert_eq!(expected, other_cfg.world_size());
            assert_eq!(found, cfg.world_size());
        }
        other => panic!("expected DimensionMismatch, got {other:?}"),
    }
}

#[test]
fn rejects_degenerate_dimensions() {
    let cfg = tiny_cfg(IVec3::new(2, 2, 2));
    let mut bytes = saved_bytes(&cfg);
    bytes[4..8].copy_from_slice(&0i32.to_le_bytes());
    assert!(matches!(
        load_world_from(Cursor::new(&bytes), &cfg),
        Err(WorldFileError::BadDimensions(0, _, _))
    ));
}

#[test]
fn truncated_file_is_an_io_error() {
    let cfg = tiny_cfg(IVec3::new(2, 2, 2));
    let bytes = saved_bytes(&cfg);
    let cut = &bytes[..bytes.len() / 2];
    assert!(matches!(
        load_world_from(Cursor::new(cut), &cfg),
        Err(WorldFileError::Io(_))
    ));
}

#[test]
fn rejects_unknown_material_and_bad_meta() {
    let cfg = tiny_cfg(IVec3::new(2, 2, 2));
    let bytes = saved_bytes(&cfg);

    // Record 5: material at byte 16 + 5*8, meta 4 bytes later.
    let mut corrupt = bytes.clone();
    corrupt[16 + 5 * 8..16 + 5 * 8 + 4].copy_from_slice(&200i32.to_le_bytes());
    assert!(matches!(
        load_world_from(Cursor::new(&corrupt), &cfg),
        Err(WorldFileError::UnknownMaterial(200, 5))
    ));

    let mut corrupt = bytes;
    corrupt[16 + 5 * 8 + 4..16 + 5 * 8 + 8].copy_from_slice(&300i32.to_le_bytes());
    assert!(matches!(
        load_world_from(Cursor::new(&corrupt), &cfg),
        Err(WorldFileError::MetaOutOfRange(300, 5))
    ));
}
