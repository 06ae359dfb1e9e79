//! World file error taxonomy.

use glam::IVec3;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldFileError {
    #[error("world file io: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a world file (magic {0:02x?})")]
    BadMagic([u8; 4]),

    #[error("world file declares degenerate dimensions {0}x{1}x{2}")]
    BadDimensions(i32, i32, i32),

    #[error("world file is {found}, configuration expects {expected}")]
    DimensionMismatch { expected: IVec3, found: IVec3 },

    #[error("unknown material id {0} in record {1}")]
    UnknownMaterial(i32, u64),

    #[error("meta value {0} out of range in record {1}")]
    MetaOutOfRange(i32, u64),
}
