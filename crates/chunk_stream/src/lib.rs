//! Concurrent chunk streaming around a moving observer.
//!
//! A [`ChunkStreamManager`] watches the observer, keeps the chunks within
//! view resident via a background generation pool, parks chunks that leave
//! the view in a bounded LRU cache, and hands visibility changes to a
//! [`SceneSink`]. World snapshots can be saved to and loaded from a simple
//! binary format.

pub mod cache;
pub mod error;
pub mod job;
pub mod manager;
pub mod view;
pub mod world_file;

pub use cache::DetachedCache;
pub use error::WorldFileError;
pub use job::{ChunkSource, GenOutcome, GenPipeline, GenStats};
pub use manager::{ChunkStreamManager, SceneSink, StreamConfig, StreamStats};
pub use view::{ViewChange, ViewTracker};
pub use world_file::{load_world, load_world_from, save_world, save_world_to, WorldVolume, WORLD_MAGIC};
