//! Chunk coordinates, world sizing, and the stand-in terrain source.
#![forbid(unsafe_code)]

mod chunk_coord;
mod gen_ctx;
mod world;
pub mod worldgen;

pub use chunk_coord::{ChunkCoord, LocalPos};
pub use gen_ctx::GenCtx;
pub use world::{World, WorldGenMode};

/// Edge length of a chunk in cells.
pub const CHUNK_SIZE: usize = 16;
/// Cells per chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;
/// Cells per chunk face.
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;
