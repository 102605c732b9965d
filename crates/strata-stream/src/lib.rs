//! Keeps the chunks around a moving viewpoint loaded, meshed, and cached.
#![forbid(unsafe_code)]

mod chunk;
pub mod config;
mod error;
mod stats;
mod streamer;

pub use chunk::Chunk;
pub use config::StreamConfig;
pub use error::StreamError;
pub use stats::{StreamStats, TickReport};
pub use streamer::ChunkStreamer;
