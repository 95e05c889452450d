#![doc = include_str!("../README.md")]

pub mod base36;
pub mod block;
pub mod chunk;
mod error;
pub mod player;
pub mod plugin;
mod tag;
mod world;

pub use chunk::{Chunk, ChunkPos, CHUNK_HEIGHT, CHUNK_SIZE};
pub use error::WorldError;
pub use player::Player;
pub use plugin::{EntityFactory, Populator, Season};
pub use world::{ChunkHandle, World};
