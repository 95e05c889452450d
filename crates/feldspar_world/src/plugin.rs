//! The interfaces the store exposes to plugins.

use async_trait::async_trait;

use crate::chunk::Chunk;
use crate::player::Player;

/// One stage of the terrain generation pipeline.
///
/// Stages run in pipeline order over a freshly constructed chunk and may
/// suspend. A failing stage aborts the request; the chunk is not cached, so
/// a later request retries the whole pipeline.
#[async_trait]
pub trait Populator: Send + Sync {
    /// Stage name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Fills `chunk` with terrain derived from `seed`.
    async fn populate(&self, chunk: &mut Chunk, seed: i64) -> anyhow::Result<()>;
}

/// An optional transform applied uniformly to every chunk after it is loaded
/// or populated.
pub trait Season: Send + Sync {
    fn transform(&self, chunk: &mut Chunk);
}

/// Creates the entities the store materialises from disk.
pub trait EntityFactory: Send + Sync {
    /// A fresh player standing at the world spawn.
    fn create_player(&self, username: &str, spawn: (i32, i32, i32)) -> Player;
}
