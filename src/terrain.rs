//! The stock populator pipeline, the winter season and the player factory.

use async_trait::async_trait;
use feldspar_world::{
    block, Chunk, EntityFactory, Player, Populator, Season, CHUNK_HEIGHT, CHUNK_SIZE,
};
use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Water level for freshly generated terrain.
const SEA_LEVEL: usize = 64;

/// Rolling height-map terrain: a bedrock floor, a stone body, a dirt cap,
/// grass or sand at the surface, water filled up to sea level.
pub struct TerrainPopulator;

#[async_trait]
impl Populator for TerrainPopulator {
    fn name(&self) -> &'static str {
        "terrain"
    }

    async fn populate(&self, chunk: &mut Chunk, seed: i64) -> anyhow::Result<()> {
        let noise = Perlin::new(seed as u32);
        let pos = chunk.pos();

        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let wx = f64::from(pos.x) * 16.0 + x as f64;
                let wz = f64::from(pos.z) * 16.0 + z as f64;

                let rolling = noise.get([wx / 64.0, wz / 64.0]);
                let detail = noise.get([wx / 16.0, wz / 16.0]);
                let height = (SEA_LEVEL as f64 + rolling * 12.0 + detail * 3.0)
                    .clamp(1.0, (CHUNK_HEIGHT - 1) as f64) as usize;

                chunk.set_block(x, 0, z, block::BEDROCK);
                let dirt_start = height.saturating_sub(3).max(1);
                for y in 1..dirt_start {
                    chunk.set_block(x, y, z, block::STONE);
                }
                for y in dirt_start..height {
                    chunk.set_block(x, y, z, block::DIRT);
                }

                let surface = if height <= SEA_LEVEL {
                    block::SAND
                } else {
                    block::GRASS
                };
                chunk.set_block(x, height, z, surface);

                for y in (height + 1)..=SEA_LEVEL {
                    chunk.set_block(x, y, z, block::SPRING);
                }
            }
        }

        Ok(())
    }
}

/// Scatters small coal, iron and gold pockets through the stone body.
pub struct OrePopulator;

#[async_trait]
impl Populator for OrePopulator {
    fn name(&self) -> &'static str {
        "ore"
    }

    async fn populate(&self, chunk: &mut Chunk, seed: i64) -> anyhow::Result<()> {
        let pos = chunk.pos();
        // One deterministic rng stream per chunk, derived from the world
        // seed.
        let stream = (seed as u64)
            ^ (pos.x as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
            ^ (pos.z as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f);
        let mut rng = StdRng::seed_from_u64(stream);

        const POCKET: [(usize, usize, usize); 4] = [(0, 0, 0), (1, 0, 0), (0, 1, 0), (0, 0, 1)];

        for (ore, pockets, max_y) in [
            (block::COAL_ORE, 8, 100),
            (block::IRON_ORE, 5, 56),
            (block::GOLD_ORE, 2, 30),
        ] {
            for _ in 0..pockets {
                let ox = rng.gen_range(0..CHUNK_SIZE);
                let oz = rng.gen_range(0..CHUNK_SIZE);
                let oy = rng.gen_range(1..max_y);

                for (dx, dy, dz) in POCKET {
                    let (x, y, z) = (ox + dx, oy + dy, oz + dz);
                    if x < CHUNK_SIZE
                        && y < CHUNK_HEIGHT
                        && z < CHUNK_SIZE
                        && chunk.block(x, y, z) == block::STONE
                    {
                        chunk.set_block(x, y, z, ore);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Winter: snow on every exposed surface, ice over open water.
pub struct Winter;

impl Season for Winter {
    fn transform(&self, chunk: &mut Chunk) {
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let y = chunk.height_at(x, z);
                match chunk.block(x, y, z) {
                    block::SPRING | block::WATER => chunk.set_block(x, y, z, block::ICE),
                    block::GRASS | block::DIRT | block::SAND | block::STONE
                        if y + 1 < CHUNK_HEIGHT =>
                    {
                        chunk.set_block(x, y + 1, z, block::SNOW);
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Creates player entities standing at the spawn column.
pub struct PlayerFactory;

impl EntityFactory for PlayerFactory {
    fn create_player(&self, username: &str, spawn: (i32, i32, i32)) -> Player {
        let (x, y, z) = spawn;
        Player {
            username: username.into(),
            x: f64::from(x) + 0.5,
            y: f64::from(y),
            z: f64::from(z) + 0.5,
            stance: f64::from(y) + 1.62,
            rotation: 0.0,
            pitch: 0.0,
            on_ground: true,
        }
    }
}
