//! The chunk store: a two-tier cache over the sharded on-disk world folder.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::RwLock;
use rand::Rng;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, warn};
use valence_nbt::{compound, Compound};

use crate::base36;
use crate::chunk::{Chunk, ChunkPos};
use crate::player::Player;
use crate::plugin::{EntityFactory, Populator, Season};
use crate::tag;
use crate::WorldError;

/// A shared, lockable chunk. The store keeps clean chunks only weakly; the
/// holder of a `ChunkHandle` is what keeps a clean cache entry alive.
pub type ChunkHandle = Arc<RwLock<Chunk>>;

/// A world on disk.
///
/// Worlds are composed of a level file and chunk files, each corresponding
/// to exactly one file under the world folder, plus saved player data.
pub struct World {
    folder: PathBuf,
    /// Terrain seed handed to every populator stage.
    pub seed: i64,
    /// Default spawn point.
    pub spawn: (i32, i32, i32),
    pipeline: Vec<Arc<dyn Populator>>,
    season: Option<Arc<dyn Season>>,
    factory: Arc<dyn EntityFactory>,
    state: Mutex<CacheState>,
}

struct CacheState {
    clean: CleanTier,
    dirty: HashMap<ChunkPos, ChunkHandle>,
    /// Coordinates with a load or population in flight. Later requesters
    /// subscribe and retry once the winner settles.
    loading: HashMap<ChunkPos, broadcast::Sender<()>>,
    saving: bool,
}

/// The clean half of the cache. Weak by default so an entry vanishes once
/// the last outside holder drops it; strong while a backup walks the disk
/// tree.
enum CleanTier {
    Weak(HashMap<ChunkPos, Weak<RwLock<Chunk>>>),
    Strong(HashMap<ChunkPos, ChunkHandle>),
}

impl CleanTier {
    fn get(&mut self, pos: ChunkPos) -> Option<ChunkHandle> {
        match self {
            CleanTier::Weak(map) => match map.get(&pos).and_then(Weak::upgrade) {
                Some(chunk) => Some(chunk),
                None => {
                    // The last holder is gone; drop the stale key.
                    map.remove(&pos);
                    None
                }
            },
            CleanTier::Strong(map) => map.get(&pos).cloned(),
        }
    }

    fn insert(&mut self, pos: ChunkPos, chunk: ChunkHandle) {
        match self {
            CleanTier::Weak(map) => {
                map.insert(pos, Arc::downgrade(&chunk));
            }
            CleanTier::Strong(map) => {
                map.insert(pos, chunk);
            }
        }
    }

    /// Drains every entry that is still alive.
    fn drain_live(&mut self) -> Vec<(ChunkPos, ChunkHandle)> {
        match self {
            CleanTier::Weak(map) => map
                .drain()
                .filter_map(|(pos, weak)| Some((pos, weak.upgrade()?)))
                .collect(),
            CleanTier::Strong(map) => map.drain().collect(),
        }
    }

    fn live_count(&self) -> usize {
        match self {
            CleanTier::Weak(map) => map.values().filter(|weak| weak.strong_count() > 0).count(),
            CleanTier::Strong(map) => map.len(),
        }
    }
}

impl World {
    /// Opens (or creates) the world stored in `folder`.
    ///
    /// Reads `level.dat` when it exists and is non-empty, then always
    /// rewrites it so the on-disk form is canonical. A fresh world gets a
    /// uniformly random non-negative 63-bit seed.
    pub async fn open(
        folder: impl Into<PathBuf>,
        pipeline: Vec<Arc<dyn Populator>>,
        season: Option<Arc<dyn Season>>,
        factory: Arc<dyn EntityFactory>,
    ) -> Result<Arc<Self>, WorldError> {
        let folder = folder.into();
        tokio::fs::create_dir_all(&folder).await?;

        let mut spawn = (0, 64, 0);
        let mut seed = rand::thread_rng().gen_range(0..i64::MAX);

        match load_tag(&folder.join("level.dat")).await {
            Ok(Some(root)) => {
                if let Some(data) = tag::compound(&root, "Data") {
                    if let Some(x) = tag::int(data, "SpawnX") {
                        spawn.0 = x;
                    }
                    if let Some(y) = tag::int(data, "SpawnY") {
                        spawn.1 = y;
                    }
                    if let Some(z) = tag::int(data, "SpawnZ") {
                        spawn.2 = z;
                    }
                    if let Some(s) = tag::long(data, "RandomSeed") {
                        seed = s;
                    }
                }
            }
            Ok(None) => {}
            Err(e) if e.is_corrupt() => {
                warn!(error = %e, "corrupt level.dat, rewriting with defaults");
            }
            Err(e) => return Err(e),
        }

        let world = Arc::new(Self {
            folder,
            seed,
            spawn,
            pipeline,
            season,
            factory,
            state: Mutex::new(CacheState {
                clean: CleanTier::Weak(HashMap::new()),
                dirty: HashMap::new(),
                loading: HashMap::new(),
                saving: true,
            }),
        });
        world.write_level().await?;

        Ok(world)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    async fn write_level(&self) -> Result<(), WorldError> {
        let root = compound! {
            "Data" => compound! {
                "SpawnX" => self.spawn.0,
                "SpawnY" => self.spawn.1,
                "SpawnZ" => self.spawn.2,
                "RandomSeed" => self.seed,
            },
        };
        save_tag(&self.folder.join("level.dat"), &root).await
    }

    /// Returns the chunk at `(x, z)`, loading or populating as needed.
    ///
    /// At most one load or population is in flight per coordinate;
    /// concurrent requesters wait for the winner and receive the same
    /// handle. The returned chunk is populated and its damage log is clear.
    pub async fn request_chunk(&self, x: i32, z: i32) -> Result<ChunkHandle, WorldError> {
        let pos = ChunkPos::new(x, z);

        loop {
            let mut pending = {
                let mut state = self.state.lock().await;

                if let Some(chunk) = state.dirty.get(&pos) {
                    return Ok(Arc::clone(chunk));
                }
                if let Some(chunk) = state.clean.get(pos) {
                    return Ok(chunk);
                }

                match state.loading.get(&pos) {
                    Some(tx) => tx.subscribe(),
                    None => {
                        let (tx, _) = broadcast::channel(1);
                        state.loading.insert(pos, tx);
                        break;
                    }
                }
            };

            // Another task owns this coordinate. Wait for it to settle, then
            // look again; a failed attempt leaves nothing cached and we
            // become the next winner.
            let _ = pending.recv().await;
        }

        let result = self.load_or_populate(pos).await;

        let mut state = self.state.lock().await;
        let pending = state.loading.remove(&pos);
        if let Ok((chunk, fresh)) = &result {
            if *fresh {
                state.dirty.insert(pos, Arc::clone(chunk));
            } else {
                state.clean.insert(pos, Arc::clone(chunk));
            }
        }
        drop(state);

        if let Some(tx) = pending {
            let _ = tx.send(());
        }

        result.map(|(chunk, _)| chunk)
    }

    /// Loads `pos` from disk or runs the populator pipeline over it. Returns
    /// the handle and whether it was freshly populated (and so dirty).
    async fn load_or_populate(&self, pos: ChunkPos) -> Result<(ChunkHandle, bool), WorldError> {
        let mut chunk = Chunk::new(pos);

        match load_tag(&self.chunk_path(pos).await?).await {
            Ok(Some(root)) => {
                if let Err(e) = chunk.load_from_tag(&root) {
                    warn!(x = pos.x, z = pos.z, error = %e, "malformed chunk file, regenerating");
                    chunk = Chunk::new(pos);
                }
            }
            Ok(None) => {}
            Err(e) if e.is_corrupt() => {
                warn!(x = pos.x, z = pos.z, error = %e, "corrupt chunk file, regenerating");
            }
            Err(e) => return Err(e),
        }

        let fresh = !chunk.populated;
        if fresh {
            for stage in &self.pipeline {
                stage
                    .populate(&mut chunk, self.seed)
                    .await
                    .map_err(|source| WorldError::Populator {
                        stage: stage.name(),
                        source,
                    })?;
            }

            chunk.regenerate();
            chunk.populated = true;
            chunk.dirty = true;
            debug!(x = pos.x, z = pos.z, "populated chunk");
        }

        if let Some(season) = &self.season {
            season.transform(&mut chunk);
        }

        // Nobody has seen this chunk yet, so no damage can be meaningful.
        chunk.clear_damage();

        Ok((Arc::new(RwLock::new(chunk)), fresh))
    }

    /// Writes `chunk` to disk if it is dirty and saving is enabled.
    /// Idempotent: a clean chunk is a no-op.
    pub async fn save_chunk(&self, chunk: &ChunkHandle) -> Result<(), WorldError> {
        let saving = self.state.lock().await.saving;
        self.write_chunk(chunk, saving).await
    }

    /// The write itself, with the saving flag already sampled so the flush
    /// loop can call this while holding the tier lock.
    ///
    /// The dirty flag is cleared before the write begins; a modification
    /// landing mid-write re-marks the chunk for the next flush, and on
    /// failure the flag is restored so the write is retried.
    async fn write_chunk(&self, chunk: &ChunkHandle, saving: bool) -> Result<(), WorldError> {
        if !saving {
            return Ok(());
        }

        let (pos, root) = {
            let mut chunk = chunk.write();
            if !chunk.dirty {
                return Ok(());
            }

            chunk.dirty = false;
            (chunk.pos(), chunk.to_tag())
        };

        let result = async {
            let path = self.chunk_path(pos).await?;
            save_tag(&path, &root).await
        }
        .await;

        if result.is_err() {
            chunk.write().dirty = true;
        }

        result
    }

    /// One tick of the cache maintenance loop.
    ///
    /// Reclassifies every live cache entry between the tiers and writes out
    /// at most one dirty chunk, bounding disk traffic per tick. Chunks left
    /// dirty stay strongly held so they cannot be collected before they are
    /// written.
    pub async fn sort_chunks(&self) {
        let mut state = self.state.lock().await;
        let saving = state.saving;

        let mut all: Vec<(ChunkPos, ChunkHandle)> = state.dirty.drain().collect();
        all.extend(state.clean.drain_live());

        let mut first = true;
        for (pos, chunk) in all {
            let mut is_dirty = chunk.read().dirty;

            if is_dirty && first {
                first = false;
                if let Err(e) = self.write_chunk(&chunk, saving).await {
                    error!(x = pos.x, z = pos.z, error = %e, "failed to flush chunk");
                }
                is_dirty = chunk.read().dirty;
            }

            if is_dirty {
                state.dirty.insert(pos, chunk);
            } else {
                state.clean.insert(pos, chunk);
            }
        }
    }

    /// Spawns the 1 Hz cache maintenance loop.
    pub fn spawn_flush_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let world = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                world.sort_chunks().await;
            }
        })
    }

    /// Stops disk writes and strengthens the clean tier, so an external
    /// backup can walk the world folder while the server keeps running and
    /// the cache stays stable. Idempotent.
    pub async fn save_off(&self) {
        let mut state = self.state.lock().await;
        if !state.saving {
            return;
        }

        state.saving = false;
        let live: HashMap<_, _> = state.clean.drain_live().into_iter().collect();
        state.clean = CleanTier::Strong(live);
    }

    /// Re-enables disk writes and lets the clean tier weaken again, so
    /// unreferenced entries can be reclaimed. Idempotent.
    pub async fn save_on(&self) {
        let mut state = self.state.lock().await;
        if state.saving {
            return;
        }

        state.saving = true;
        let live = state.clean.drain_live();
        let mut tier = CleanTier::Weak(HashMap::with_capacity(live.len()));
        for (pos, chunk) in live {
            tier.insert(pos, chunk);
        }
        state.clean = tier;
    }

    /// Whether the store is currently willing to write to disk.
    pub async fn saving(&self) -> bool {
        self.state.lock().await.saving
    }

    /// Live `(clean, dirty)` cache entry counts.
    pub async fn cache_sizes(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.clean.live_count(), state.dirty.len())
    }

    /// Loads the player named `username`, falling back to a factory-fresh
    /// entity at spawn when no usable data exists on disk.
    pub async fn load_player(&self, username: &str) -> Result<Player, WorldError> {
        let mut player = self.factory.create_player(username, self.spawn);

        match load_tag(&self.player_path(username).await?).await {
            Ok(Some(root)) => player.load_from_tag(&root),
            Ok(None) => {}
            Err(e) if e.is_corrupt() => {
                warn!(username, error = %e, "corrupt player file, spawning fresh");
            }
            Err(e) => return Err(e),
        }

        Ok(player)
    }

    pub async fn save_player(&self, username: &str, player: &Player) -> Result<(), WorldError> {
        if !self.saving().await {
            return Ok(());
        }

        let path = self.player_path(username).await?;
        save_tag(&path, &player.to_tag()).await
    }

    /// `<folder>/<b36(x & 63)>/<b36(z & 63)>/c.<b36(x)>.<b36(z)>.dat`,
    /// creating the shard directories.
    async fn chunk_path(&self, pos: ChunkPos) -> Result<PathBuf, WorldError> {
        let dir = self
            .folder
            .join(base36::encode(i64::from(pos.x & 63)))
            .join(base36::encode(i64::from(pos.z & 63)));
        tokio::fs::create_dir_all(&dir).await?;

        Ok(dir.join(format!(
            "c.{}.{}.dat",
            base36::encode(i64::from(pos.x)),
            base36::encode(i64::from(pos.z))
        )))
    }

    async fn player_path(&self, username: &str) -> Result<PathBuf, WorldError> {
        let dir = self.folder.join("players");
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir.join(format!("{username}.dat")))
    }
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads a gzip-compressed named-tag file. `Ok(None)` when the file is
/// absent or empty; plain uncompressed tag data is tolerated.
async fn load_tag(path: &Path) -> Result<Option<Compound>, WorldError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if bytes.is_empty() {
        return Ok(None);
    }

    let raw = if bytes.starts_with(&GZIP_MAGIC) {
        let mut raw = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut raw)
            .map_err(|_| WorldError::BadCompression)?;
        raw
    } else {
        bytes
    };

    let mut slice = raw.as_slice();
    let (root, _) = valence_nbt::from_binary::<String>(&mut slice)?;
    Ok(Some(root))
}

async fn save_tag(path: &Path, root: &Compound) -> Result<(), WorldError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    valence_nbt::to_binary(root, &mut encoder, "")?;
    let bytes = encoder.finish()?;

    tokio::fs::write(path, bytes).await?;
    Ok(())
}
