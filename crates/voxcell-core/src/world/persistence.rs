use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::IVec3;
use serde::{Deserialize, Serialize};

use super::chunk::Chunk;
use crate::simulation::{CHUNK_VOLUME, Fire};

/// World metadata stored in world.meta file (RON format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMetadata {
    pub version: u32,
    /// Smallest chunk coordinate of the grid
    pub origin: IVec3,
    /// Chunks per axis
    pub extent: IVec3,
    pub voxel_size: f32,
    pub tick_count: u64,
    pub created_at: String,
    pub last_saved: String,

    /// Live fires; cells keep only the handle
    #[serde(default)]
    pub fires: Vec<Fire>,
}

impl WorldMetadata {
    pub const VERSION: u32 = 1;

    pub fn new(origin: IVec3, extent: IVec3, voxel_size: f32) -> Self {
        let now = chrono::Local::now().to_rfc3339();
        Self {
            version: Self::VERSION,
            origin,
            extent,
            voxel_size,
            tick_count: 0,
            created_at: now.clone(),
            last_saved: now,
            fires: Vec::new(),
        }
    }
}

/// Manages chunk save/load operations with compression
pub struct WorldPersistence {
    world_dir: PathBuf,
}

impl WorldPersistence {
    /// Persistence rooted at `world_dir`, creating the directory layout
    pub fn new(world_dir: impl Into<PathBuf>) -> Result<Self> {
        let world_dir = world_dir.into();

        // Create directories if they don't exist
        std::fs::create_dir_all(world_dir.join("chunks"))
            .context("Failed to create world directories")?;

        Ok(Self { world_dir })
    }

    /// Persistence for an existing saved world
    pub fn open(world_dir: impl Into<PathBuf>) -> Result<Self> {
        let world_dir = world_dir.into();
        anyhow::ensure!(
            world_dir.join("world.meta").exists(),
            "No saved world at {:?}",
            world_dir
        );
        Ok(Self { world_dir })
    }

    pub fn world_dir(&self) -> &Path {
        &self.world_dir
    }

    /// Save a chunk to disk with compression
    pub fn save_chunk(&self, chunk: &Chunk) -> Result<()> {
        let path = self.chunk_path(chunk.pos);

        // Serialize with bincode
        let serialized =
            bincode_next::serde::encode_to_vec(chunk, bincode_next::config::standard())
                .context("Failed to serialize chunk")?;

        // Compress with lz4
        let compressed = lz4_flex::compress_prepend_size(&serialized);
        let compressed_size = compressed.len();

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, compressed).context("Failed to write chunk temp file")?;
        std::fs::rename(temp_path, &path).context("Failed to rename chunk file")?;

        log::debug!(
            "[SAVE] Chunk {:?} - {} non-air cells ({} bytes compressed)",
            chunk.pos,
            chunk.count_non_air(),
            compressed_size
        );

        Ok(())
    }

    /// Load a chunk from disk; Ok(None) when it was never saved
    pub fn load_chunk(&self, pos: IVec3) -> Result<Option<Chunk>> {
        let path = self.chunk_path(pos);
        if !path.exists() {
            return Ok(None);
        }

        let mut chunk = self
            .load_chunk_file(&path)
            .with_context(|| format!("Failed to load chunk {:?}", pos))?;
        anyhow::ensure!(
            chunk.pos == pos,
            "Chunk file {:?} holds chunk {:?}",
            path,
            chunk.pos
        );
        anyhow::ensure!(
            chunk.cells().len() == CHUNK_VOLUME,
            "Chunk {:?} has {} cells, expected {}",
            pos,
            chunk.cells().len(),
            CHUNK_VOLUME
        );

        // Freshly loaded geometry must be built, but nothing is unsaved
        chunk.mark_dirty();
        chunk.unsaved = false;

        log::debug!(
            "[LOAD] Chunk {:?} from disk - {} non-air cells",
            pos,
            chunk.count_non_air()
        );
        Ok(Some(chunk))
    }

    /// Remove a chunk's file if present
    pub fn delete_chunk(&self, pos: IVec3) -> Result<()> {
        let path = self.chunk_path(pos);
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to delete chunk file")?;
        }
        Ok(())
    }

    fn load_chunk_file(&self, path: &Path) -> Result<Chunk> {
        let compressed = std::fs::read(path).context("Failed to read chunk file")?;
        log::trace!("Read {} bytes from {:?}", compressed.len(), path);

        let serialized = lz4_flex::decompress_size_prepended(&compressed)
            .context("Failed to decompress chunk")?;

        let (chunk, _): (Chunk, _) =
            bincode_next::serde::decode_from_slice(&serialized, bincode_next::config::standard())
                .map_err(|e| anyhow::anyhow!("Failed to deserialize chunk: {:?}", e))?;
        Ok(chunk)
    }

    fn chunk_path(&self, pos: IVec3) -> PathBuf {
        self.world_dir
            .join("chunks")
            .join(format!("chunk_{}_{}_{}.bin", pos.x, pos.y, pos.z))
    }

    /// Save world metadata to disk
    pub fn save_metadata(&self, meta: &WorldMetadata) -> Result<()> {
        let path = self.world_dir.join("world.meta");
        let serialized = ron::ser::to_string_pretty(meta, Default::default())
            .context("Failed to serialize metadata")?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, serialized).context("Failed to write metadata file")?;
        std::fs::rename(temp_path, &path).context("Failed to rename metadata file")?;
        Ok(())
    }

    /// Load world metadata from disk
    pub fn load_metadata(&self) -> Result<WorldMetadata> {
        let path = self.world_dir.join("world.meta");
        let contents = std::fs::read_to_string(&path).context("Failed to read metadata")?;
        let meta: WorldMetadata = ron::from_str(&contents).context("Failed to parse metadata")?;

        anyhow::ensure!(
            meta.version <= WorldMetadata::VERSION,
            "World format version {} is newer than supported version {}",
            meta.version,
            WorldMetadata::VERSION
        );

        log::info!(
            "Loaded world metadata: {} chunks, tick {}, {} fires",
            meta.extent.x * meta.extent.y * meta.extent.z,
            meta.tick_count,
            meta.fires.len()
        );
        Ok(meta)
    }
}
