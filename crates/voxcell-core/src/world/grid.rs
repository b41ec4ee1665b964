//! World grid - dense chunk arena, coordinate mapping and cell access

use glam::{IVec3, Vec3};
use thiserror::Error;

use super::Chunk;
use crate::simulation::{CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH, MAX_MOTES, SubstanceId, VoxelCell};

/// Chunk dimensions as a vector, for coordinate math
pub const CHUNK_DIMS: IVec3 = IVec3::new(
    CHUNK_WIDTH as i32,
    CHUNK_HEIGHT as i32,
    CHUNK_DEPTH as i32,
);

/// Rejections at the grid boundary
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("voxel {0} is outside the world")]
    OutOfBounds(IVec3),

    #[error("unknown substance id {0}")]
    UnknownSubstance(u16),

    #[error("{motes} motes exceeds the maximum of {max}")]
    MotesOutOfRange { motes: u16, max: u16 },

    #[error("air cannot hold motes")]
    AirWithMotes,
}

/// Global coordinates written since the last drain
#[derive(Debug, Default)]
pub struct MutationLog {
    touched: Vec<IVec3>,
    overflowed: bool,
}

impl MutationLog {
    /// Beyond this many entries the log only remembers that it overflowed
    pub const CAPACITY: usize = 1 << 16;

    fn record(&mut self, pos: IVec3) {
        if self.overflowed {
            return;
        }
        if self.touched.len() >= Self::CAPACITY {
            self.touched.clear();
            self.overflowed = true;
            return;
        }
        self.touched.push(pos);
    }

    pub fn touched(&self) -> &[IVec3] {
        &self.touched
    }

    /// True when writes were dropped; consumers must assume everything changed
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_empty() && !self.overflowed
    }
}

/// Dense 3D arena of chunks
///
/// Chunks are addressed by integer chunk coordinates in
/// `origin .. origin + extent`. Neighbor links are computed from the key, so
/// adjacency is symmetric by construction.
pub struct WorldGrid {
    origin: IVec3,
    extent: IVec3,
    chunks: Vec<Chunk>,
    voxel_size: f32,
    mutations: MutationLog,
}

impl WorldGrid {
    /// Allocate an all-air grid of `extent` chunks starting at chunk `origin`
    pub fn new(origin: IVec3, extent: IVec3, voxel_size: f32) -> Self {
        let extent = extent.max(IVec3::ONE);
        let mut chunks = Vec::with_capacity((extent.x * extent.y * extent.z) as usize);
        for cy in 0..extent.y {
            for cz in 0..extent.z {
                for cx in 0..extent.x {
                    chunks.push(Chunk::new(origin + IVec3::new(cx, cy, cz)));
                }
            }
        }

        log::info!(
            "Allocated world grid: {} chunks ({}x{}x{}), origin {:?}",
            chunks.len(),
            extent.x,
            extent.y,
            extent.z,
            origin
        );

        Self {
            origin,
            extent,
            chunks,
            voxel_size,
            mutations: MutationLog::default(),
        }
    }

    /// Convert global voxel coordinates to chunk coordinates + local offset
    pub fn world_to_chunk_coords(global: IVec3) -> (IVec3, usize, usize, usize) {
        let chunk = global.div_euclid(CHUNK_DIMS);
        let local = global.rem_euclid(CHUNK_DIMS);
        (chunk, local.x as usize, local.y as usize, local.z as usize)
    }

    /// Inverse of `world_to_chunk_coords`
    pub fn chunk_to_world_coords(chunk: IVec3, x: usize, y: usize, z: usize) -> IVec3 {
        chunk * CHUNK_DIMS + IVec3::new(x as i32, y as i32, z as i32)
    }

    /// Continuous position of a voxel's minimum corner
    pub fn voxel_to_position(&self, global: IVec3) -> Vec3 {
        global.as_vec3() * self.voxel_size
    }

    /// Voxel containing a continuous position
    pub fn position_to_voxel(&self, position: Vec3) -> IVec3 {
        (position / self.voxel_size).floor().as_ivec3()
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Smallest chunk coordinate
    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    /// Chunks per axis
    pub fn extent(&self) -> IVec3 {
        self.extent
    }

    /// Inclusive minimum voxel coordinate
    pub fn min_voxel(&self) -> IVec3 {
        self.origin * CHUNK_DIMS
    }

    /// Exclusive maximum voxel coordinate
    pub fn max_voxel(&self) -> IVec3 {
        (self.origin + self.extent) * CHUNK_DIMS
    }

    fn slot(&self, chunk_pos: IVec3) -> Option<usize> {
        let rel = chunk_pos - self.origin;
        if rel.cmplt(IVec3::ZERO).any() || rel.cmpge(self.extent).any() {
            return None;
        }
        Some(((rel.y * self.extent.z + rel.z) * self.extent.x + rel.x) as usize)
    }

    pub fn has_chunk(&self, chunk_pos: IVec3) -> bool {
        self.slot(chunk_pos).is_some()
    }

    /// Get chunk at chunk coordinates (not voxel coordinates)
    pub fn chunk(&self, chunk_pos: IVec3) -> Option<&Chunk> {
        self.slot(chunk_pos).map(|i| &self.chunks[i])
    }

    pub fn chunk_mut(&mut self, chunk_pos: IVec3) -> Option<&mut Chunk> {
        self.slot(chunk_pos).map(|i| &mut self.chunks[i])
    }

    /// Replace a chunk wholesale (used when loading from disk)
    pub fn insert_chunk(&mut self, chunk: Chunk) -> Result<(), GridError> {
        let slot = self
            .slot(chunk.pos)
            .ok_or(GridError::OutOfBounds(chunk.pos * CHUNK_DIMS))?;
        self.chunks[slot] = chunk;
        Ok(())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Raw chunk slice; writes through it bypass the mutation log
    pub fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    pub fn contains(&self, global: IVec3) -> bool {
        let (chunk, _, _, _) = Self::world_to_chunk_coords(global);
        self.has_chunk(chunk)
    }

    /// Resolve a voxel across chunk boundaries
    pub fn get_cell(&self, global: IVec3) -> Result<&VoxelCell, GridError> {
        self.cell(global).ok_or(GridError::OutOfBounds(global))
    }

    pub fn cell(&self, global: IVec3) -> Option<&VoxelCell> {
        let (chunk_pos, x, y, z) = Self::world_to_chunk_coords(global);
        self.chunk(chunk_pos).map(|c| c.get(x, y, z))
    }

    /// Mutable access that neither marks the chunk dirty nor logs the write.
    /// Only for bookkeeping fields such as `idle_ticks`.
    pub fn cell_mut_untracked(&mut self, global: IVec3) -> Option<&mut VoxelCell> {
        let (chunk_pos, x, y, z) = Self::world_to_chunk_coords(global);
        self.chunk_mut(chunk_pos).map(|c| c.get_mut(x, y, z))
    }

    /// Substance at a voxel, None at world edges
    pub fn substance_at(&self, global: IVec3) -> Option<u16> {
        self.cell(global).map(|c| c.substance)
    }

    /// Replace substance and motes in place and mark the owning chunk dirty.
    /// A non-air substance with zero motes is stored as air.
    pub fn set_cell(&mut self, global: IVec3, substance: u16, motes: u16) -> Result<(), GridError> {
        if motes > MAX_MOTES {
            return Err(GridError::MotesOutOfRange {
                motes,
                max: MAX_MOTES,
            });
        }
        let (chunk_pos, x, y, z) = Self::world_to_chunk_coords(global);
        let chunk = self
            .chunk_mut(chunk_pos)
            .ok_or(GridError::OutOfBounds(global))?;

        if motes == 0 {
            chunk.set(x, y, z, SubstanceId::AIR, 0);
        } else {
            chunk.set(x, y, z, substance, motes);
        }
        self.mutations.record(global);
        Ok(())
    }

    /// Apply an edit to one cell, then normalise it, mark dirty and log it.
    /// Returns false at world edges.
    pub fn update_cell<F>(&mut self, global: IVec3, edit: F) -> bool
    where
        F: FnOnce(&mut VoxelCell),
    {
        let (chunk_pos, x, y, z) = Self::world_to_chunk_coords(global);
        let Some(chunk) = self.chunk_mut(chunk_pos) else {
            return false;
        };

        let cell = chunk.get_mut(x, y, z);
        edit(cell);
        cell.motes = cell.motes.min(MAX_MOTES);
        if cell.is_air() || cell.motes == 0 {
            cell.clear();
        }
        cell.idle_ticks = 0;
        chunk.mark_dirty();
        self.mutations.record(global);
        true
    }

    /// Mark the chunk owning a voxel dirty. Idempotent.
    pub fn mark_dirty(&mut self, global: IVec3) {
        let (chunk_pos, _, _, _) = Self::world_to_chunk_coords(global);
        if let Some(chunk) = self.chunk_mut(chunk_pos) {
            chunk.mark_dirty();
        }
    }

    /// Move up to `amount` motes of the source's substance into `to`.
    ///
    /// The target must be air or already hold the same substance; the amount
    /// is capped by the source's motes and the target's room. Returns the
    /// number of motes moved, zero when nothing was eligible.
    pub fn move_motes(&mut self, from: IVec3, to: IVec3, amount: u16) -> u16 {
        let (Some(src), Some(dst)) = (self.cell(from).copied(), self.cell(to).copied()) else {
            return 0;
        };
        if src.is_air() || from == to {
            return 0;
        }
        if !dst.is_air() && dst.substance != src.substance {
            return 0;
        }

        let moved = amount.min(src.motes).min(dst.room());
        if moved == 0 {
            return 0;
        }

        self.update_cell(from, |cell| cell.motes -= moved);
        self.update_cell(to, |cell| {
            cell.substance = src.substance;
            cell.motes += moved;
        });
        moved
    }

    /// Exchange substance and motes of two cells. Temperatures stay put and
    /// fire handles are dropped on both sides.
    pub fn swap_contents(&mut self, a: IVec3, b: IVec3) -> bool {
        let (Some(first), Some(second)) = (self.cell(a).copied(), self.cell(b).copied()) else {
            return false;
        };

        self.update_cell(a, |cell| {
            cell.substance = second.substance;
            cell.motes = second.motes;
            cell.fire = None;
        });
        self.update_cell(b, |cell| {
            cell.substance = first.substance;
            cell.motes = first.motes;
            cell.fire = None;
        });
        true
    }

    /// Record an out-of-band write (e.g. from a parallel pass)
    pub fn record_mutation(&mut self, global: IVec3) {
        self.mutations.record(global);
    }

    /// Drain every coordinate written since the last call
    pub fn take_mutations(&mut self) -> MutationLog {
        std::mem::take(&mut self.mutations)
    }

    /// Positions of chunks flagged for remesh, clearing the flags
    pub fn take_dirty_chunks(&mut self) -> Vec<IVec3> {
        let mut dirty = Vec::new();
        for chunk in &mut self.chunks {
            if chunk.needs_remesh() {
                chunk.clear_remesh();
                dirty.push(chunk.pos);
            }
        }
        dirty
    }

    /// Total motes of one substance across the whole world
    pub fn total_motes(&self, substance: u16) -> u64 {
        self.chunks.iter().map(|c| c.total_motes(substance)).sum()
    }

    /// Count non-air cells across the world
    pub fn count_non_air(&self) -> usize {
        self.chunks.iter().map(|c| c.count_non_air()).sum()
    }
}
