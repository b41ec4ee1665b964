//! Chunk - 16x16x16 block of voxel cells

use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::simulation::{CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH, VoxelCell};

/// A fixed-size 3D block of the world
#[derive(Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk coordinates (in chunk space, not voxel space)
    pub pos: IVec3,

    /// Cell data, layer-major order
    /// Index = (y * CHUNK_DEPTH + z) * CHUNK_WIDTH + x
    cells: Vec<VoxelCell>,

    /// Geometry is stale, polled and cleared by the mesher (not persisted)
    #[serde(skip)]
    needs_remesh: bool,

    /// Modified since last save (not persisted)
    #[serde(skip)]
    pub unsaved: bool,
}

impl Chunk {
    pub fn new(pos: IVec3) -> Self {
        Self {
            pos,
            cells: vec![VoxelCell::AIR; CHUNK_VOLUME],
            needs_remesh: true, // Fresh chunks have no geometry yet
            unsaved: false,
        }
    }

    /// Rebuild a chunk from a stored cell array
    pub fn from_cells(pos: IVec3, cells: Vec<VoxelCell>) -> Option<Self> {
        if cells.len() != CHUNK_VOLUME {
            return None;
        }
        Some(Self {
            pos,
            cells,
            needs_remesh: true,
            unsaved: false,
        })
    }

    #[inline]
    pub fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < CHUNK_WIDTH && y < CHUNK_HEIGHT && z < CHUNK_DEPTH);
        (y * CHUNK_DEPTH + z) * CHUNK_WIDTH + x
    }

    /// Get cell at local coordinates
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> &VoxelCell {
        &self.cells[Self::index(x, y, z)]
    }

    /// Mutable cell access; the caller is responsible for marking the chunk dirty
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> &mut VoxelCell {
        &mut self.cells[Self::index(x, y, z)]
    }

    /// Replace substance and motes at local coordinates
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, substance: u16, motes: u16) {
        let cell = self.get_mut(x, y, z);
        cell.substance = substance;
        cell.motes = motes;
        cell.idle_ticks = 0;
        if substance == crate::simulation::SubstanceId::AIR {
            cell.motes = 0;
            cell.fire = None;
        }
        self.mark_dirty();
    }

    /// Flag geometry and save state as stale. Idempotent.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.needs_remesh = true;
        self.unsaved = true;
    }

    pub fn needs_remesh(&self) -> bool {
        self.needs_remesh
    }

    /// Called by the mesher after rebuilding geometry
    pub fn clear_remesh(&mut self) {
        self.needs_remesh = false;
    }

    /// Count non-air cells (for logging save/load)
    pub fn count_non_air(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_air()).count()
    }

    /// Sum of motes held by cells of the given substance
    pub fn total_motes(&self, substance: u16) -> u64 {
        self.cells
            .iter()
            .filter(|c| c.substance == substance)
            .map(|c| c.motes as u64)
            .sum()
    }

    /// Raw cell slice, for meshing and persistence
    pub fn cells(&self) -> &[VoxelCell] {
        &self.cells
    }

    /// Iterate one horizontal layer as (x, z, cell)
    pub fn layer(&self, y: usize) -> impl Iterator<Item = (usize, usize, &VoxelCell)> {
        let start = Self::index(0, y, 0);
        self.cells[start..start + CHUNK_WIDTH * CHUNK_DEPTH]
            .iter()
            .enumerate()
            .map(|(i, cell)| (i % CHUNK_WIDTH, i / CHUNK_WIDTH, cell))
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new(IVec3::ZERO)
    }
}
