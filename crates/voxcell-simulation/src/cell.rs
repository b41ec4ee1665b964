//! Cell types and chunk constants
//!
//! Foundational types for the voxel simulation.

use crate::SubstanceId;
use serde::{Deserialize, Serialize};

/// Chunk extent along X, in cells
pub const CHUNK_WIDTH: usize = 16;

/// Chunk extent along Y (vertical), in cells
pub const CHUNK_HEIGHT: usize = 16;

/// Chunk extent along Z, in cells
pub const CHUNK_DEPTH: usize = 16;

/// Total cells in a chunk
pub const CHUNK_VOLUME: usize = CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_DEPTH;

/// Upper bound on the motes a single cell may hold
pub const MAX_MOTES: u16 = 1000;

/// Temperature new cells start at (Celsius)
pub const AMBIENT_TEMPERATURE: f32 = 20.0;

/// Handle to a live fire owned by the combustion engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FireId(pub u32);

/// A single voxel in the world
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelCell {
    /// Substance id (0 = air)
    pub substance: u16,
    /// Quantity of substance held, in [0, MAX_MOTES]
    pub motes: u16,
    /// Temperature of this location (Celsius)
    pub temperature: f32,
    /// Liquid passes since this cell last changed
    pub idle_ticks: u8,
    /// Set while the cell is burning
    pub fire: Option<FireId>,
}

impl VoxelCell {
    pub const AIR: VoxelCell = VoxelCell {
        substance: SubstanceId::AIR,
        motes: 0,
        temperature: AMBIENT_TEMPERATURE,
        idle_ticks: 0,
        fire: None,
    };

    pub fn new(substance: u16, motes: u16) -> Self {
        Self {
            substance,
            motes,
            ..Self::AIR
        }
    }

    pub fn is_air(&self) -> bool {
        self.substance == SubstanceId::AIR
    }

    pub fn is_burning(&self) -> bool {
        self.fire.is_some()
    }

    /// Replace contents with air, keeping the temperature of the location
    pub fn clear(&mut self) {
        self.substance = SubstanceId::AIR;
        self.motes = 0;
        self.idle_ticks = 0;
        self.fire = None;
    }

    /// Room left before MAX_MOTES
    pub fn room(&self) -> u16 {
        MAX_MOTES.saturating_sub(self.motes)
    }
}

impl Default for VoxelCell {
    fn default() -> Self {
        Self::AIR
    }
}
