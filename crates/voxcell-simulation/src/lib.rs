//! Substance catalog and cell data for voxcell
//!
//! This crate provides the foundational data types for the voxel simulation:
//! - Substance definitions (SubstanceId, Substance, SubstanceRegistry)
//! - Phases and rule tables (Phase, TransitionRule, TransmutationRule)
//! - Cell types (VoxelCell, FireId, chunk dimensions, MAX_MOTES)

mod cell;
mod rules;
mod substances;

pub use cell::{
    AMBIENT_TEMPERATURE, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH, FireId, MAX_MOTES,
    VoxelCell,
};
pub use rules::{TransitionKind, TransitionRule, TransmutationRule};
pub use substances::{
    Phase, RegistryError, Substance, SubstanceId, SubstanceRegistry, SubstanceRegistryBuilder,
};
