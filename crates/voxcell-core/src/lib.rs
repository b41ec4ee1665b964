//! Chunked voxel world and the cellular-automaton passes that evolve it

pub mod simulation;
pub mod world;
