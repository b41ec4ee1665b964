//! World management - grid, chunks, queries, saving

mod active_region;
mod chunk;
mod grid;
mod neighbor_queries;
#[cfg(not(target_arch = "wasm32"))]
pub mod persistence;
pub mod rng_trait;
pub mod stats;
#[allow(clippy::module_inception)]
mod world;

pub use active_region::ActiveRegion;
pub use chunk::Chunk;
pub use grid::{CHUNK_DIMS, GridError, MutationLog, WorldGrid};
pub use neighbor_queries::{Direction, NeighborQueries};
#[cfg(not(target_arch = "wasm32"))]
pub use persistence::{WorldMetadata, WorldPersistence};
pub use rng_trait::WorldRng;
pub use stats::{NoopStats, SimStats, TickStats};
pub use world::{FIXED_TIMESTEP, VoxelWorld};
