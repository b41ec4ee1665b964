//! Active region - the chunks simulated this tick

use glam::{IVec3, Vec3};

use super::grid::{CHUNK_DIMS, WorldGrid};

/// Snapshot of the chunks within a radius of the point of interest
///
/// Recomputed every tick and handed to each subsystem read-only. Chunks are
/// ordered top layer first (descending chunk y), then by z and x, so passes
/// that move material upward never revisit what they just moved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveRegion {
    /// Chunk containing the point of interest (may lie outside the world)
    pub center: IVec3,
    /// Chebyshev radius in chunks
    pub radius: i32,
    chunks: Vec<IVec3>,
}

impl ActiveRegion {
    /// Chunks within `radius` of the chunk containing `point_of_interest`,
    /// clamped to world bounds
    pub fn compute(grid: &WorldGrid, point_of_interest: Vec3, radius: i32) -> Self {
        let radius = radius.max(0);
        let voxel = grid.position_to_voxel(point_of_interest);
        let center = voxel.div_euclid(CHUNK_DIMS);

        let world_min = grid.origin();
        let world_max = grid.origin() + grid.extent() - IVec3::ONE;
        let min = (center - IVec3::splat(radius)).max(world_min);
        let max = (center + IVec3::splat(radius)).min(world_max);

        let mut chunks = Vec::new();
        if min.cmple(max).all() {
            for cy in (min.y..=max.y).rev() {
                for cz in min.z..=max.z {
                    for cx in min.x..=max.x {
                        chunks.push(IVec3::new(cx, cy, cz));
                    }
                }
            }
        }

        log::trace!(
            "Active region around chunk {:?} (radius {}): {} chunks",
            center,
            radius,
            chunks.len()
        );

        Self {
            center,
            radius,
            chunks,
        }
    }

    /// Region covering every chunk of the world
    pub fn whole_world(grid: &WorldGrid) -> Self {
        let extent = grid.extent();
        let radius = extent.max_element();
        let center_chunk = grid.origin() + extent / 2;
        let mut region = Self::compute(
            grid,
            grid.voxel_to_position(center_chunk * CHUNK_DIMS),
            radius,
        );
        region.center = center_chunk;
        region
    }

    /// Region holding exactly the given chunks, in the given order
    pub fn from_chunks(chunks: Vec<IVec3>) -> Self {
        Self {
            center: chunks.first().copied().unwrap_or_default(),
            radius: 0,
            chunks,
        }
    }

    pub fn chunks(&self) -> &[IVec3] {
        &self.chunks
    }

    pub fn contains(&self, chunk_pos: IVec3) -> bool {
        self.chunks.contains(&chunk_pos)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
