//! Neighbor voxel collection utilities

use glam::IVec3;

use super::grid::WorldGrid;

/// One of the six face directions of a voxel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Order used by `neighbors6`
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Order used by `neighbors_lateral4`
    pub const LATERAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn offset(self) -> IVec3 {
        match self {
            Direction::Up => IVec3::Y,
            Direction::Down => IVec3::NEG_Y,
            Direction::North => IVec3::NEG_Z,
            Direction::South => IVec3::Z,
            Direction::East => IVec3::X,
            Direction::West => IVec3::NEG_X,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

/// Neighbor collection utilities - stateless methods for querying adjacent voxels
pub struct NeighborQueries;

impl NeighborQueries {
    /// Chunk adjacent to `chunk_pos` in a direction, None past the world edge
    pub fn neighbor_chunk(grid: &WorldGrid, chunk_pos: IVec3, direction: Direction) -> Option<IVec3> {
        let pos = chunk_pos + direction.offset();
        grid.has_chunk(pos).then_some(pos)
    }

    /// All 6 face neighbors; an entry is None at a world edge
    ///
    /// Order: Up, Down, North, South, East, West
    pub fn neighbors6(grid: &WorldGrid, center: IVec3) -> [Option<IVec3>; 6] {
        Direction::ALL.map(|d| Self::neighbor(grid, center, d))
    }

    /// The 4 horizontal neighbors; an entry is None at a world edge
    ///
    /// Order: North, South, East, West
    pub fn neighbors_lateral4(grid: &WorldGrid, center: IVec3) -> [Option<IVec3>; 4] {
        Direction::LATERAL.map(|d| Self::neighbor(grid, center, d))
    }

    /// Single neighbor in a direction, crossing chunk boundaries
    #[inline]
    pub fn neighbor(grid: &WorldGrid, center: IVec3, direction: Direction) -> Option<IVec3> {
        let pos = center + direction.offset();
        grid.contains(pos).then_some(pos)
    }

    /// Substances of all existing face neighbors, in `neighbors6` order
    pub fn neighbor_substances(grid: &WorldGrid, center: IVec3) -> smallvec::SmallVec<[u16; 6]> {
        Self::neighbors6(grid, center)
            .into_iter()
            .flatten()
            .filter_map(|pos| grid.substance_at(pos))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SubstanceId;

    fn grid() -> WorldGrid {
        WorldGrid::new(IVec3::ZERO, IVec3::new(2, 1, 1), 1.0)
    }

    #[test]
    fn test_neighbors6_at_world_corner() {
        let grid = grid();
        let n = NeighborQueries::neighbors6(&grid, IVec3::ZERO);

        assert_eq!(n[0], Some(IVec3::Y)); // Up
        assert_eq!(n[1], None); // Down: world floor
        assert_eq!(n[2], None); // North: z = -1
        assert_eq!(n[3], Some(IVec3::Z)); // South
        assert_eq!(n[4], Some(IVec3::X)); // East
        assert_eq!(n[5], None); // West
    }

    #[test]
    fn test_neighbors_cross_chunk_boundary() {
        let grid = grid();
        let edge = IVec3::new(15, 4, 4);
        let lateral = NeighborQueries::neighbors_lateral4(&grid, edge);

        // East neighbor lives in chunk (1, 0, 0)
        assert_eq!(lateral[2], Some(IVec3::new(16, 4, 4)));
        let (chunk, x, _, _) = WorldGrid::world_to_chunk_coords(lateral[2].unwrap());
        assert_eq!(chunk, IVec3::new(1, 0, 0));
        assert_eq!(x, 0);
    }

    #[test]
    fn test_neighbor_chunk_links_are_symmetric() {
        let grid = grid();
        for &pos in &[IVec3::ZERO, IVec3::X] {
            for dir in Direction::ALL {
                if let Some(other) = NeighborQueries::neighbor_chunk(&grid, pos, dir) {
                    assert_eq!(
                        NeighborQueries::neighbor_chunk(&grid, other, dir.opposite()),
                        Some(pos)
                    );
                }
            }
        }
        assert_eq!(
            NeighborQueries::neighbor_chunk(&grid, IVec3::ZERO, Direction::East),
            Some(IVec3::X)
        );
        assert_eq!(
            NeighborQueries::neighbor_chunk(&grid, IVec3::ZERO, Direction::Up),
            None
        );
    }

    #[test]
    fn test_neighbor_substances() {
        let mut grid = grid();
        grid.set_cell(IVec3::new(5, 6, 5), SubstanceId::LAVA, 1).unwrap();

        let subs = NeighborQueries::neighbor_substances(&grid, IVec3::new(5, 5, 5));
        assert_eq!(subs.len(), 6);
        assert_eq!(subs[0], SubstanceId::LAVA);
        assert!(subs[1..].iter().all(|&s| s == SubstanceId::AIR));
    }
}
