//! Gas flow - buoyant rise up to a cloud ceiling

use std::sync::Arc;

use glam::IVec3;

use super::config::GasConfig;
use crate::simulation::{CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH, SubstanceRegistry};
use crate::world::{ActiveRegion, Direction, NeighborQueries, SimStats, WorldGrid};

/// What happened to one gas cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasMove {
    /// Nothing above to interact with, or at the ceiling
    Stay,
    /// Moved into the air cell above
    Rise,
    /// Merged this many motes into the same gas above
    Merge(u16),
    /// Swapped places with the liquid above
    Bubble,
}

/// Full-scan buoyancy pass for every non-air gas
pub struct GasFlowEngine {
    registry: Arc<SubstanceRegistry>,
    config: GasConfig,
}

impl GasFlowEngine {
    pub fn new(registry: Arc<SubstanceRegistry>, config: GasConfig) -> Self {
        Self { registry, config }
    }

    pub fn max_gas_height(&self) -> i32 {
        self.config.max_gas_height
    }

    /// Scan every cell of every active chunk, top-down.
    ///
    /// The region lists upper chunks first and each chunk is walked from its
    /// top layer, so a gas unit rises at most one cell per pass.
    pub fn run(
        &self,
        grid: &mut WorldGrid,
        active: &ActiveRegion,
        stats: &mut dyn SimStats,
    ) -> usize {
        let mut moves = 0;

        for &chunk_pos in active.chunks() {
            let Some(chunk) = grid.chunk(chunk_pos) else {
                continue;
            };
            if chunk.cells().iter().all(|c| !self.registry.is_gas(c.substance)) {
                continue;
            }

            for y in (0..CHUNK_HEIGHT).rev() {
                for z in 0..CHUNK_DEPTH {
                    for x in 0..CHUNK_WIDTH {
                        let global = WorldGrid::chunk_to_world_coords(chunk_pos, x, y, z);
                        if self.step_cell(grid, global, stats) != GasMove::Stay {
                            moves += 1;
                        }
                    }
                }
            }
        }

        log::trace!("Gas pass: {} moves", moves);
        moves
    }

    /// Apply buoyancy to one cell
    pub fn step_cell(&self, grid: &mut WorldGrid, pos: IVec3, stats: &mut dyn SimStats) -> GasMove {
        let Some(cell) = grid.cell(pos).copied() else {
            return GasMove::Stay;
        };
        if !self.registry.is_gas(cell.substance) || pos.y >= self.config.max_gas_height {
            return GasMove::Stay;
        }
        let Some(above) = NeighborQueries::neighbor(grid, pos, Direction::Up) else {
            return GasMove::Stay;
        };
        let Some(above_cell) = grid.cell(above).copied() else {
            return GasMove::Stay;
        };

        if above_cell.is_air() {
            let moved = grid.move_motes(pos, above, cell.motes);
            stats.record_mote_transfer(moved);
            GasMove::Rise
        } else if above_cell.substance == cell.substance {
            let moved = grid.move_motes(pos, above, cell.motes);
            if moved == 0 {
                return GasMove::Stay;
            }
            stats.record_mote_transfer(moved);
            GasMove::Merge(moved)
        } else if self.registry.is_liquid(above_cell.substance) {
            grid.swap_contents(pos, above);
            stats.record_mote_transfer(cell.motes);
            stats.record_mote_transfer(above_cell.motes);
            GasMove::Bubble
        } else {
            GasMove::Stay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{MAX_MOTES, SubstanceId};
    use crate::world::NoopStats;

    fn setup(max_gas_height: i32) -> (GasFlowEngine, WorldGrid) {
        let registry = Arc::new(SubstanceRegistry::with_defaults().unwrap());
        let engine = GasFlowEngine::new(registry, GasConfig { max_gas_height });
        let grid = WorldGrid::new(IVec3::ZERO, IVec3::new(1, 2, 1), 1.0);
        (engine, grid)
    }

    #[test]
    fn test_gas_rises_into_air() {
        let (engine, mut grid) = setup(60);
        let pos = IVec3::new(3, 4, 3);
        grid.set_cell(pos, SubstanceId::STEAM, 7).unwrap();

        assert_eq!(engine.step_cell(&mut grid, pos, &mut NoopStats), GasMove::Rise);

        assert!(grid.cell(pos).unwrap().is_air());
        let above = grid.cell(pos + IVec3::Y).unwrap();
        assert_eq!((above.substance, above.motes), (SubstanceId::STEAM, 7));
    }

    #[test]
    fn test_gas_merges_and_keeps_remainder() {
        let (engine, mut grid) = setup(60);
        let pos = IVec3::new(3, 4, 3);
        grid.set_cell(pos, SubstanceId::SMOKE, 30).unwrap();
        grid.set_cell(pos + IVec3::Y, SubstanceId::SMOKE, MAX_MOTES - 10).unwrap();

        assert_eq!(
            engine.step_cell(&mut grid, pos, &mut NoopStats),
            GasMove::Merge(10)
        );
        assert_eq!(grid.cell(pos).unwrap().motes, 20);
        assert_eq!(grid.cell(pos + IVec3::Y).unwrap().motes, MAX_MOTES);
    }

    #[test]
    fn test_gas_bubbles_through_liquid() {
        let (engine, mut grid) = setup(60);
        let pos = IVec3::new(3, 4, 3);
        grid.set_cell(pos, SubstanceId::STEAM, 2).unwrap();
        grid.set_cell(pos + IVec3::Y, SubstanceId::WATER, 9).unwrap();

        assert_eq!(engine.step_cell(&mut grid, pos, &mut NoopStats), GasMove::Bubble);

        let below = grid.cell(pos).unwrap();
        let above = grid.cell(pos + IVec3::Y).unwrap();
        assert_eq!((below.substance, below.motes), (SubstanceId::WATER, 9));
        assert_eq!((above.substance, above.motes), (SubstanceId::STEAM, 2));
    }

    #[test]
    fn test_gas_blocked_by_solid_and_other_gas() {
        let (engine, mut grid) = setup(60);
        let pos = IVec3::new(3, 4, 3);
        grid.set_cell(pos, SubstanceId::STEAM, 2).unwrap();
        grid.set_cell(pos + IVec3::Y, SubstanceId::STONE, 1).unwrap();
        assert_eq!(engine.step_cell(&mut grid, pos, &mut NoopStats), GasMove::Stay);

        grid.set_cell(pos + IVec3::Y, SubstanceId::SMOKE, 1).unwrap();
        assert_eq!(engine.step_cell(&mut grid, pos, &mut NoopStats), GasMove::Stay);
    }

    #[test]
    fn test_gas_stops_at_ceiling() {
        let (engine, mut grid) = setup(20);
        let region = ActiveRegion::whole_world(&grid);
        let pos = IVec3::new(8, 2, 8);
        grid.set_cell(pos, SubstanceId::STEAM, 5).unwrap();

        for _ in 0..40 {
            engine.run(&mut grid, &region, &mut NoopStats);
        }

        let top = grid.cell(IVec3::new(8, 20, 8)).unwrap();
        assert_eq!((top.substance, top.motes), (SubstanceId::STEAM, 5));
        assert!(grid.cell(IVec3::new(8, 21, 8)).unwrap().is_air());
    }

    #[test]
    fn test_gas_rises_one_cell_per_pass_across_chunks() {
        let (engine, mut grid) = setup(60);
        let region = ActiveRegion::whole_world(&grid);
        let pos = IVec3::new(1, 15, 1);
        grid.set_cell(pos, SubstanceId::SMOKE, 1).unwrap();

        engine.run(&mut grid, &region, &mut NoopStats);
        assert_eq!(grid.substance_at(IVec3::new(1, 16, 1)), Some(SubstanceId::SMOKE));

        engine.run(&mut grid, &region, &mut NoopStats);
        assert_eq!(grid.substance_at(IVec3::new(1, 17, 1)), Some(SubstanceId::SMOKE));
        assert!(grid.cell(IVec3::new(1, 16, 1)).unwrap().is_air());
    }

    #[test]
    fn test_air_is_not_processed() {
        let (engine, mut grid) = setup(60);
        assert_eq!(
            engine.step_cell(&mut grid, IVec3::new(0, 0, 0), &mut NoopStats),
            GasMove::Stay
        );
    }
}
