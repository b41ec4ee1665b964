//! Water cycle - evaporation into clouds and precipitation out of them
//!
//! Alternates two phases on a fixed cadence: every `evaporate_every`-th
//! invocation evaporates, all others condense. Each invocation visits one
//! cycling y-layer per active chunk; column scans themselves run through the
//! whole chunk stack above.

use std::sync::Arc;

use glam::IVec3;

use super::config::WaterCycleConfig;
use super::scheduler::LayerCursors;
use crate::simulation::{CHUNK_DEPTH, CHUNK_WIDTH, SubstanceRegistry};
use crate::world::{ActiveRegion, SimStats, WorldGrid};

/// Which half of the cycle an invocation runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CyclePhase {
    Condense,
    Evaporate,
}

pub struct WaterCycleEngine {
    registry: Arc<SubstanceRegistry>,
    config: WaterCycleConfig,
    max_gas_height: i32,
    cursors: LayerCursors,
    invocations: u32,
}

impl WaterCycleEngine {
    pub fn new(registry: Arc<SubstanceRegistry>, config: WaterCycleConfig, max_gas_height: i32) -> Self {
        Self {
            registry,
            config,
            max_gas_height,
            cursors: LayerCursors::new(),
            invocations: 0,
        }
    }

    /// Phase the next invocation will run
    pub fn next_phase(&self) -> CyclePhase {
        let n = self.invocations.wrapping_add(1);
        if self.config.evaporate_every > 0 && n % self.config.evaporate_every == 0 {
            CyclePhase::Evaporate
        } else {
            CyclePhase::Condense
        }
    }

    pub fn run(&mut self, grid: &mut WorldGrid, active: &ActiveRegion, stats: &mut dyn SimStats) -> usize {
        let phase = self.next_phase();
        self.invocations = self.invocations.wrapping_add(1);

        let mut events = 0;
        for &chunk_pos in active.chunks() {
            let y = self.cursors.next(chunk_pos);
            for z in 0..CHUNK_DEPTH {
                for x in 0..CHUNK_WIDTH {
                    let global = WorldGrid::chunk_to_world_coords(chunk_pos, x, y, z);
                    let changed = match phase {
                        CyclePhase::Condense => self.condense_cell(grid, global, stats),
                        CyclePhase::Evaporate => self.evaporate_cell(grid, global, stats),
                    };
                    if changed {
                        events += 1;
                    }
                }
            }
        }

        log::trace!("Water cycle {:?} pass: {} events", phase, events);
        events
    }

    /// Rain from a saturated gas cell into the cell below.
    ///
    /// The target must be air or the gas's liquid form with room for the
    /// whole deposit.
    pub fn condense_cell(&self, grid: &mut WorldGrid, pos: IVec3, stats: &mut dyn SimStats) -> bool {
        let Some(cell) = grid.cell(pos).copied() else {
            return false;
        };
        if !self.registry.is_gas(cell.substance) || cell.motes < self.config.precipitation_threshold {
            return false;
        }
        let Some(liquid) = self.registry.get(cell.substance).liquid_form else {
            return false;
        };

        let amount = self.config.precipitation_amount.min(cell.motes);
        if amount == 0 {
            return false;
        }
        let below = pos - IVec3::Y;
        let Some(target) = grid.cell(below).copied() else {
            return false;
        };
        let accepts = target.is_air() || target.substance == liquid;
        if !accepts || target.room() < amount {
            return false;
        }

        grid.update_cell(pos, |c| c.motes -= amount);
        grid.update_cell(below, |c| {
            c.substance = liquid;
            c.motes += amount;
        });
        stats.record_condensation();
        log::trace!("Precipitated {} motes below {:?}", amount, pos);
        true
    }

    /// Move one mote of a resting liquid up its column into the matching gas,
    /// or seed a cloud at the gas ceiling when the column is clear
    pub fn evaporate_cell(&self, grid: &mut WorldGrid, pos: IVec3, stats: &mut dyn SimStats) -> bool {
        let Some(cell) = grid.cell(pos).copied() else {
            return false;
        };
        if !self.registry.is_liquid(cell.substance) {
            return false;
        }
        let Some(gas) = self.registry.get(cell.substance).gas_form else {
            return false;
        };

        // Falling liquid does not evaporate; the world floor counts as support
        if grid.cell(pos - IVec3::Y).is_some_and(|below| below.is_air()) {
            return false;
        }

        let Some(target) = self.scan_column(grid, pos, gas) else {
            return false;
        };

        grid.update_cell(pos, |c| c.motes -= 1);
        grid.update_cell(target, |c| {
            c.substance = gas;
            c.motes += 1;
        });
        stats.record_evaporation();
        log::trace!("Evaporated one mote from {:?} to {:?}", pos, target);
        true
    }

    /// First cell above `pos` that can take one mote of `gas`
    fn scan_column(&self, grid: &WorldGrid, pos: IVec3, gas: u16) -> Option<IVec3> {
        let mut y = pos.y + 1;
        while y <= self.max_gas_height {
            let above = IVec3::new(pos.x, y, pos.z);
            let cell = grid.cell(above)?;

            if cell.substance == gas {
                return (cell.room() > 0).then_some(above);
            }
            if !cell.is_air() {
                return None;
            }
            if y == self.max_gas_height {
                return Some(above);
            }
            y += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{MAX_MOTES, SubstanceId};
    use crate::world::TickStats;

    fn setup(max_gas_height: i32) -> (WaterCycleEngine, WorldGrid) {
        let registry = Arc::new(SubstanceRegistry::with_defaults().unwrap());
        let engine = WaterCycleEngine::new(registry, WaterCycleConfig::default(), max_gas_height);
        (engine, WorldGrid::new(IVec3::ZERO, IVec3::new(1, 4, 1), 1.0))
    }

    #[test]
    fn test_condense_deposits_below() {
        let (engine, mut grid) = setup(60);
        let pos = IVec3::new(4, 50, 4);
        grid.set_cell(pos, SubstanceId::STEAM, 150).unwrap();

        let mut stats = TickStats::default();
        assert!(engine.condense_cell(&mut grid, pos, &mut stats));

        assert_eq!(grid.cell(pos).unwrap().motes, 50);
        let below = grid.cell(pos - IVec3::Y).unwrap();
        assert_eq!((below.substance, below.motes), (SubstanceId::WATER, 100));
        assert_eq!(stats.condensations, 1);
    }

    #[test]
    fn test_condense_needs_threshold_and_room() {
        let (engine, mut grid) = setup(60);
        let pos = IVec3::new(4, 50, 4);
        grid.set_cell(pos, SubstanceId::STEAM, 99).unwrap();
        assert!(!engine.condense_cell(&mut grid, pos, &mut TickStats::default()));

        grid.set_cell(pos, SubstanceId::STEAM, 120).unwrap();
        grid.set_cell(pos - IVec3::Y, SubstanceId::WATER, MAX_MOTES - 50).unwrap();
        assert!(!engine.condense_cell(&mut grid, pos, &mut TickStats::default()));

        grid.set_cell(pos - IVec3::Y, SubstanceId::STONE, 1).unwrap();
        assert!(!engine.condense_cell(&mut grid, pos, &mut TickStats::default()));
    }

    #[test]
    fn test_condense_exhausts_source() {
        let (engine, mut grid) = setup(60);
        let pos = IVec3::new(4, 50, 4);
        grid.set_cell(pos, SubstanceId::STEAM, 100).unwrap();

        assert!(engine.condense_cell(&mut grid, pos, &mut TickStats::default()));
        assert!(grid.cell(pos).unwrap().is_air());
    }

    #[test]
    fn test_gas_without_liquid_form_never_rains() {
        let (engine, mut grid) = setup(60);
        let pos = IVec3::new(4, 50, 4);
        grid.set_cell(pos, SubstanceId::SMOKE, 500).unwrap();
        assert!(!engine.condense_cell(&mut grid, pos, &mut TickStats::default()));
    }

    #[test]
    fn test_evaporate_seeds_cloud_at_ceiling() {
        let (engine, mut grid) = setup(40);
        let pos = IVec3::new(2, 0, 2);
        grid.set_cell(pos, SubstanceId::WATER, 5).unwrap();

        assert!(engine.evaporate_cell(&mut grid, pos, &mut TickStats::default()));

        assert_eq!(grid.cell(pos).unwrap().motes, 4);
        let cloud = grid.cell(IVec3::new(2, 40, 2)).unwrap();
        assert_eq!((cloud.substance, cloud.motes), (SubstanceId::STEAM, 1));
    }

    #[test]
    fn test_evaporate_feeds_existing_cloud() {
        let (engine, mut grid) = setup(40);
        let pos = IVec3::new(2, 0, 2);
        grid.set_cell(pos, SubstanceId::WATER, 5).unwrap();
        grid.set_cell(IVec3::new(2, 30, 2), SubstanceId::STEAM, 7).unwrap();

        assert!(engine.evaporate_cell(&mut grid, pos, &mut TickStats::default()));
        assert_eq!(grid.cell(IVec3::new(2, 30, 2)).unwrap().motes, 8);
        assert!(grid.cell(IVec3::new(2, 40, 2)).unwrap().is_air());
    }

    #[test]
    fn test_evaporate_blocked_by_obstruction() {
        let (engine, mut grid) = setup(40);
        let pos = IVec3::new(2, 0, 2);
        grid.set_cell(pos, SubstanceId::WATER, 5).unwrap();
        grid.set_cell(IVec3::new(2, 20, 2), SubstanceId::STONE, 1).unwrap();

        assert!(!engine.evaporate_cell(&mut grid, pos, &mut TickStats::default()));
        assert_eq!(grid.cell(pos).unwrap().motes, 5);
    }

    #[test]
    fn test_falling_liquid_does_not_evaporate() {
        let (engine, mut grid) = setup(40);
        let pos = IVec3::new(2, 10, 2);
        grid.set_cell(pos, SubstanceId::WATER, 5).unwrap();
        assert!(!engine.evaporate_cell(&mut grid, pos, &mut TickStats::default()));

        grid.set_cell(pos - IVec3::Y, SubstanceId::STONE, 1).unwrap();
        assert!(engine.evaporate_cell(&mut grid, pos, &mut TickStats::default()));
    }

    #[test]
    fn test_ceiling_above_world_aborts() {
        let (engine, mut grid) = setup(200);
        let pos = IVec3::new(2, 0, 2);
        grid.set_cell(pos, SubstanceId::WATER, 5).unwrap();
        assert!(!engine.evaporate_cell(&mut grid, pos, &mut TickStats::default()));
    }

    #[test]
    fn test_phase_cadence() {
        let (mut engine, mut grid) = setup(60);
        let region = ActiveRegion::from_chunks(Vec::new());

        let mut phases = Vec::new();
        for _ in 0..10 {
            phases.push(engine.next_phase());
            engine.run(&mut grid, &region, &mut TickStats::default());
        }

        let evaporations: Vec<usize> = phases
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == CyclePhase::Evaporate)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(evaporations, vec![4, 9]);
    }
}
