//! Combustion - ignition, burn-down, spread and smoke
//!
//! Fire lifecycle per cell:
//! Idle → Burning → Consumed (motes ran out, cell becomes air)
//!               ↘ Extinguished (burn time ran out or explicit, substance kept)
//!
//! The engine owns the authoritative list of live fires; a cell only carries
//! the handle.

use std::sync::Arc;

use glam::IVec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::config::CombustionConfig;
use super::scheduler::LayerCursors;
use crate::simulation::{CHUNK_DEPTH, CHUNK_WIDTH, FireId, SubstanceRegistry};
use crate::world::{ActiveRegion, Direction, NeighborQueries, SimStats, WorldGrid, WorldRng};

/// A live fire attached to one cell
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fire {
    pub id: FireId,
    /// Global voxel coordinate of the burning cell
    pub cell: IVec3,
    /// Burn() calls the fire lasts in total
    pub burn_time: u32,
    pub burn_time_left: u32,
    /// Substance at ignition; a fire whose cell changed substance is stale
    pub original_substance: u16,
}

impl Fire {
    pub fn elapsed(&self) -> u32 {
        self.burn_time.saturating_sub(self.burn_time_left)
    }

    /// Past half of the original burn duration
    pub fn is_smoking(&self) -> bool {
        self.elapsed() > self.burn_time - self.elapsed()
    }
}

/// Result of one Burn() call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurnOutcome {
    Burning,
    Consumed,
    Extinguished,
}

pub struct CombustionEngine {
    registry: Arc<SubstanceRegistry>,
    config: CombustionConfig,
    smoke: Option<u16>,
    fires: Vec<Fire>,
    next_id: u32,
    cursors: LayerCursors,
}

impl CombustionEngine {
    pub fn new(registry: Arc<SubstanceRegistry>, config: CombustionConfig) -> Self {
        let smoke = registry.find_by_name(&config.smoke_substance);
        if smoke.is_none() {
            log::warn!(
                "Smoke substance '{}' not in registry, fires will not smoke",
                config.smoke_substance
            );
        }

        Self {
            registry,
            config,
            smoke,
            fires: Vec::new(),
            next_id: 0,
            cursors: LayerCursors::new(),
        }
    }

    /// Start a fire. No-op (None) for air, non-burnable substances or cells
    /// that are already burning.
    pub fn ignite(&mut self, grid: &mut WorldGrid, pos: IVec3, stats: &mut dyn SimStats) -> Option<FireId> {
        let cell = grid.cell(pos).copied()?;
        if cell.is_air() || cell.is_burning() {
            return None;
        }
        let substance = self.registry.get(cell.substance);
        if !substance.is_burnable() {
            return None;
        }

        let id = FireId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.fires.push(Fire {
            id,
            cell: pos,
            burn_time: substance.burn_time,
            burn_time_left: substance.burn_time,
            original_substance: cell.substance,
        });
        grid.update_cell(pos, |c| c.fire = Some(id));
        stats.record_ignition();

        log::debug!("Ignited {} at {:?} ({:?})", substance.name, pos, id);
        Some(id)
    }

    /// Detach and drop the fire on a cell, leaving its substance
    pub fn extinguish(&mut self, grid: &mut WorldGrid, pos: IVec3, stats: &mut dyn SimStats) -> bool {
        let Some(index) = self.fires.iter().position(|f| f.cell == pos) else {
            return false;
        };
        let fire = self.fires.swap_remove(index);
        if grid.cell(pos).is_some_and(|c| c.fire == Some(fire.id)) {
            grid.update_cell(pos, |c| c.fire = None);
        }
        stats.record_fire_extinguished();
        true
    }

    /// Advance one fire by a single Burn() call, reaping it if it ended.
    /// Returns the outcome and the fire's state after the call.
    pub fn burn<R: WorldRng>(
        &mut self,
        grid: &mut WorldGrid,
        id: FireId,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> Option<(BurnOutcome, Fire)> {
        let index = self.fires.iter().position(|f| f.id == id)?;
        let mut fire = self.fires[index];
        let mut spread = Vec::new();

        let outcome = self.burn_fire(&mut fire, grid, rng, &mut spread);
        match outcome {
            BurnOutcome::Burning => self.fires[index] = fire,
            BurnOutcome::Consumed => {
                self.fires.swap_remove(index);
                stats.record_fire_consumed();
            }
            BurnOutcome::Extinguished => {
                self.fires.swap_remove(index);
                stats.record_fire_extinguished();
            }
        }

        for pos in spread {
            self.ignite(grid, pos, stats);
        }
        Some((outcome, fire))
    }

    /// Temperature ignition on one layer per chunk, then one Burn() for every
    /// fire in an active chunk. Fires started by spreading burn next run.
    pub fn run<R: WorldRng>(
        &mut self,
        grid: &mut WorldGrid,
        active: &ActiveRegion,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> usize {
        if self.config.ignite_from_temperature {
            self.scan_ignition(grid, active, stats);
        }

        let mut fires = std::mem::take(&mut self.fires);
        let mut spread = Vec::new();
        let mut burned = 0;

        fires.retain_mut(|fire| {
            let (chunk_pos, _, _, _) = WorldGrid::world_to_chunk_coords(fire.cell);
            if !active.contains(chunk_pos) {
                return true;
            }
            burned += 1;
            match self.burn_fire(fire, grid, rng, &mut spread) {
                BurnOutcome::Burning => true,
                BurnOutcome::Consumed => {
                    stats.record_fire_consumed();
                    false
                }
                BurnOutcome::Extinguished => {
                    stats.record_fire_extinguished();
                    false
                }
            }
        });
        self.fires = fires;

        for pos in spread {
            self.ignite(grid, pos, stats);
        }

        log::trace!("Combustion pass: {} burned, {} live", burned, self.fires.len());
        burned
    }

    fn scan_ignition(&mut self, grid: &mut WorldGrid, active: &ActiveRegion, stats: &mut dyn SimStats) {
        for &chunk_pos in active.chunks() {
            let y = self.cursors.next(chunk_pos);
            for z in 0..CHUNK_DEPTH {
                for x in 0..CHUNK_WIDTH {
                    let global = WorldGrid::chunk_to_world_coords(chunk_pos, x, y, z);
                    let Some(cell) = grid.cell(global) else {
                        continue;
                    };
                    if cell.is_air() || cell.is_burning() {
                        continue;
                    }
                    let hot_enough = self
                        .registry
                        .get(cell.substance)
                        .ignition_temperature
                        .is_some_and(|t| cell.temperature > t);
                    if hot_enough {
                        self.ignite(grid, global, stats);
                    }
                }
            }
        }
    }

    fn burn_fire<R: WorldRng>(
        &self,
        fire: &mut Fire,
        grid: &mut WorldGrid,
        rng: &mut R,
        spread: &mut Vec<IVec3>,
    ) -> BurnOutcome {
        let Some(cell) = grid.cell(fire.cell).copied() else {
            return BurnOutcome::Extinguished;
        };
        // Drained, destroyed or transmuted since the last advance
        if cell.fire != Some(fire.id) {
            return BurnOutcome::Extinguished;
        }
        if cell.substance != fire.original_substance {
            grid.update_cell(fire.cell, |c| c.fire = None);
            return BurnOutcome::Extinguished;
        }

        fire.burn_time_left = fire.burn_time_left.saturating_sub(1);
        let heat = self.config.heat_per_burn;
        grid.update_cell(fire.cell, |c| {
            c.motes = c.motes.saturating_sub(1);
            c.temperature += heat;
        });

        if cell.motes <= 1 {
            log::trace!("Fire {:?} consumed {:?}", fire.id, fire.cell);
            return BurnOutcome::Consumed;
        }
        if fire.burn_time_left == 0 {
            grid.update_cell(fire.cell, |c| c.fire = None);
            log::trace!("Fire {:?} burned out at {:?}", fire.id, fire.cell);
            return BurnOutcome::Extinguished;
        }

        if fire.is_smoking() {
            self.emit_smoke(grid, fire.cell, rng);
        }
        if self.config.spread_chance > 0.0 && rng.check_probability(self.config.spread_chance) {
            let candidates: SmallVec<[IVec3; 6]> = NeighborQueries::neighbors6(grid, fire.cell)
                .into_iter()
                .flatten()
                .filter(|&n| {
                    grid.cell(n).is_some_and(|c| {
                        !c.is_air() && !c.is_burning() && self.registry.get(c.substance).is_burnable()
                    })
                })
                .collect();
            if let Some(&target) = rng.choose(&candidates) {
                spread.push(target);
            }
        }

        BurnOutcome::Burning
    }

    /// One smoke mote into a random air neighbor other than the one below
    fn emit_smoke<R: WorldRng>(&self, grid: &mut WorldGrid, pos: IVec3, rng: &mut R) {
        let Some(smoke) = self.smoke else {
            return;
        };
        let targets: SmallVec<[IVec3; 5]> = Direction::ALL
            .into_iter()
            .filter(|&d| d != Direction::Down)
            .filter_map(|d| NeighborQueries::neighbor(grid, pos, d))
            .filter(|&n| grid.cell(n).is_some_and(|c| c.is_air()))
            .collect();

        if let Some(&target) = rng.choose(&targets) {
            grid.update_cell(target, |c| {
                c.substance = smoke;
                c.motes = 1;
            });
        }
    }

    pub fn fires(&self) -> &[Fire] {
        &self.fires
    }

    pub fn fire(&self, id: FireId) -> Option<&Fire> {
        self.fires.iter().find(|f| f.id == id)
    }

    pub fn fire_at(&self, pos: IVec3) -> Option<&Fire> {
        self.fires.iter().find(|f| f.cell == pos)
    }

    /// Replace the live fire list (used when loading a saved world)
    pub fn restore_fires(&mut self, fires: Vec<Fire>) {
        self.next_id = fires
            .iter()
            .map(|f| f.id.0.wrapping_add(1))
            .max()
            .unwrap_or(0);
        self.fires = fires;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{Phase, Substance, SubstanceId, SubstanceRegistryBuilder};
    use crate::world::TickStats;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn quiet() -> CombustionConfig {
        CombustionConfig {
            spread_chance: 0.0,
            ..Default::default()
        }
    }

    fn setup(config: CombustionConfig) -> (CombustionEngine, WorldGrid, Xoshiro256StarStar) {
        let registry = Arc::new(SubstanceRegistry::with_defaults().unwrap());
        (
            CombustionEngine::new(registry, config),
            WorldGrid::new(IVec3::ZERO, IVec3::ONE, 1.0),
            Xoshiro256StarStar::seed_from_u64(11),
        )
    }

    #[test]
    fn test_ignite_rules() {
        let (mut engine, mut grid, _) = setup(quiet());
        let mut stats = TickStats::default();
        let stone = IVec3::new(1, 1, 1);
        let wood = IVec3::new(2, 1, 1);
        grid.set_cell(stone, SubstanceId::STONE, 1).unwrap();
        grid.set_cell(wood, SubstanceId::WOOD, 20).unwrap();

        assert_eq!(engine.ignite(&mut grid, stone, &mut stats), None);
        assert_eq!(engine.ignite(&mut grid, IVec3::new(9, 9, 9), &mut stats), None);

        let id = engine.ignite(&mut grid, wood, &mut stats).unwrap();
        assert_eq!(grid.cell(wood).unwrap().fire, Some(id));

        // Already burning
        assert_eq!(engine.ignite(&mut grid, wood, &mut stats), None);
        assert_eq!(engine.fires().len(), 1);
        assert_eq!(stats.ignitions, 1);
    }

    #[test]
    fn test_burn_time_strictly_decreases_until_extinguished() {
        let mut builder = SubstanceRegistryBuilder::new();
        builder
            .register(Substance {
                id: SubstanceId::AIR,
                name: "air".to_string(),
                phase: Phase::Gas,
                ..Default::default()
            })
            .register(Substance {
                id: 1,
                name: "log".to_string(),
                phase: Phase::Solid,
                flammable: true,
                burn_time: 10,
                ..Default::default()
            });
        let registry = Arc::new(builder.build().unwrap());
        let mut engine = CombustionEngine::new(registry, quiet());
        let mut grid = WorldGrid::new(IVec3::ZERO, IVec3::ONE, 1.0);
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let mut stats = TickStats::default();
        let pos = IVec3::new(4, 4, 4);
        grid.set_cell(pos, 1, 50).unwrap();

        let id = engine.ignite(&mut grid, pos, &mut stats).unwrap();
        let mut last = 10;
        for call in 1..=10 {
            let (outcome, fire) = engine.burn(&mut grid, id, &mut stats, &mut rng).unwrap();
            assert!(fire.burn_time_left < last);
            last = fire.burn_time_left;
            if call < 10 {
                assert_eq!(outcome, BurnOutcome::Burning);
            } else {
                assert_eq!(outcome, BurnOutcome::Extinguished);
                assert_eq!(fire.burn_time_left, 0);
            }
        }

        let cell = grid.cell(pos).unwrap();
        assert_eq!((cell.substance, cell.motes), (1, 40));
        assert!(!cell.is_burning());
        assert!(engine.fires().is_empty());
        assert_eq!(stats.fires_extinguished, 1);
    }

    #[test]
    fn test_fire_consumes_small_fuel() {
        let (mut engine, mut grid, mut rng) = setup(quiet());
        let mut stats = TickStats::default();
        let pos = IVec3::new(3, 3, 3);
        grid.set_cell(pos, SubstanceId::WOOD, 3).unwrap();
        let id = engine.ignite(&mut grid, pos, &mut stats).unwrap();

        engine.burn(&mut grid, id, &mut stats, &mut rng);
        engine.burn(&mut grid, id, &mut stats, &mut rng);
        let (outcome, _) = engine.burn(&mut grid, id, &mut stats, &mut rng).unwrap();

        assert_eq!(outcome, BurnOutcome::Consumed);
        assert!(grid.cell(pos).unwrap().is_air());
        assert!(engine.burn(&mut grid, id, &mut stats, &mut rng).is_none());
        assert_eq!(stats.fires_consumed, 1);
    }

    #[test]
    fn test_burning_heats_cell() {
        let (mut engine, mut grid, mut rng) = setup(quiet());
        let pos = IVec3::new(3, 3, 3);
        grid.set_cell(pos, SubstanceId::WOOD, 30).unwrap();
        let before = grid.cell(pos).unwrap().temperature;
        let id = engine.ignite(&mut grid, pos, &mut TickStats::default()).unwrap();

        engine.burn(&mut grid, id, &mut TickStats::default(), &mut rng);

        let heat = CombustionConfig::default().heat_per_burn;
        assert_eq!(grid.cell(pos).unwrap().temperature, before + heat);
    }

    #[test]
    fn test_smoke_after_half_and_never_below() {
        let (mut engine, mut grid, mut rng) = setup(quiet());
        let pos = IVec3::new(5, 5, 5);
        grid.set_cell(pos, SubstanceId::WOOD, 100).unwrap();
        let id = engine.ignite(&mut grid, pos, &mut TickStats::default()).unwrap();

        let count_smoke = |grid: &WorldGrid| grid.total_motes(SubstanceId::SMOKE);

        // Wood burns for 12 calls; no smoke during the first half
        for _ in 0..6 {
            engine.burn(&mut grid, id, &mut TickStats::default(), &mut rng);
        }
        assert_eq!(count_smoke(&grid), 0);

        engine.burn(&mut grid, id, &mut TickStats::default(), &mut rng);
        assert_eq!(count_smoke(&grid), 1);
        assert!(grid.cell(pos - IVec3::Y).unwrap().is_air());
    }

    #[test]
    fn test_spread_ignites_neighbor_next_run() {
        let config = CombustionConfig {
            spread_chance: 1.0,
            ignite_from_temperature: false,
            ..Default::default()
        };
        let (mut engine, mut grid, mut rng) = setup(config);
        let mut stats = TickStats::default();
        let pos = IVec3::new(5, 5, 5);
        let neighbor = pos + IVec3::X;
        grid.set_cell(pos, SubstanceId::WOOD, 50).unwrap();
        grid.set_cell(neighbor, SubstanceId::WOOD, 50).unwrap();
        engine.ignite(&mut grid, pos, &mut stats).unwrap();

        let region = ActiveRegion::whole_world(&grid);
        assert_eq!(engine.run(&mut grid, &region, &mut stats, &mut rng), 1);

        assert!(grid.cell(neighbor).unwrap().is_burning());
        assert_eq!(engine.fires().len(), 2);
        // The new fire has not burned yet
        let spread = engine.fire_at(neighbor).unwrap();
        assert_eq!(spread.burn_time_left, spread.burn_time);
    }

    #[test]
    fn test_hot_cell_ignites_on_its_layer() {
        let (mut engine, mut grid, mut rng) = setup(quiet());
        let pos = IVec3::new(6, 0, 6);
        grid.set_cell(pos, SubstanceId::OIL, 5).unwrap();
        grid.cell_mut_untracked(pos).unwrap().temperature = 250.0;

        let mut stats = TickStats::default();
        let region = ActiveRegion::whole_world(&grid);
        engine.run(&mut grid, &region, &mut stats, &mut rng);

        assert_eq!(stats.ignitions, 1);
        assert!(engine.fire_at(pos).is_some());
    }

    #[test]
    fn test_stale_fire_is_reaped() {
        let (mut engine, mut grid, mut rng) = setup(quiet());
        let mut stats = TickStats::default();
        let pos = IVec3::new(5, 5, 5);
        grid.set_cell(pos, SubstanceId::WOOD, 50).unwrap();
        engine.ignite(&mut grid, pos, &mut stats).unwrap();

        grid.set_cell(pos, SubstanceId::AIR, 0).unwrap();
        let region = ActiveRegion::whole_world(&grid);
        engine.run(&mut grid, &region, &mut stats, &mut rng);

        assert!(engine.fires().is_empty());
        assert_eq!(stats.fires_extinguished, 1);
    }

    #[test]
    fn test_transmuted_fire_releases_cell() {
        let (mut engine, mut grid, mut rng) = setup(quiet());
        let mut stats = TickStats::default();
        let pos = IVec3::new(5, 5, 5);
        grid.set_cell(pos, SubstanceId::WOOD, 50).unwrap();
        let id = engine.ignite(&mut grid, pos, &mut stats).unwrap();

        // Substance swapped underneath a live fire
        grid.update_cell(pos, |c| c.substance = SubstanceId::OIL);
        let (outcome, _) = engine.burn(&mut grid, id, &mut stats, &mut rng).unwrap();

        assert_eq!(outcome, BurnOutcome::Extinguished);
        assert!(!grid.cell(pos).unwrap().is_burning());
        assert_eq!(grid.cell(pos).unwrap().motes, 50);
        assert!(engine.ignite(&mut grid, pos, &mut stats).is_some());
    }

    #[test]
    fn test_smoking_with_huge_burn_time() {
        let fire = |burn_time_left| Fire {
            id: FireId(0),
            cell: IVec3::ZERO,
            burn_time: u32::MAX,
            burn_time_left,
            original_substance: SubstanceId::WOOD,
        };
        assert!(!fire(u32::MAX).is_smoking());
        assert!(!fire(u32::MAX / 2 + 1).is_smoking());
        assert!(fire(u32::MAX / 2).is_smoking());
        assert!(fire(0).is_smoking());
    }

    #[test]
    fn test_fires_outside_active_region_wait() {
        let registry = Arc::new(SubstanceRegistry::with_defaults().unwrap());
        let mut engine = CombustionEngine::new(registry, quiet());
        let mut grid = WorldGrid::new(IVec3::ZERO, IVec3::new(2, 1, 1), 1.0);
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        let pos = IVec3::new(20, 2, 2);
        grid.set_cell(pos, SubstanceId::WOOD, 50).unwrap();
        let id = engine.ignite(&mut grid, pos, &mut TickStats::default()).unwrap();

        let region = ActiveRegion::from_chunks(vec![IVec3::ZERO]);
        assert_eq!(engine.run(&mut grid, &region, &mut TickStats::default(), &mut rng), 0);
        let fire = engine.fire(id).unwrap();
        assert_eq!(fire.burn_time_left, fire.burn_time);
    }

    #[test]
    fn test_explicit_extinguish_keeps_substance() {
        let (mut engine, mut grid, _) = setup(quiet());
        let pos = IVec3::new(5, 5, 5);
        grid.set_cell(pos, SubstanceId::WOOD, 50).unwrap();
        engine.ignite(&mut grid, pos, &mut TickStats::default()).unwrap();

        assert!(engine.extinguish(&mut grid, pos, &mut TickStats::default()));
        let cell = grid.cell(pos).unwrap();
        assert_eq!((cell.substance, cell.motes), (SubstanceId::WOOD, 50));
        assert!(!cell.is_burning());
        assert!(!engine.extinguish(&mut grid, pos, &mut TickStats::default()));
    }

    #[test]
    fn test_restore_fires_continues_ids() {
        let (mut engine, mut grid, _) = setup(quiet());
        engine.restore_fires(vec![Fire {
            id: FireId(41),
            cell: IVec3::new(1, 1, 1),
            burn_time: 12,
            burn_time_left: 4,
            original_substance: SubstanceId::WOOD,
        }]);

        let pos = IVec3::new(8, 8, 8);
        grid.set_cell(pos, SubstanceId::WOOD, 5).unwrap();
        let id = engine.ignite(&mut grid, pos, &mut TickStats::default()).unwrap();
        assert_eq!(id, FireId(42));
    }
}
