//! VoxelWorld - owns the grid and every engine, drives fixed-step ticks

use std::sync::Arc;

use glam::{IVec3, Vec3};

use super::{ActiveRegion, GridError, NoopStats, SimStats, WorldGrid, WorldRng};
use crate::simulation::{
    CombustionEngine, Fire, FireId, GasFlowEngine, LiquidFlowEngine, MAX_MOTES, Scheduler,
    SimulationConfig, Subsystem, SubstanceId, SubstanceRegistry, ThermalEngine, TransmutationEngine,
    WaterCycleEngine,
};

/// Length of one simulation step in seconds
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// Cap simulation steps per update to prevent a "spiral of death"
const MAX_STEPS_PER_UPDATE: u32 = 2;

/// The simulated world: grid, substance catalog and all subsystems
pub struct VoxelWorld {
    grid: WorldGrid,
    registry: Arc<SubstanceRegistry>,
    config: SimulationConfig,

    scheduler: Scheduler,
    liquid: LiquidFlowEngine,
    gas: GasFlowEngine,
    thermal: ThermalEngine,
    transmutation: TransmutationEngine,
    water_cycle: WaterCycleEngine,
    combustion: CombustionEngine,

    /// Chunks simulated in the current step
    active: ActiveRegion,

    /// Simulation time accumulator
    time_accumulator: f32,

    /// Fixed steps completed since the world was created
    tick_count: u64,
}

impl VoxelWorld {
    /// Build an all-air world of `extent` chunks starting at chunk `origin`
    pub fn new(
        registry: Arc<SubstanceRegistry>,
        config: SimulationConfig,
        origin: IVec3,
        extent: IVec3,
    ) -> Self {
        let grid = WorldGrid::new(origin, extent, config.grid.voxel_size);

        Self {
            scheduler: Scheduler::new(&config.intervals),
            liquid: LiquidFlowEngine::new(registry.clone(), config.liquid.clone()),
            gas: GasFlowEngine::new(registry.clone(), config.gas.clone()),
            thermal: ThermalEngine::new(registry.clone(), config.thermal.clone()),
            transmutation: TransmutationEngine::new(registry.clone()),
            water_cycle: WaterCycleEngine::new(
                registry.clone(),
                config.water_cycle.clone(),
                config.gas.max_gas_height,
            ),
            combustion: CombustionEngine::new(registry.clone(), config.combustion.clone()),
            active: ActiveRegion::default(),
            time_accumulator: 0.0,
            tick_count: 0,
            grid,
            registry,
            config,
        }
    }

    /// Advance by wall-clock `dt`, running up to two fixed steps
    pub fn update<R: WorldRng>(
        &mut self,
        dt: f32,
        point_of_interest: Vec3,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> u32 {
        self.time_accumulator += dt;

        let mut steps = 0;
        while self.time_accumulator >= FIXED_TIMESTEP && steps < MAX_STEPS_PER_UPDATE {
            self.step(point_of_interest, stats, rng);
            self.time_accumulator -= FIXED_TIMESTEP;
            steps += 1;
        }

        // Clamp accumulator to prevent runaway
        if self.time_accumulator > FIXED_TIMESTEP * 2.0 {
            self.time_accumulator = FIXED_TIMESTEP;
        }
        steps
    }

    /// Run exactly one fixed step
    pub fn step<R: WorldRng>(
        &mut self,
        point_of_interest: Vec3,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) {
        // 0. Fresh active-region snapshot for this step
        self.active = ActiveRegion::compute(
            &self.grid,
            point_of_interest,
            self.config.grid.active_radius,
        );

        // 1. Run every subsystem whose timer elapsed, in fixed order
        for subsystem in self.scheduler.advance(FIXED_TIMESTEP) {
            match subsystem {
                Subsystem::Liquid => {
                    self.liquid.run(&mut self.grid, &self.active, stats, rng);
                }
                Subsystem::Gas => {
                    self.gas.run(&mut self.grid, &self.active, stats);
                }
                Subsystem::Thermal => {
                    self.thermal.run(&mut self.grid, &self.active, stats);
                }
                Subsystem::Transmutation => {
                    self.transmutation.run(&mut self.grid, &self.active, stats);
                }
                Subsystem::WaterCycle => {
                    self.water_cycle.run(&mut self.grid, &self.active, stats);
                }
                Subsystem::Combustion => {
                    self.combustion
                        .run(&mut self.grid, &self.active, stats, rng);
                }
            }
        }

        self.tick_count += 1;
    }

    /// Replace a voxel with air, putting out any fire on it
    pub fn destroy_voxel(&mut self, pos: IVec3) -> Result<(), GridError> {
        self.grid.get_cell(pos)?;
        self.combustion.extinguish(&mut self.grid, pos, &mut NoopStats);
        self.grid.set_cell(pos, SubstanceId::AIR, 0)
    }

    /// Place `motes` of a substance, replacing whatever was there
    pub fn spawn_voxel(&mut self, pos: IVec3, substance: u16, motes: u16) -> Result<(), GridError> {
        if !self.registry.contains(substance) {
            return Err(GridError::UnknownSubstance(substance));
        }
        if substance == SubstanceId::AIR && motes > 0 {
            return Err(GridError::AirWithMotes);
        }
        if self.grid.get_cell(pos)?.is_burning() {
            self.combustion.extinguish(&mut self.grid, pos, &mut NoopStats);
        }
        self.grid.set_cell(pos, substance, motes)
    }

    /// Set a voxel on fire. Ok(None) when the cell cannot burn.
    pub fn ignite_voxel(
        &mut self,
        pos: IVec3,
        stats: &mut dyn SimStats,
    ) -> Result<Option<FireId>, GridError> {
        self.grid.get_cell(pos)?;
        let fire = self.combustion.ignite(&mut self.grid, pos, stats);
        self.grid.mark_dirty(pos);
        Ok(fire)
    }

    /// Overwrite the temperature of a location
    pub fn set_temperature(&mut self, pos: IVec3, temperature: f32) -> Result<(), GridError> {
        if self
            .grid
            .update_cell(pos, |cell| cell.temperature = temperature)
        {
            Ok(())
        } else {
            Err(GridError::OutOfBounds(pos))
        }
    }

    /// Positions of chunks whose geometry must be rebuilt, clearing the flags
    pub fn take_dirty_chunks(&mut self) -> Vec<IVec3> {
        self.grid.take_dirty_chunks()
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut WorldGrid {
        &mut self.grid
    }

    pub fn registry(&self) -> &Arc<SubstanceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Region used by the most recent step
    pub fn active_region(&self) -> &ActiveRegion {
        &self.active
    }

    pub fn fires(&self) -> &[Fire] {
        self.combustion.fires()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Liquid cells currently parked as settled
    pub fn static_liquid_cells(&self) -> usize {
        self.liquid.static_count()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl VoxelWorld {
    /// Write every non-empty chunk plus metadata under `dir`
    pub fn save(&mut self, dir: &std::path::Path) -> anyhow::Result<()> {
        use super::persistence::{WorldMetadata, WorldPersistence};

        let persistence = WorldPersistence::new(dir)?;
        let mut saved = 0;
        let mut failed = 0;

        for chunk in self.grid.chunks_mut() {
            let result = if chunk.count_non_air() == 0 {
                persistence.delete_chunk(chunk.pos)
            } else {
                persistence.save_chunk(chunk).map(|_| saved += 1)
            };
            match result {
                Ok(()) => chunk.unsaved = false,
                Err(e) => {
                    log::warn!("[SAVE] Failed to save chunk {:?}: {:#}", chunk.pos, e);
                    failed += 1;
                }
            }
        }

        let mut meta = WorldMetadata::new(
            self.grid.origin(),
            self.grid.extent(),
            self.grid.voxel_size(),
        );
        if let Ok(existing) = persistence.load_metadata() {
            meta.created_at = existing.created_at;
        }
        meta.tick_count = self.tick_count;
        meta.fires = self.combustion.fires().to_vec();
        persistence.save_metadata(&meta)?;

        anyhow::ensure!(failed == 0, "Failed to save {} chunks", failed);
        log::info!(
            "Saved world to {:?}: {} chunks, {} fires, tick {}",
            dir,
            saved,
            meta.fires.len(),
            self.tick_count
        );
        Ok(())
    }

    /// Rebuild a world saved with [`VoxelWorld::save`]
    pub fn load(
        dir: &std::path::Path,
        registry: Arc<SubstanceRegistry>,
        mut config: SimulationConfig,
    ) -> anyhow::Result<Self> {
        use super::persistence::WorldPersistence;
        use anyhow::Context;

        let persistence = WorldPersistence::open(dir)?;
        let meta = persistence.load_metadata()?;
        config.grid.voxel_size = meta.voxel_size;

        let mut world = Self::new(registry, config, meta.origin, meta.extent);
        let positions: Vec<IVec3> = world.grid.chunks().iter().map(|c| c.pos).collect();

        let mut loaded = 0;
        for pos in positions {
            let Some(chunk) = persistence.load_chunk(pos)? else {
                continue;
            };
            for cell in chunk.cells() {
                anyhow::ensure!(
                    world.registry.contains(cell.substance),
                    "Chunk {:?} references unknown substance {}",
                    pos,
                    cell.substance
                );
                anyhow::ensure!(
                    cell.motes <= MAX_MOTES && cell.is_air() == (cell.motes == 0),
                    "Chunk {:?} holds an invalid cell: substance {} with {} motes",
                    pos,
                    cell.substance,
                    cell.motes
                );
            }
            world
                .grid
                .insert_chunk(chunk)
                .with_context(|| format!("Failed to place chunk {:?}", pos))?;
            loaded += 1;
        }

        world.combustion.restore_fires(meta.fires);
        world.tick_count = meta.tick_count;

        log::info!("Loaded world from {:?}: {} chunks", dir, loaded);
        Ok(world)
    }
}
