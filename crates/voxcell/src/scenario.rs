//! Demo worlds for the headless runner
//!
//! Each scenario lays out a small world that exercises a subset of the
//! simulation passes.

use std::str::FromStr;
use std::sync::Arc;

use glam::{IVec3, Vec3};
use voxcell_core::simulation::{MAX_MOTES, SimulationConfig, SubstanceId, SubstanceRegistry};
use voxcell_core::world::{GridError, VoxelWorld};

/// Chunk range shared by every scenario: x, z in [-16, 16), y in [0, 64)
const ORIGIN: IVec3 = IVec3::new(-1, 0, -1);
const EXTENT: IVec3 = IVec3::new(2, 4, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Water poured into a stone basin, spreading and settling
    Pool,
    /// Steam cloud raining onto a pond that slowly evaporates back
    Cloud,
    /// Stack of wood set alight next to an oil puddle
    Bonfire,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Pool, Scenario::Cloud, Scenario::Bonfire];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Pool => "pool",
            Scenario::Cloud => "cloud",
            Scenario::Bonfire => "bonfire",
        }
    }

    /// Build and populate a fresh world for this scenario
    pub fn create_world(
        &self,
        registry: Arc<SubstanceRegistry>,
        config: SimulationConfig,
    ) -> Result<VoxelWorld, GridError> {
        let mut world = VoxelWorld::new(registry, config, ORIGIN, EXTENT);
        floor(&mut world)?;
        match self {
            Scenario::Pool => pool(&mut world)?,
            Scenario::Cloud => cloud(&mut world)?,
            Scenario::Bonfire => bonfire(&mut world)?,
        }
        log::info!(
            "Built scenario '{}': {} non-air voxels",
            self.name(),
            world.grid().count_non_air()
        );
        Ok(world)
    }

    /// Keep the whole scenario inside the active region
    pub fn point_of_interest(world: &VoxelWorld) -> Vec3 {
        world.grid().voxel_to_position(IVec3::new(0, 32, 0))
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pool" => Ok(Scenario::Pool),
            "cloud" => Ok(Scenario::Cloud),
            "bonfire" => Ok(Scenario::Bonfire),
            _ => anyhow::bail!("Unknown scenario '{}', expected pool, cloud, bonfire or all", s),
        }
    }
}

/// Stone floor across the whole world at y = 0
fn floor(world: &mut VoxelWorld) -> Result<(), GridError> {
    let min = world.grid().min_voxel();
    let max = world.grid().max_voxel();
    for x in min.x..max.x {
        for z in min.z..max.z {
            world.spawn_voxel(IVec3::new(x, 0, z), SubstanceId::STONE, 1)?;
        }
    }
    Ok(())
}

/// Walls of a square basin with inner half-width `radius`, `height` tall
fn basin(world: &mut VoxelWorld, radius: i32, height: i32) -> Result<(), GridError> {
    let r = radius + 1;
    for x in -r..=r {
        for z in -r..=r {
            if x.abs() == r || z.abs() == r {
                for y in 1..=height {
                    world.spawn_voxel(IVec3::new(x, y, z), SubstanceId::STONE, 1)?;
                }
            }
        }
    }
    Ok(())
}

fn pool(world: &mut VoxelWorld) -> Result<(), GridError> {
    basin(world, 6, 4)?;
    // Column of water dropped into one corner
    for y in 8..20 {
        for x in -5..=-3 {
            world.spawn_voxel(IVec3::new(x, y, -5), SubstanceId::WATER, 200)?;
        }
    }
    // A dirt island that turns to mud once the water reaches it
    world.spawn_voxel(IVec3::new(3, 1, 3), SubstanceId::DIRT, 50)?;
    Ok(())
}

fn cloud(world: &mut VoxelWorld) -> Result<(), GridError> {
    basin(world, 4, 2)?;
    for x in -4..=4 {
        for z in -4..=4 {
            world.spawn_voxel(IVec3::new(x, 1, z), SubstanceId::WATER, 50)?;
        }
    }
    // Saturated cloud high above the pond
    for x in -2..=2 {
        world.spawn_voxel(IVec3::new(x, 48, 0), SubstanceId::STEAM, MAX_MOTES / 2)?;
    }
    // Cold cell that freezes part of the pond
    world.set_temperature(IVec3::new(4, 1, 4), -10.0)?;
    Ok(())
}

fn bonfire(world: &mut VoxelWorld) -> Result<(), GridError> {
    for y in 1..=3 {
        for x in -1..=1 {
            world.spawn_voxel(IVec3::new(x, y, 0), SubstanceId::WOOD, 80)?;
        }
    }
    for x in 3..=6 {
        world.spawn_voxel(IVec3::new(x, 1, 0), SubstanceId::OIL, 30)?;
    }
    world.ignite_voxel(IVec3::new(0, 1, 0), &mut voxcell_core::world::NoopStats)?;
    // A second log hot enough to catch on its own
    world.spawn_voxel(IVec3::new(-6, 1, -6), SubstanceId::WOOD, 40)?;
    world.set_temperature(IVec3::new(-6, 1, -6), 400.0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<SubstanceRegistry> {
        Arc::new(SubstanceRegistry::with_defaults().unwrap())
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Pool".parse::<Scenario>().unwrap(), Scenario::Pool);
        assert_eq!("bonfire".parse::<Scenario>().unwrap(), Scenario::Bonfire);
        assert!("volcano".parse::<Scenario>().is_err());
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
        }
    }

    #[test]
    fn test_every_scenario_builds() {
        for scenario in Scenario::ALL {
            let world = scenario
                .create_world(registry(), SimulationConfig::default())
                .unwrap();
            assert!(world.grid().count_non_air() > 0);
        }
    }

    #[test]
    fn test_bonfire_starts_burning() {
        let world = Scenario::Bonfire
            .create_world(registry(), SimulationConfig::default())
            .unwrap();
        assert_eq!(world.fires().len(), 1);
        assert!(world.grid().cell(IVec3::new(0, 1, 0)).unwrap().is_burning());
    }

    #[test]
    fn test_scenarios_fit_active_region() {
        let world = Scenario::Cloud
            .create_world(registry(), SimulationConfig::default())
            .unwrap();
        let poi = Scenario::point_of_interest(&world);
        let region = voxcell_core::world::ActiveRegion::compute(world.grid(), poi, 2);
        assert_eq!(region.len(), world.grid().chunks().len());
    }
}
