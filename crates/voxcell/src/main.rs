mod config;
mod scenario;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use glam::Vec3;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use voxcell_core::simulation::{SubstanceId, SubstanceRegistry};
use voxcell_core::world::{FIXED_TIMESTEP, TickStats, VoxelWorld};

use crate::config::RunnerConfig;
use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Demo world to simulate: pool, cloud, bonfire, all
    #[arg(long, default_value = "all")]
    scenario: String,

    /// Number of fixed 1/60 s ticks to run
    #[arg(long, default_value = "600")]
    ticks: u64,

    /// Seed for the simulation RNG
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Save the final world(s) under this directory
    #[arg(long)]
    save: Option<PathBuf>,

    /// Continue a previously saved world instead of building a scenario
    #[arg(long)]
    load: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = RunnerConfig::load()?;
    let registry = Arc::new(load_registry(&config)?);
    log::info!("Substance catalog: {} substances", registry.len());

    if let Some(dir) = &args.load {
        let mut world = VoxelWorld::load(dir, registry, config.simulation.clone())?;
        let poi = Scenario::point_of_interest(&world);
        run(&mut world, "loaded", poi, &args, &config)?;
        if let Some(out) = &args.save {
            world.save(out)?;
        }
        return Ok(());
    }

    let scenarios: Vec<Scenario> = if args.scenario.eq_ignore_ascii_case("all") {
        Scenario::ALL.to_vec()
    } else {
        vec![args.scenario.parse::<Scenario>()?]
    };

    for scenario in scenarios {
        let mut world = scenario
            .create_world(registry.clone(), config.simulation.clone())
            .with_context(|| format!("Failed to build scenario '{}'", scenario.name()))?;
        let poi = Scenario::point_of_interest(&world);
        run(&mut world, scenario.name(), poi, &args, &config)?;

        if let Some(out) = &args.save {
            world.save(&out.join(scenario.name()))?;
        }
    }

    Ok(())
}

fn load_registry(config: &RunnerConfig) -> anyhow::Result<SubstanceRegistry> {
    match &config.runner.substances {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read substance catalog {:?}", path))?;
            SubstanceRegistry::from_ron(&source)
                .with_context(|| format!("Invalid substance catalog {:?}", path))
        }
        None => Ok(SubstanceRegistry::with_defaults()?),
    }
}

/// Drive a world for `args.ticks` fixed steps, logging stats periodically
fn run(
    world: &mut VoxelWorld,
    label: &str,
    poi: Vec3,
    args: &Args,
    config: &RunnerConfig,
) -> anyhow::Result<()> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(args.seed);
    let mut stats = TickStats::default();
    let mut total = TickStats::default();
    let log_every = config.runner.log_every.max(1);

    log::info!(
        "[{}] Running {} ticks ({:.1}s simulated), seed {}",
        label,
        args.ticks,
        args.ticks as f32 * FIXED_TIMESTEP,
        args.seed
    );

    let mut remeshed = 0;
    for tick in 1..=args.ticks {
        world.step(poi, &mut stats, &mut rng);
        // Stand-in for the mesher: poll and clear dirty flags every tick
        remeshed += world.take_dirty_chunks().len();

        if tick % log_every == 0 || tick == args.ticks {
            log_tick(label, world, &stats, remeshed);
            accumulate(&mut total, &stats);
            stats.reset();
            remeshed = 0;
        }
    }

    log::info!(
        "[{}] Done at tick {}: {} motes moved, {} phase changes, {} transmutations, {} fires started",
        label,
        world.tick_count(),
        total.motes_moved,
        total.phase_changes,
        total.transmutations,
        total.ignitions
    );
    log_inventory(label, world);
    Ok(())
}

fn log_tick(label: &str, world: &VoxelWorld, stats: &TickStats, remeshed: usize) {
    log::info!(
        "[{}] tick {}: moved {} motes, {} phase, {} transmute, {} rain, {} evap, {} fires ({} lit, {} consumed, {} out), {} static, {} remeshed",
        label,
        world.tick_count(),
        stats.motes_moved,
        stats.phase_changes,
        stats.transmutations,
        stats.condensations,
        stats.evaporations,
        world.fires().len(),
        stats.ignitions,
        stats.fires_consumed,
        stats.fires_extinguished,
        world.static_liquid_cells(),
        remeshed
    );
}

fn accumulate(total: &mut TickStats, stats: &TickStats) {
    total.motes_moved += stats.motes_moved;
    total.phase_changes += stats.phase_changes;
    total.transmutations += stats.transmutations;
    total.ignitions += stats.ignitions;
    total.fires_consumed += stats.fires_consumed;
    total.fires_extinguished += stats.fires_extinguished;
    total.condensations += stats.condensations;
    total.evaporations += stats.evaporations;
    total.static_entries += stats.static_entries;
}

/// Debug summary of motes per substance
fn log_inventory(label: &str, world: &VoxelWorld) {
    for substance in world.registry().iter() {
        if substance.id == SubstanceId::AIR {
            continue;
        }
        let motes = world.grid().total_motes(substance.id);
        if motes > 0 {
            log::debug!("[{}] {}: {} motes", label, substance.name, motes);
        }
    }
}
