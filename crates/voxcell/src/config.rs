//! Runner configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `voxcell.ron` file (if exists)
//! 3. Environment variables prefixed with `VOXCELL_`
//!
//! Example environment variable: `VOXCELL_SIMULATION__GAS__MAX_GAS_HEIGHT=40`

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use voxcell_core::simulation::SimulationConfig;

/// Everything the headless runner reads at startup
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub runner: RunnerSettings,
}

/// Settings of the runner itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Ticks between stats log lines
    pub log_every: u64,
    /// Optional RON substance catalog replacing the built-in one
    pub substances: Option<PathBuf>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            log_every: 60,
            substances: None,
        }
    }
}

impl RunnerConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `voxcell.ron` file (if exists)
    /// 3. Environment variables prefixed with `VOXCELL_` (highest priority)
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name("voxcell")
                    .format(FileFormat::Ron)
                    .required(false),
            )
            // Layer 3: Environment variables (VOXCELL_RUNNER__LOG_EVERY, etc.)
            .add_source(Environment::with_prefix("VOXCELL").separator("__"));

        Self::build(builder)
    }

    /// Layer 1: compiled defaults, so files may override single keys
    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let sim = SimulationConfig::default();
        let builder = Config::builder()
            .set_default("simulation.grid.voxel_size", sim.grid.voxel_size as f64)?
            .set_default("simulation.grid.active_radius", sim.grid.active_radius as i64)?
            .set_default("simulation.intervals.liquid", sim.intervals.liquid as f64)?
            .set_default("simulation.intervals.gas", sim.intervals.gas as f64)?
            .set_default("simulation.intervals.thermal", sim.intervals.thermal as f64)?
            .set_default(
                "simulation.intervals.transmutation",
                sim.intervals.transmutation as f64,
            )?
            .set_default(
                "simulation.intervals.water_cycle",
                sim.intervals.water_cycle as f64,
            )?
            .set_default("simulation.intervals.combustion", sim.intervals.combustion as f64)?
            .set_default(
                "simulation.liquid.static_threshold",
                sim.liquid.static_threshold as i64,
            )?
            .set_default(
                "simulation.liquid.sample_divisor",
                sim.liquid.sample_divisor as i64,
            )?
            .set_default(
                "simulation.liquid.revalidate_every",
                sim.liquid.revalidate_every as i64,
            )?
            .set_default("simulation.gas.max_gas_height", sim.gas.max_gas_height as i64)?
            .set_default("simulation.thermal.precedence", "LastMatch")?
            .set_default(
                "simulation.water_cycle.precipitation_threshold",
                sim.water_cycle.precipitation_threshold as i64,
            )?
            .set_default(
                "simulation.water_cycle.precipitation_amount",
                sim.water_cycle.precipitation_amount as i64,
            )?
            .set_default(
                "simulation.water_cycle.evaporate_every",
                sim.water_cycle.evaporate_every as i64,
            )?
            .set_default(
                "simulation.combustion.smoke_substance",
                sim.combustion.smoke_substance.clone(),
            )?
            .set_default(
                "simulation.combustion.spread_chance",
                sim.combustion.spread_chance as f64,
            )?
            .set_default(
                "simulation.combustion.heat_per_burn",
                sim.combustion.heat_per_burn as f64,
            )?
            .set_default(
                "simulation.combustion.ignite_from_temperature",
                sim.combustion.ignite_from_temperature,
            )?
            .set_default("runner.log_every", 60_i64)?;
        Ok(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
