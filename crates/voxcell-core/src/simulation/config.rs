//! Simulation tuning parameters
//!
//! Every engine reads its knobs from one of the sections below. The runner
//! fills these from layered config sources; tests build them directly.

use serde::{Deserialize, Serialize};

/// All simulation settings, grouped per subsystem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub intervals: IntervalConfig,

    #[serde(default)]
    pub liquid: LiquidConfig,

    #[serde(default)]
    pub gas: GasConfig,

    #[serde(default)]
    pub thermal: ThermalConfig,

    #[serde(default)]
    pub water_cycle: WaterCycleConfig,

    #[serde(default)]
    pub combustion: CombustionConfig,
}

/// Coordinate mapping and active region settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of one voxel in world units
    pub voxel_size: f32,
    /// Chebyshev radius in chunks around the point of interest
    pub active_radius: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.25,
            active_radius: 2,
        }
    }
}

/// Seconds between runs of each subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub liquid: f32,
    pub gas: f32,
    pub thermal: f32,
    pub transmutation: f32,
    pub water_cycle: f32,
    pub combustion: f32,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            liquid: 1.0 / 60.0,
            gas: 1.0 / 30.0,
            thermal: 1.0 / 10.0,
            transmutation: 1.0 / 30.0,
            water_cycle: 1.0 / 20.0,
            combustion: 1.0 / 15.0,
        }
    }
}

/// Liquid flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidConfig {
    /// Idle samples after which a cell is considered settled
    pub static_threshold: u8,
    /// Cells sampled per chunk = chunk volume / divisor
    pub sample_divisor: usize,
    /// Passes between wholesale static-set resets (0 disables)
    pub revalidate_every: u32,
}

impl Default for LiquidConfig {
    fn default() -> Self {
        Self {
            static_threshold: 5,
            sample_divisor: 8,
            revalidate_every: 256,
        }
    }
}

/// Gas flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Global voxel Y at and above which gas stops rising
    pub max_gas_height: i32,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self { max_gas_height: 60 }
    }
}

/// Which transition wins when several match in one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulePrecedence {
    /// The last matching rule in declaration order is applied
    #[default]
    LastMatch,
    /// The first matching rule in declaration order is applied
    FirstMatch,
}

/// Thermal transition settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    pub precedence: RulePrecedence,
}

/// Evaporation / precipitation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterCycleConfig {
    /// Minimum motes in a gas cell before it rains
    pub precipitation_threshold: u16,
    /// Motes deposited per condense event
    pub precipitation_amount: u16,
    /// Every Nth invocation evaporates, the others condense
    pub evaporate_every: u32,
}

impl Default for WaterCycleConfig {
    fn default() -> Self {
        Self {
            precipitation_threshold: 100,
            precipitation_amount: 100,
            evaporate_every: 5,
        }
    }
}

/// Fire settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombustionConfig {
    /// Substance emitted by burning cells, looked up by name
    pub smoke_substance: String,
    /// Chance per Burn() to ignite one burnable neighbor
    pub spread_chance: f32,
    /// Degrees added to the burning cell per Burn()
    pub heat_per_burn: f32,
    /// Ignite burnable cells hotter than their ignition temperature
    pub ignite_from_temperature: bool,
}

impl Default for CombustionConfig {
    fn default() -> Self {
        Self {
            smoke_substance: "smoke".to_string(),
            spread_chance: 0.1,
            heat_per_burn: 5.0,
            ignite_from_temperature: true,
        }
    }
}
