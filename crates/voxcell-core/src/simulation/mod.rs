//! Simulation engines - flow, thermal, transmutation, water cycle, fire

pub mod combustion;
pub mod config;
pub mod gas;
pub mod liquid;
pub mod scheduler;
pub mod thermal;
pub mod transmutation;
pub mod water_cycle;

// Re-export from voxcell-simulation so engines and callers share one path
pub use voxcell_simulation::{
    AMBIENT_TEMPERATURE, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH, FireId, MAX_MOTES,
    Phase, RegistryError, Substance, SubstanceId, SubstanceRegistry, SubstanceRegistryBuilder,
    TransitionKind, TransitionRule, TransmutationRule, VoxelCell,
};

pub use combustion::{BurnOutcome, CombustionEngine, Fire};
pub use config::{
    CombustionConfig, GasConfig, GridConfig, IntervalConfig, LiquidConfig, RulePrecedence,
    SimulationConfig, ThermalConfig, WaterCycleConfig,
};
pub use gas::{GasFlowEngine, GasMove};
pub use liquid::LiquidFlowEngine;
pub use scheduler::{LayerCursors, Scheduler, Subsystem, SubsystemTimer};
pub use thermal::ThermalEngine;
pub use transmutation::TransmutationEngine;
pub use water_cycle::{CyclePhase, WaterCycleEngine};
