//! Thermal transitions
//!
//! Handles substance changes driven by a cell's temperature:
//! - Melting (solid → liquid)
//! - Freezing (liquid → solid)
//! - Evaporating (liquid → gas)
//! - Condensing (gas → liquid)
//!
//! The pass only reads and writes the cell it is looking at, so with the
//! `parallel` feature active chunks are processed concurrently.

use std::sync::Arc;

#[cfg(feature = "parallel")]
use ahash::AHashSet;
use glam::IVec3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::config::{RulePrecedence, ThermalConfig};
use crate::simulation::{
    CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH, SubstanceId, SubstanceRegistry, TransitionRule,
};
use crate::world::{ActiveRegion, Chunk, SimStats, WorldGrid};

/// Applies temperature-threshold transitions to every active cell
pub struct ThermalEngine {
    registry: Arc<SubstanceRegistry>,
    config: ThermalConfig,
}

impl ThermalEngine {
    pub fn new(registry: Arc<SubstanceRegistry>, config: ThermalConfig) -> Self {
        Self { registry, config }
    }

    /// Pick the rule that fires at `temperature`, if any
    pub fn select_transition(
        rules: &[TransitionRule],
        temperature: f32,
        precedence: RulePrecedence,
    ) -> Option<&TransitionRule> {
        let mut matching = rules.iter().filter(|rule| rule.matches(temperature));
        match precedence {
            RulePrecedence::FirstMatch => matching.next(),
            RulePrecedence::LastMatch => matching.last(),
        }
    }

    /// One pass over every cell of every active chunk. Returns the number of
    /// cells that changed substance.
    pub fn run(&self, grid: &mut WorldGrid, active: &ActiveRegion, stats: &mut dyn SimStats) -> usize {
        let registry = self.registry.as_ref();
        let precedence = self.config.precedence;

        #[cfg(feature = "parallel")]
        let changed: Vec<IVec3> = {
            let active: AHashSet<IVec3> = active.chunks().iter().copied().collect();
            grid.chunks_mut()
                .par_iter_mut()
                .filter(|chunk| active.contains(&chunk.pos))
                .flat_map_iter(|chunk| Self::transition_chunk(chunk, registry, precedence))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let changed: Vec<IVec3> = {
            let mut changed = Vec::new();
            for &chunk_pos in active.chunks() {
                if let Some(chunk) = grid.chunk_mut(chunk_pos) {
                    changed.extend(Self::transition_chunk(chunk, registry, precedence));
                }
            }
            changed
        };

        for &pos in &changed {
            grid.record_mutation(pos);
            stats.record_phase_change();
        }

        if !changed.is_empty() {
            log::debug!("Thermal pass: {} phase changes", changed.len());
        }
        changed.len()
    }

    /// Apply transitions inside one chunk, returning the global coordinates
    /// of changed cells
    fn transition_chunk(
        chunk: &mut Chunk,
        registry: &SubstanceRegistry,
        precedence: RulePrecedence,
    ) -> Vec<IVec3> {
        let mut changed = Vec::new();

        for y in 0..CHUNK_HEIGHT {
            for z in 0..CHUNK_DEPTH {
                for x in 0..CHUNK_WIDTH {
                    let cell = chunk.get(x, y, z);
                    if cell.is_air() {
                        continue;
                    }
                    let rules = &registry.get(cell.substance).transitions;
                    if rules.is_empty() {
                        continue;
                    }
                    let Some(rule) = Self::select_transition(rules, cell.temperature, precedence)
                    else {
                        continue;
                    };

                    let cell = chunk.get_mut(x, y, z);
                    if rule.product == SubstanceId::AIR {
                        cell.clear();
                    } else {
                        cell.substance = rule.product;
                        cell.idle_ticks = 0;
                        cell.fire = None;
                    }
                    changed.push(WorldGrid::chunk_to_world_coords(chunk.pos, x, y, z));
                }
            }
        }

        if !changed.is_empty() {
            chunk.mark_dirty();
        }
        changed
    }
}
