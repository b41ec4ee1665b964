//! Contact-triggered transmutation
//!
//! One cycling y-layer per active chunk per invocation. For each cell whose
//! substance owns transmutation rules, rules are tried in declaration order
//! against the cell's face neighbors; the first rule whose trigger is present
//! replaces the cell's substance, keeping its motes.

use std::sync::Arc;

use glam::IVec3;

use super::scheduler::LayerCursors;
use crate::simulation::{CHUNK_DEPTH, CHUNK_WIDTH, SubstanceRegistry};
use crate::world::{ActiveRegion, NeighborQueries, SimStats, WorldGrid};

pub struct TransmutationEngine {
    registry: Arc<SubstanceRegistry>,
    cursors: LayerCursors,
}

impl TransmutationEngine {
    pub fn new(registry: Arc<SubstanceRegistry>) -> Self {
        Self {
            registry,
            cursors: LayerCursors::new(),
        }
    }

    pub fn run(&mut self, grid: &mut WorldGrid, active: &ActiveRegion, stats: &mut dyn SimStats) -> usize {
        let mut count = 0;

        for &chunk_pos in active.chunks() {
            let y = self.cursors.next(chunk_pos);
            for z in 0..CHUNK_DEPTH {
                for x in 0..CHUNK_WIDTH {
                    let global = WorldGrid::chunk_to_world_coords(chunk_pos, x, y, z);
                    if self.transmute_cell(grid, global, stats) {
                        count += 1;
                    }
                }
            }
        }

        if count > 0 {
            log::debug!("Transmutation pass: {} cells changed", count);
        }
        count
    }

    /// Try the cell's rules against its neighbors. Returns true on a change.
    pub fn transmute_cell(&self, grid: &mut WorldGrid, pos: IVec3, stats: &mut dyn SimStats) -> bool {
        let Some(cell) = grid.cell(pos) else {
            return false;
        };
        if cell.is_air() {
            return false;
        }
        let rules = &self.registry.get(cell.substance).transmutations;
        if rules.is_empty() {
            return false;
        }

        let neighbors = NeighborQueries::neighbor_substances(grid, pos);
        let Some(rule) = rules
            .iter()
            .find(|rule| neighbors.contains(&rule.trigger))
        else {
            return false;
        };

        let product = rule.product;
        grid.update_cell(pos, |cell| {
            cell.substance = product;
            cell.fire = None;
        });
        stats.record_transmutation();
        log::trace!("Transmuted {:?} into substance {}", pos, product);
        true
    }

    pub fn cursors(&self) -> &LayerCursors {
        &self.cursors
    }
}
