//! Liquid flow - per-mote transfers with a settle optimization
//!
//! Each pass samples `CHUNK_VOLUME / sample_divisor` random cells per active
//! chunk. A sampled liquid cell moves exactly one mote (or pulls one in) per
//! visit. Cells that go `static_threshold` visits without changing are parked
//! in a static set and skipped until a write lands on them or a face
//! neighbor.

use std::sync::Arc;

use ahash::AHashSet;
use glam::IVec3;
use smallvec::SmallVec;

use super::config::LiquidConfig;
use crate::simulation::{CHUNK_DEPTH, CHUNK_VOLUME, CHUNK_WIDTH, SubstanceRegistry};
use crate::world::{ActiveRegion, Direction, NeighborQueries, SimStats, WorldGrid, WorldRng};

/// Gravity and pressure equalization for liquids
pub struct LiquidFlowEngine {
    registry: Arc<SubstanceRegistry>,
    config: LiquidConfig,
    static_cells: AHashSet<IVec3>,
    passes: u32,
}

impl LiquidFlowEngine {
    pub fn new(registry: Arc<SubstanceRegistry>, config: LiquidConfig) -> Self {
        Self {
            registry,
            config,
            static_cells: AHashSet::new(),
            passes: 0,
        }
    }

    /// One pass over the active region. Returns the number of transfers.
    pub fn run<R: WorldRng>(
        &mut self,
        grid: &mut WorldGrid,
        active: &ActiveRegion,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> usize {
        self.wake_from_mutations(grid);

        self.passes = self.passes.wrapping_add(1);
        if self.config.revalidate_every > 0 && self.passes % self.config.revalidate_every == 0 {
            log::debug!(
                "Revalidating {} static liquid cells",
                self.static_cells.len()
            );
            self.clear_static(grid);
        }

        let samples = (CHUNK_VOLUME / self.config.sample_divisor.max(1)).max(1);
        let mut transfers = 0;

        for &chunk_pos in active.chunks() {
            for _ in 0..samples {
                let index = rng.gen_index(CHUNK_VOLUME);
                let x = index % CHUNK_WIDTH;
                let z = (index / CHUNK_WIDTH) % CHUNK_DEPTH;
                let y = index / (CHUNK_WIDTH * CHUNK_DEPTH);
                let global = WorldGrid::chunk_to_world_coords(chunk_pos, x, y, z);

                if self.flow_cell(grid, global, stats, rng) {
                    transfers += 1;
                }
            }
        }

        log::trace!(
            "Liquid pass {}: {} transfers, {} static",
            self.passes,
            transfers,
            self.static_cells.len()
        );
        transfers
    }

    /// Process one sampled cell. Returns true if a mote moved.
    pub fn flow_cell<R: WorldRng>(
        &mut self,
        grid: &mut WorldGrid,
        pos: IVec3,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> bool {
        let Some(cell) = grid.cell(pos).copied() else {
            return false;
        };
        if cell.motes == 0 || !self.registry.is_liquid(cell.substance) {
            return false;
        }
        if self.static_cells.contains(&pos) {
            return false;
        }

        // 1. Settle counter
        let idle = cell.idle_ticks.saturating_add(1);
        if let Some(c) = grid.cell_mut_untracked(pos) {
            c.idle_ticks = idle;
        }
        if idle > self.config.static_threshold {
            self.static_cells.insert(pos);
            stats.record_static_entry();
            log::trace!("Liquid at {:?} settled", pos);
            return false;
        }

        // 2. Classify neighbors
        let substance = cell.substance;
        let below = NeighborQueries::neighbor(grid, pos, Direction::Down);
        let below_cell = below.and_then(|p| grid.cell(p).copied());

        let mut same: SmallVec<[IVec3; 6]> = SmallVec::new();
        let mut open: SmallVec<[IVec3; 5]> = SmallVec::new();
        for neighbor in NeighborQueries::neighbors6(grid, pos).into_iter().flatten() {
            let Some(n) = grid.cell(neighbor) else {
                continue;
            };
            if n.substance == substance {
                same.push(neighbor);
            } else if n.is_air() && neighbor.y <= pos.y {
                open.push(neighbor);
            }
        }

        // 3./4. Pick a single-mote transfer
        let transfer = if cell.motes == 1 {
            let below_is_air = below_cell.is_some_and(|c| c.is_air());
            let donors: SmallVec<[IVec3; 6]> = same
                .iter()
                .copied()
                .filter(|&n| grid.cell(n).is_some_and(|c| c.motes > 1))
                .collect();

            if same.is_empty() && below_is_air {
                below.map(|b| (pos, b))
            } else if let Some(&donor) = rng.choose(&donors) {
                Some((donor, pos))
            } else {
                rng.choose(&open).map(|&target| (pos, target))
            }
        } else {
            let below_accepts = below_cell
                .is_some_and(|c| c.is_air() || (c.substance == substance && c.room() > 0));

            if below_accepts {
                below.map(|b| (pos, b))
            } else {
                rng.choose(&open).map(|&target| (pos, target))
            }
        };

        let Some((from, to)) = transfer else {
            return false;
        };

        // 5. Move one mote; both ends leave the static set
        let moved = grid.move_motes(from, to, 1);
        if moved == 0 {
            return false;
        }
        self.static_cells.remove(&from);
        self.static_cells.remove(&to);
        stats.record_mote_transfer(moved);
        true
    }

    /// Drain the grid's mutation log and wake every static cell that was
    /// written or sits next to a write
    pub fn wake_from_mutations(&mut self, grid: &mut WorldGrid) {
        let mutations = grid.take_mutations();
        if mutations.overflowed() {
            log::warn!(
                "Mutation log overflowed, waking all {} static liquid cells",
                self.static_cells.len()
            );
            self.clear_static(grid);
            return;
        }
        if self.static_cells.is_empty() {
            return;
        }

        for &pos in mutations.touched() {
            self.wake(grid, pos);
            for direction in Direction::ALL {
                self.wake(grid, pos + direction.offset());
            }
        }
    }

    fn wake(&mut self, grid: &mut WorldGrid, pos: IVec3) {
        if self.static_cells.remove(&pos)
            && let Some(cell) = grid.cell_mut_untracked(pos)
        {
            cell.idle_ticks = 0;
        }
    }

    fn clear_static(&mut self, grid: &mut WorldGrid) {
        for pos in self.static_cells.drain() {
            if let Some(cell) = grid.cell_mut_untracked(pos) {
                cell.idle_ticks = 0;
            }
        }
    }

    pub fn is_static(&self, pos: IVec3) -> bool {
        self.static_cells.contains(&pos)
    }

    pub fn static_count(&self) -> usize {
        self.static_cells.len()
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }
}
