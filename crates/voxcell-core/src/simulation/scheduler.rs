//! Subsystem timers and per-chunk layer cursors
//!
//! The scheduler decides *when* each engine runs; layer cursors decide *which
//! slice* of a chunk an amortized engine touches on a given run. Contract for
//! cursors: every layer of a chunk is returned exactly once per
//! `CHUNK_HEIGHT` consecutive calls for that chunk.

use ahash::AHashMap;
use glam::IVec3;
use smallvec::SmallVec;

use super::config::IntervalConfig;
use crate::simulation::CHUNK_HEIGHT;

/// The simulation passes, in the order they run within one step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Liquid,
    Gas,
    Thermal,
    Transmutation,
    WaterCycle,
    Combustion,
}

impl Subsystem {
    pub const ALL: [Subsystem; 6] = [
        Subsystem::Liquid,
        Subsystem::Gas,
        Subsystem::Thermal,
        Subsystem::Transmutation,
        Subsystem::WaterCycle,
        Subsystem::Combustion,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Accumulated-time timer against a fixed interval
#[derive(Debug, Clone)]
pub struct SubsystemTimer {
    interval: f32,
    accumulator: f32,
}

impl SubsystemTimer {
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            accumulator: 0.0,
        }
    }

    /// Add `dt` and report whether the interval elapsed.
    ///
    /// At most one run per call; leftover time is clamped to one interval so
    /// a long stall does not queue a burst of runs.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.accumulator += dt;
        if self.accumulator < self.interval {
            return false;
        }
        self.accumulator -= self.interval;
        if self.accumulator > self.interval {
            self.accumulator = self.interval;
        }
        true
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }
}

/// Per-subsystem timers
#[derive(Debug, Clone)]
pub struct Scheduler {
    timers: [SubsystemTimer; 6],
}

impl Scheduler {
    pub fn new(intervals: &IntervalConfig) -> Self {
        Self {
            timers: [
                SubsystemTimer::new(intervals.liquid),
                SubsystemTimer::new(intervals.gas),
                SubsystemTimer::new(intervals.thermal),
                SubsystemTimer::new(intervals.transmutation),
                SubsystemTimer::new(intervals.water_cycle),
                SubsystemTimer::new(intervals.combustion),
            ],
        }
    }

    /// Advance every timer by `dt`; returns the subsystems due this step in
    /// run order
    pub fn advance(&mut self, dt: f32) -> SmallVec<[Subsystem; 6]> {
        Subsystem::ALL
            .into_iter()
            .filter(|s| self.timers[s.index()].advance(dt))
            .collect()
    }

    pub fn timer(&self, subsystem: Subsystem) -> &SubsystemTimer {
        &self.timers[subsystem.index()]
    }
}

/// Round-robin y-layer cursor per chunk
#[derive(Debug, Default, Clone)]
pub struct LayerCursors {
    cursors: AHashMap<IVec3, usize>,
}

impl LayerCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer to process for `chunk_pos` on this run; advances the cursor
    pub fn next(&mut self, chunk_pos: IVec3) -> usize {
        let cursor = self.cursors.entry(chunk_pos).or_insert(0);
        let layer = *cursor;
        *cursor = (layer + 1) % CHUNK_HEIGHT;
        layer
    }

    /// Layer the next call would return, without advancing
    pub fn peek(&self, chunk_pos: IVec3) -> usize {
        self.cursors.get(&chunk_pos).copied().unwrap_or(0)
    }

    /// Position a chunk's cursor explicitly
    pub fn set(&mut self, chunk_pos: IVec3, layer: usize) {
        self.cursors.insert(chunk_pos, layer % CHUNK_HEIGHT);
    }
}
