//! Simulation statistics collection trait

/// Trait for collecting simulation statistics
///
/// Engines report what they did through this trait so the runner can log
/// per-tick activity without the core depending on a stats backend.
pub trait SimStats {
    /// Record motes moved between two cells by a flow pass
    fn record_mote_transfer(&mut self, motes: u16);

    /// Record a temperature-driven phase change (melting, freezing, ...)
    fn record_phase_change(&mut self);

    /// Record a contact-triggered transmutation
    fn record_transmutation(&mut self);

    /// Record a fire starting
    fn record_ignition(&mut self);

    /// Record a fire that burned its cell away
    fn record_fire_consumed(&mut self);

    /// Record a fire that went out leaving its substance
    fn record_fire_extinguished(&mut self);

    /// Record a precipitation deposit
    fn record_condensation(&mut self);

    /// Record an evaporation transfer or cloud seed
    fn record_evaporation(&mut self);

    /// Record a liquid cell settling into the static set
    fn record_static_entry(&mut self);
}

/// A no-op implementation for when stats collection is not needed
#[derive(Default)]
pub struct NoopStats;

impl SimStats for NoopStats {
    fn record_mote_transfer(&mut self, _motes: u16) {}
    fn record_phase_change(&mut self) {}
    fn record_transmutation(&mut self) {}
    fn record_ignition(&mut self) {}
    fn record_fire_consumed(&mut self) {}
    fn record_fire_extinguished(&mut self) {}
    fn record_condensation(&mut self) {}
    fn record_evaporation(&mut self) {}
    fn record_static_entry(&mut self) {}
}

/// Plain counters, reset by the caller between reporting intervals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub motes_moved: u64,
    pub phase_changes: u32,
    pub transmutations: u32,
    pub ignitions: u32,
    pub fires_consumed: u32,
    pub fires_extinguished: u32,
    pub condensations: u32,
    pub evaporations: u32,
    pub static_entries: u32,
}

impl TickStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl SimStats for TickStats {
    fn record_mote_transfer(&mut self, motes: u16) {
        self.motes_moved += motes as u64;
    }

    fn record_phase_change(&mut self) {
        self.phase_changes += 1;
    }

    fn record_transmutation(&mut self) {
        self.transmutations += 1;
    }

    fn record_ignition(&mut self) {
        self.ignitions += 1;
    }

    fn record_fire_consumed(&mut self) {
        self.fires_consumed += 1;
    }

    fn record_fire_extinguished(&mut self) {
        self.fires_extinguished += 1;
    }

    fn record_condensation(&mut self) {
        self.condensations += 1;
    }

    fn record_evaporation(&mut self) {
        self.evaporations += 1;
    }

    fn record_static_entry(&mut self) {
        self.static_entries += 1;
    }
}
