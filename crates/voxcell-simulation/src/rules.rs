//! Rule tables attached to substances
//!
//! Two kinds of rule drive substance replacement:
//! - Transitions fire when a cell's temperature crosses a threshold
//!   (freeze, melt, condense, evaporate)
//! - Transmutations fire on contact with a trigger substance, independent of
//!   temperature

use serde::{Deserialize, Serialize};

/// Direction of a temperature-driven phase change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Liquid to solid, fires below the threshold
    Freeze,
    /// Solid to liquid, fires above the threshold
    Melt,
    /// Gas to liquid, fires below the threshold
    Condense,
    /// Liquid to gas, fires above the threshold
    Evaporate,
}

/// Temperature-threshold phase transition
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub kind: TransitionKind,
    /// Celsius; the comparison is strict
    pub threshold: f32,
    /// Substance the cell becomes
    pub product: u16,
}

impl TransitionRule {
    pub fn new(kind: TransitionKind, threshold: f32, product: u16) -> Self {
        Self {
            kind,
            threshold,
            product,
        }
    }

    /// Whether this rule fires at the given temperature
    pub fn matches(&self, temperature: f32) -> bool {
        match self.kind {
            TransitionKind::Freeze | TransitionKind::Condense => temperature < self.threshold,
            TransitionKind::Melt | TransitionKind::Evaporate => temperature > self.threshold,
        }
    }
}

/// Contact-triggered substance replacement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmutationRule {
    /// Neighbor substance that triggers the rule
    pub trigger: u16,
    /// Substance the owning cell becomes
    pub product: u16,
}

impl TransmutationRule {
    pub fn new(trigger: u16, product: u16) -> Self {
        Self { trigger, product }
    }
}
