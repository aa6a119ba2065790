// src/simulation/config.rs

use crate::core::constants::spin_constants::{DEFAULT_IMAGINARY_TOLERANCE, DEFAULT_PROBABILITY_TOLERANCE};
use crate::core::{Outcome, Spin};
use crate::events::Axis;

/// Spin state of the particles leaving the source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SourceState {
    /// Equal mixture of the z-basis eigenstates, ρ = I/d. Maximally mixed, so
    /// every first analyzer splits the beam evenly whatever its axis.
    #[default]
    Unpolarized,
    /// Every particle prepared in the eigenstate for `outcome` along `axis`.
    Polarized { axis: Axis, outcome: Outcome },
}

/// Settings fixed for the lifetime of a [`HistoryEngine`](super::HistoryEngine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub spin: Spin,
    pub source: SourceState,
    /// Slack around `[0, 1]` before a Born value counts as anomalous; also
    /// the smallest surviving mass renormalization will divide by.
    pub probability_tolerance: f64,
    /// Largest imaginary residual accepted on a Born-rule trace.
    pub imaginary_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spin: Spin::Half,
            source: SourceState::Unpolarized,
            probability_tolerance: DEFAULT_PROBABILITY_TOLERANCE,
            imaginary_tolerance: DEFAULT_IMAGINARY_TOLERANCE,
        }
    }
}

impl EngineConfig {
    pub fn with_spin(mut self, spin: Spin) -> Self {
        self.spin = spin;
        self
    }

    pub fn with_source(mut self, source: SourceState) -> Self {
        self.source = source;
        self
    }

    pub fn with_probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    pub fn with_imaginary_tolerance(mut self, tolerance: f64) -> Self {
        self.imaginary_tolerance = tolerance;
        self
    }
}
