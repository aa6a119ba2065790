//! Numerical constants shared by the engine and the editing layer.

/// Constants for spin measurement histories
pub mod spin_constants {
    /// Used for Bloch-sphere angles
    pub const PI: f64 = std::f64::consts::PI;
    /// Polar angle of the x and y axes.
    pub const FRAC_PI_2: f64 = std::f64::consts::FRAC_PI_2;
    /// Longest root-to-leaf path (number of events) a history may hold.
    pub const MAX_HISTORY_DEPTH: usize = 10;
    /// Slack allowed around `[0, 1]` for Born-rule values.
    pub const DEFAULT_PROBABILITY_TOLERANCE: f64 = 1e-9;
    /// Largest imaginary residual tolerated on a Born-rule trace.
    pub const DEFAULT_IMAGINARY_TOLERANCE: f64 = 1e-9;
}
