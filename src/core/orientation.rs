// src/core/orientation.rs

use super::constants::spin_constants::FRAC_PI_2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A direction on the Bloch sphere.
/// Analyzers measure spin along it and magnets orient their field along it.
///
/// `theta` is the polar angle measured from +z, `phi` the azimuthal angle
/// measured from +x, both in radians. Angles are stored as given; the
/// eigenstate formulas are periodic so no wrapping is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Polar angle θ.
    pub theta: f64,
    /// Azimuthal angle φ.
    pub phi: f64,
}

impl Orientation {
    /// Creates an orientation from explicit angles.
    pub fn new(theta: f64, phi: f64) -> Self {
        Self { theta, phi }
    }

    /// +z, the canonical `z` analyzer direction `(0, 0)`.
    pub fn z() -> Self {
        Self::new(0.0, 0.0)
    }

    /// +x, the canonical `x` analyzer direction `(π/2, 0)`.
    pub fn x() -> Self {
        Self::new(FRAC_PI_2, 0.0)
    }

    /// +y, the canonical `y` analyzer direction `(π/2, π/2)`.
    pub fn y() -> Self {
        Self::new(FRAC_PI_2, FRAC_PI_2)
    }

    /// Cartesian components `(n_x, n_y, n_z)` of the unit vector.
    pub fn unit_vector(&self) -> [f64; 3] {
        let (sin_t, cos_t) = self.theta.sin_cos();
        let (sin_p, cos_p) = self.phi.sin_cos();
        [sin_t * cos_p, sin_t * sin_p, cos_t]
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::z()
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(θ={:.2}, φ={:.2})", self.theta, self.phi)
    }
}
