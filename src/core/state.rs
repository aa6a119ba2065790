// src/core/state.rs

use super::error::HistoryError;
use super::orientation::Orientation;
use crate::algebra::ComplexMatrix;
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

/// Spin multiplicity of the particles emitted by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spin {
    /// Spin-1/2, two outcomes per analyzer.
    #[default]
    Half,
    /// Spin-1, three outcomes per analyzer.
    One,
}

impl Spin {
    /// Dimension of the state space.
    pub fn dim(&self) -> usize {
        match self {
            Spin::Half => 2,
            Spin::One => 3,
        }
    }

    /// Outcomes a complete analyzer sorts particles into, ordered from the
    /// top port down.
    pub fn outcomes(&self) -> &'static [Outcome] {
        match self {
            Spin::Half => &[Outcome::Up, Outcome::Down],
            Spin::One => &[Outcome::Up, Outcome::Zero, Outcome::Down],
        }
    }

    /// Whether an analyzer for this multiplicity has a port for `outcome`.
    pub fn supports(&self, outcome: Outcome) -> bool {
        self.outcomes().contains(&outcome)
    }
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spin::Half => write!(f, "spin-1/2"),
            Spin::One => write!(f, "spin-1"),
        }
    }
}

/// Result of a spin measurement along an analyzer axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Projection +1 (+1/2 for spin-1/2).
    Up,
    /// Projection 0, spin-1 only.
    Zero,
    /// Projection -1 (-1/2 for spin-1/2).
    Down,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Up => write!(f, "+"),
            Outcome::Zero => write!(f, "0"),
            Outcome::Down => write!(f, "-"),
        }
    }
}

/// An eigenstate of spin along some Bloch-sphere direction, written in the
/// S_z basis as a ket.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinState {
    amplitudes: Vec<Complex<f64>>,
}

impl SpinState {
    /// Eigenstate of spin along `orientation` with the given outcome.
    ///
    /// Spin-1/2: up = (cos θ/2, sin θ/2·e^{iφ}), down = (sin θ/2, −cos θ/2·e^{iφ}).
    /// Spin-1 uses the columns of the rotated S_z basis with the global phase
    /// chosen so the first component is real.
    ///
    /// # Errors
    /// `Structural` when `outcome` is `Zero` for spin-1/2.
    pub fn new(spin: Spin, outcome: Outcome, orientation: Orientation) -> Result<Self, HistoryError> {
        let Orientation { theta, phi } = orientation;
        let e_phi = Complex::from_polar(1.0, phi);
        let amplitudes = match (spin, outcome) {
            (Spin::Half, Outcome::Up) => {
                let (s, c) = (theta / 2.0).sin_cos();
                vec![Complex::new(c, 0.0), e_phi * s]
            }
            (Spin::Half, Outcome::Down) => {
                let (s, c) = (theta / 2.0).sin_cos();
                vec![Complex::new(s, 0.0), e_phi * (-c)]
            }
            (Spin::Half, Outcome::Zero) => {
                return Err(HistoryError::Structural {
                    message: "spin-1/2 particles have no zero-projection outcome".to_string(),
                });
            }
            (Spin::One, _) => {
                let (s, c) = theta.sin_cos();
                let e_2phi = Complex::from_polar(1.0, 2.0 * phi);
                let s_r2 = s * FRAC_1_SQRT_2;
                let (a, b, d) = match outcome {
                    Outcome::Up => ((1.0 + c) / 2.0, s_r2, (1.0 - c) / 2.0),
                    Outcome::Zero => (-s_r2, c, s_r2),
                    Outcome::Down => ((1.0 - c) / 2.0, -s_r2, (1.0 + c) / 2.0),
                };
                vec![Complex::new(a, 0.0), e_phi * b, e_2phi * d]
            }
        };
        Ok(Self { amplitudes })
    }

    /// Spin-1/2 up state along `orientation`.
    pub fn up(orientation: Orientation) -> Self {
        let (s, c) = (orientation.theta / 2.0).sin_cos();
        Self { amplitudes: vec![Complex::new(c, 0.0), Complex::from_polar(s, orientation.phi)] }
    }

    /// Spin-1/2 down state along `orientation`.
    pub fn down(orientation: Orientation) -> Self {
        let (s, c) = (orientation.theta / 2.0).sin_cos();
        Self { amplitudes: vec![Complex::new(s, 0.0), Complex::from_polar(-c, orientation.phi)] }
    }

    /// Read-only access to the amplitudes.
    pub fn vector(&self) -> &[Complex<f64>] {
        &self.amplitudes
    }

    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    /// The state as a `d × 1` column.
    pub fn ket(&self) -> ComplexMatrix {
        ComplexMatrix::column(&self.amplitudes)
    }

    /// The conjugate `1 × d` row.
    pub fn bra(&self) -> ComplexMatrix {
        self.ket().conjugate_transpose()
    }

    /// Inner product ⟨self|other⟩.
    pub fn inner(&self, other: &SpinState) -> Complex<f64> {
        self.amplitudes.iter().zip(&other.amplitudes).map(|(a, b)| a.conj() * b).sum()
    }

    /// Rank-1 projector |s⟩⟨s|, built as the Kronecker product ket ⊗ bra.
    pub fn projector(&self) -> ComplexMatrix {
        self.ket().kron(&self.bra())
    }
}

impl fmt::Display for SpinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Spin[")?;
        for (i, c) in self.amplitudes.iter().enumerate() {
            write!(f, "{}{:.4}", if i > 0 { ", " } else { "" }, c)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn spin_half_states_are_orthonormal_along_arbitrary_axis() {
        let o = Orientation::new(1.1, 2.3);
        let up = SpinState::up(o);
        let down = SpinState::down(o);
        assert!((up.inner(&up).re - 1.0).abs() < TOL);
        assert!((down.inner(&down).re - 1.0).abs() < TOL);
        assert!(up.inner(&down).norm() < TOL);
    }

    #[test]
    fn generic_constructor_agrees_with_shorthands() -> Result<(), HistoryError> {
        let o = Orientation::y();
        assert_eq!(SpinState::new(Spin::Half, Outcome::Up, o)?, SpinState::up(o));
        assert_eq!(SpinState::new(Spin::Half, Outcome::Down, o)?, SpinState::down(o));
        Ok(())
    }

    #[test]
    fn spin_half_rejects_zero_outcome() {
        let err = SpinState::new(Spin::Half, Outcome::Zero, Orientation::z());
        assert!(matches!(err, Err(HistoryError::Structural { .. })));
    }

    #[test]
    fn spin_one_states_form_orthonormal_basis() -> Result<(), HistoryError> {
        let o = Orientation::new(0.7, 1.9);
        let states: Vec<SpinState> = Spin::One
            .outcomes()
            .iter()
            .map(|outcome| SpinState::new(Spin::One, *outcome, o))
            .collect::<Result<_, _>>()?;
        for (i, a) in states.iter().enumerate() {
            for (j, b) in states.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((a.inner(b) - Complex::new(expected, 0.0)).norm() < TOL, "<{}|{}>", i, j);
            }
        }
        Ok(())
    }

    #[test]
    fn projector_is_idempotent_with_unit_trace() {
        let p = SpinState::up(Orientation::new(0.4, 5.0)).projector();
        assert!((&p * &p).approx_eq(&p, TOL));
        assert!((p.trace() - Complex::new(1.0, 0.0)).norm() < TOL);
    }
}
