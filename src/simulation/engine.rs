// src/simulation/engine.rs
use crate::algebra::ComplexMatrix;
use crate::core::{HistoryError, NodeId, Orientation, Spin, SpinState};
use crate::events::Event;
use crate::histories::History;
use crate::simulation::config::{EngineConfig, SourceState};
use num_complex::Complex;
use std::f64::consts::FRAC_1_SQRT_2;
use tracing::warn;

/// Raw Born value of one leaf, before post-selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RawLeaf {
    pub(crate) node: NodeId,
    pub(crate) raw: f64,
    pub(crate) ignored: bool,
}

/// Builds event operators for one spin multiplicity and evaluates class
/// operators against a fixed density operator.
/// (Internal visibility)
pub(crate) struct HistoryEvaluator {
    spin: Spin,
    /// Initial state of the source. Created once, never mutated.
    density: ComplexMatrix,
    probability_tolerance: f64,
    imaginary_tolerance: f64,
}

impl HistoryEvaluator {
    pub(crate) fn init(config: &EngineConfig) -> Result<Self, HistoryError> {
        let density = density_operator(config.spin, &config.source)?;
        Ok(Self::with_density(config, density))
    }

    pub(crate) fn with_density(config: &EngineConfig, density: ComplexMatrix) -> Self {
        Self {
            spin: config.spin,
            density,
            probability_tolerance: config.probability_tolerance,
            imaginary_tolerance: config.imaginary_tolerance,
        }
    }

    pub(crate) fn density(&self) -> &ComplexMatrix {
        &self.density
    }

    /// Operator applied to the spin when the particle follows `event`:
    /// a projector for analyzer ports, the precession propagator for
    /// magnets, the identity for transparent analyzers.
    pub(crate) fn event_operator(&self, event: &Event) -> Result<ComplexMatrix, HistoryError> {
        match *event {
            Event::SpinUp { axis } | Event::SpinZero { axis } | Event::SpinDown { axis } => {
                // Only analyzer ports have an outcome.
                let outcome = event.outcome().ok_or(HistoryError::Structural {
                    message: format!("{} has no outcome", event),
                })?;
                Ok(SpinState::new(self.spin, outcome, axis.orientation())?.projector())
            }
            Event::Magnet { axis, magnitude } => Ok(magnet_propagator(self.spin, axis.orientation(), magnitude)),
            Event::Identity { .. } => Ok(ComplexMatrix::identity(self.spin.dim())),
        }
    }

    /// Ordered product of the event operators along the path to `leaf`.
    /// Later events multiply from the left: `C = E_n ··· E_2 · E_1`.
    pub(crate) fn class_operator(&self, history: &History, leaf: NodeId) -> Result<ComplexMatrix, HistoryError> {
        let mut chain = ComplexMatrix::identity(self.spin.dim());
        for event in history.path(leaf)? {
            chain = self.event_operator(&event)?.multiply(&chain);
        }
        Ok(chain)
    }

    /// Born rule for a history: `Re tr(C · ρ · C†)`.
    ///
    /// Returns the unclamped value, or `NumericalAnomaly` when it falls outside
    /// `[-ε, 1+ε]` or the trace keeps an imaginary residual above tolerance.
    pub(crate) fn born(&self, node: NodeId, class_operator: &ComplexMatrix) -> Result<f64, HistoryError> {
        let trace = class_operator
            .multiply(&self.density)
            .multiply(&class_operator.conjugate_transpose())
            .trace();
        if trace.im.abs() > self.imaginary_tolerance {
            warn!(%node, imaginary = trace.im, "born trace kept an imaginary residual");
            return Err(HistoryError::NumericalAnomaly {
                node,
                message: format!("trace has imaginary part {:.3e}", trace.im),
            });
        }
        let p = trace.re;
        if p < -self.probability_tolerance || p > 1.0 + self.probability_tolerance || !p.is_finite() {
            warn!(%node, probability = p, "born value outside [0, 1]");
            return Err(HistoryError::NumericalAnomaly { node, message: format!("probability {} outside [0, 1]", p) });
        }
        Ok(p)
    }

    /// Walks the tree depth first, carrying the class operator of the path
    /// so far, and returns the raw Born value of every leaf in leaf order.
    pub(crate) fn evaluate(&self, history: &History) -> Result<Vec<RawLeaf>, HistoryError> {
        if history.spin() != self.spin {
            return Err(HistoryError::Structural {
                message: format!("a {} history cannot be evaluated by a {} engine", history.spin(), self.spin),
            });
        }
        let mut leaves = Vec::new();
        let mut stack = vec![(history.root(), ComplexMatrix::identity(self.spin.dim()))];
        while let Some((id, chain)) = stack.pop() {
            let node = history.get(id)?;
            if node.is_leaf() {
                let raw = self.born(id, &chain)?;
                leaves.push(RawLeaf { node: id, raw, ignored: node.is_ignored() });
                continue;
            }
            for child in node.children().iter().rev() {
                let next = match history.get(*child)?.event() {
                    Some(event) => self.event_operator(event)?.multiply(&chain),
                    None => chain.clone(),
                };
                stack.push((*child, next));
            }
        }
        Ok(leaves)
    }
}

/// ρ for the configured source: `(1/d)·Σ_m |z,m⟩⟨z,m|` when unpolarized,
/// `|s⟩⟨s|` when polarized.
pub(crate) fn density_operator(spin: Spin, source: &SourceState) -> Result<ComplexMatrix, HistoryError> {
    match source {
        SourceState::Unpolarized => {
            let weight = Complex::new(1.0 / spin.dim() as f64, 0.0);
            let mut rho = ComplexMatrix::zeros(spin.dim(), spin.dim());
            for outcome in spin.outcomes() {
                let projector = SpinState::new(spin, *outcome, Orientation::z())?.projector();
                rho = rho.add(&(&projector * weight));
            }
            Ok(rho)
        }
        SourceState::Polarized { axis, outcome } => Ok(SpinState::new(spin, *outcome, axis.orientation())?.projector()),
    }
}

/// `I/d`, the closed form of the unpolarized mixture.
pub(crate) fn unpolarized_density(spin: Spin) -> ComplexMatrix {
    &ComplexMatrix::identity(spin.dim()) * Complex::new(1.0 / spin.dim() as f64, 0.0)
}

/// Spin component along `orientation`: `n·σ` for spin-1/2, `n·S` (ħ = 1)
/// for spin-1. Eigenvalues are ±1, plus 0 for spin-1.
pub(crate) fn spin_generator(spin: Spin, orientation: Orientation) -> ComplexMatrix {
    let [nx, ny, nz] = orientation.unit_vector();
    // n_x - i n_y and its conjugate
    let lower = Complex::new(nx, ny);
    let upper = lower.conj();
    let zero = Complex::new(0.0, 0.0);
    match spin {
        Spin::Half => ComplexMatrix::from_rows(&[[Complex::new(nz, 0.0), upper], [lower, Complex::new(-nz, 0.0)]]),
        Spin::One => {
            let u = upper * FRAC_1_SQRT_2;
            let l = lower * FRAC_1_SQRT_2;
            ComplexMatrix::from_rows(&[
                [Complex::new(nz, 0.0), u, zero],
                [l, zero, u],
                [zero, l, Complex::new(-nz, 0.0)],
            ])
        }
    }
}

/// Time evolution in a uniform field along `orientation`:
/// `exp(-i·magnitude·H)` through the closed spin-exponential form.
/// A zero magnitude gives the identity.
pub(crate) fn magnet_propagator(spin: Spin, orientation: Orientation, magnitude: f64) -> ComplexMatrix {
    ComplexMatrix::spin_exponential(&spin_generator(spin, orientation), magnitude)
}
