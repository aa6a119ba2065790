// src/validation/mod.rs

//! Provides functions to validate operators and evaluated history trees.

use crate::algebra::ComplexMatrix;
use crate::core::{HistoryError, NodeId};
use crate::histories::{History, NodeKind};
use crate::simulation::{HistoryEngine, ProbabilityResult};

// Default tolerance values (can be overridden by caller)
const DEFAULT_NORM_TOLERANCE: f64 = 1e-9;
const DEFAULT_BOUNDS_TOLERANCE: f64 = 1e-9;
const DEFAULT_OPERATOR_TOLERANCE: f64 = 1e-10;

// --- Helper Functions ---

fn square_or_err(m: &ComplexMatrix, what: &str) -> Result<(), HistoryError> {
    if m.is_square() {
        Ok(())
    } else {
        Err(HistoryError::Structural { message: format!("{} check needs a square matrix, got {}x{}", what, m.rows(), m.cols()) })
    }
}

/// Whether the children of `id` partition the node's probability: complete
/// analyzers, magnets and transparent analyzers do; counters and partial
/// analyzers do not.
fn conserves_mass(history: &History, id: NodeId) -> Result<bool, HistoryError> {
    Ok(match history.kind(id)? {
        NodeKind::Analyzer | NodeKind::Magnet | NodeKind::Transparent => true,
        NodeKind::Source => {
            history.is_analyzer(id)?
                || matches!(
                    history.children(id)?,
                    [only] if history.node(*only).and_then(|n| n.event()).is_some_and(|e| e.is_magnet() || e.is_identity())
                )
        }
        NodeKind::Counter | NodeKind::Irregular => false,
    })
}

// --- Public Validation Functions ---

/// Checks that probability is conserved through every device.
///
/// For each analyzer, magnet and transparent node the raw Born mass of the
/// leaves below it must equal the Born value of the node's own class
/// operator. The final probabilities must sum to one.
///
/// # Arguments
/// * `engine` - Engine that produced `result`; used for the node masses.
/// * `history` - The evaluated tree.
/// * `result` - Output of `engine.run(history)`.
/// * `tolerance` - Allowed deviation (defaults to 1e-9).
///
/// # Returns
/// * `Ok(())` if every conserving node balances.
/// * `Err(HistoryError::NumericalAnomaly)` naming the first node that does not.
pub fn check_normalization(
    engine: &HistoryEngine,
    history: &History,
    result: &ProbabilityResult,
    tolerance: Option<f64>,
) -> Result<(), HistoryError> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_NORM_TOLERANCE);
    for index in 0..history.len() {
        let id = NodeId(index);
        if !conserves_mass(history, id)? {
            continue;
        }
        let class_operator = engine.class_operator(history, id)?;
        let node_mass = engine.born_probability(id, &class_operator)?;
        let below = result.raw_subtree_probability(history, id);
        if (node_mass - below).abs() > effective_tolerance {
            return Err(HistoryError::NumericalAnomaly {
                node: id,
                message: format!("mass {} enters but {} leaves (deviation > {})", node_mass, below, effective_tolerance),
            });
        }
    }

    let total = result.total();
    if !result.is_empty() && (total - 1.0).abs() > effective_tolerance {
        return Err(HistoryError::NumericalAnomaly {
            node: history.root(),
            message: format!("final probabilities sum to {} (deviation > {})", total, effective_tolerance),
        });
    }
    Ok(())
}

/// Checks every raw and final leaf value lies in `[0, 1]` up to `tolerance`.
pub fn check_probability_bounds(result: &ProbabilityResult, tolerance: Option<f64>) -> Result<(), HistoryError> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_BOUNDS_TOLERANCE);
    let in_bounds = |p: f64| p.is_finite() && p >= -effective_tolerance && p <= 1.0 + effective_tolerance;
    for (node, leaf) in result.leaves() {
        if !in_bounds(leaf.raw) || !in_bounds(leaf.probability) {
            return Err(HistoryError::NumericalAnomaly {
                node,
                message: format!("probability out of bounds (raw {}, final {})", leaf.raw, leaf.probability),
            });
        }
    }
    Ok(())
}

/// Checks `m` is Hermitian: `m† = m`.
pub fn check_hermitian(m: &ComplexMatrix, tolerance: Option<f64>) -> Result<(), HistoryError> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_OPERATOR_TOLERANCE);
    square_or_err(m, "hermiticity")?;
    let deviation = m.max_deviation(&m.conjugate_transpose());
    if deviation > effective_tolerance {
        return Err(HistoryError::Structural {
            message: format!("operator is not Hermitian (max deviation {:.3e})", deviation),
        });
    }
    Ok(())
}

/// Checks `m` is an orthogonal projector: Hermitian and idempotent.
pub fn check_projector(m: &ComplexMatrix, tolerance: Option<f64>) -> Result<(), HistoryError> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_OPERATOR_TOLERANCE);
    check_hermitian(m, Some(effective_tolerance))?;
    let deviation = m.square().max_deviation(m);
    if deviation > effective_tolerance {
        return Err(HistoryError::Structural {
            message: format!("operator is not idempotent (max deviation {:.3e})", deviation),
        });
    }
    Ok(())
}

/// Checks `m` is unitary: `m·m† = I`.
pub fn check_unitary(m: &ComplexMatrix, tolerance: Option<f64>) -> Result<(), HistoryError> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_OPERATOR_TOLERANCE);
    square_or_err(m, "unitarity")?;
    let product = m.multiply(&m.conjugate_transpose());
    let deviation = product.max_deviation(&ComplexMatrix::identity(m.rows()));
    if deviation > effective_tolerance {
        return Err(HistoryError::Structural {
            message: format!("operator is not unitary (max deviation {:.3e})", deviation),
        });
    }
    Ok(())
}

/// Performs the result checks in one call: bounds, then normalization.
/// Uses default tolerance values unless specified.
pub fn validate_result(
    engine: &HistoryEngine,
    history: &History,
    result: &ProbabilityResult,
    tolerance: Option<f64>,
) -> Result<(), HistoryError> {
    check_probability_bounds(result, tolerance)?;
    check_normalization(engine, history, result, tolerance)?;
    Ok(())
}
