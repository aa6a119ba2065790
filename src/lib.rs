// src/lib.rs

//! `spin_histories` - Consistent-histories probabilities for Stern-Gerlach
//! experiments
//!
//! A tree of measurement events (analyzers, magnets, transparent analyzers)
//! is evaluated against the spin state leaving the source: every counter at a
//! leaf receives the Born-rule probability of the history leading to it,
//! optionally conditioned on outcomes marked as ignored.

pub mod core;
pub mod algebra;
pub mod events;
pub mod histories;
pub mod simulation;
pub mod validation;

// Re-export the most common types for easier top-level use
pub use core::{HistoryError, NodeId, Orientation, Outcome, Spin, SpinState};
pub use algebra::ComplexMatrix;
pub use events::{Axis, Event};
pub use histories::{Angle, History, HistoryBuilder, HistoryNode, HistoryRecord, NodeKind};
pub use simulation::{CounterSampler, EngineConfig, HistoryEngine, LeafProbability, ProbabilityResult, SourceState};
pub use validation::{
    check_hermitian,
    check_normalization,
    check_probability_bounds,
    check_projector,
    check_unitary,
    validate_result,
};

// Example 1: Sequential analyzers
// An x analyzer feeding a z analyzer on its up port. The x measurement
// erases the z information, so each z port receives half of the x-up beam.
/// ```
/// use spin_histories::{Axis, HistoryBuilder, HistoryEngine, HistoryError, Spin};
///
/// let mut builder = HistoryBuilder::new(Spin::Half);
/// let root = builder.root();
/// let x_ports = builder.analyzer(root, Axis::X)?;
/// let z_ports = builder.analyzer(x_ports[0], Axis::Z)?;
/// let history = builder.build();
///
/// let engine = HistoryEngine::new();
/// let result = engine.run(&history)?;
/// println!("{}", history);
/// println!("{}", result);
///
/// for port in &z_ports {
///     let p = result.probability(*port).unwrap_or_default();
///     assert!((p - 0.25).abs() < 1e-9);
/// }
/// let p_down = result.probability(x_ports[1]).unwrap_or_default();
/// assert!((p_down - 0.5).abs() < 1e-9);
/// # Ok::<(), HistoryError>(())
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: Post-selection on a JSON tree
// The down port of the first analyzer is ignored, so the remaining counters
// are conditioned on the particle having gone up.
/// ```
/// use spin_histories::{History, HistoryEngine, HistoryError};
///
/// let json = r#"{
///   "children": [
///     { "basis": "z", "event": "spinUp", "children": [
///         { "basis": "z", "event": "spinUp" },
///         { "basis": "z", "event": "spinDown" }
///     ] },
///     { "basis": "z", "event": "spinDown", "ignored": true }
///   ]
/// }"#;
///
/// let engine = HistoryEngine::new();
/// let history = History::from_json(json)?;
/// let annotated = engine.compute_probabilities(&history.to_record())?;
///
/// let up_branch = &annotated.children[0];
/// let p_up = up_branch.children[0].probability.unwrap_or_default();
/// let p_down = up_branch.children[1].probability.unwrap_or_default();
/// assert!((p_up - 1.0).abs() < 1e-9);
/// assert!(p_down.abs() < 1e-9);
/// assert_eq!(annotated.children[1].probability, Some(0.0));
/// # Ok::<(), HistoryError>(())
/// ```
#[doc(hidden)]
const _: () = ();

// Example 3: Spin-1 analyzer with a polarized source
/// ```
/// use spin_histories::{Axis, EngineConfig, History, HistoryEngine, HistoryError, Outcome, SourceState, Spin};
///
/// let config = EngineConfig::default()
///     .with_spin(Spin::One)
///     .with_source(SourceState::Polarized { axis: Axis::Z, outcome: Outcome::Zero });
/// let engine = HistoryEngine::with_config(config)?;
/// let history = History::single_analyzer(Spin::One, Axis::Z);
/// let result = engine.run(&history)?;
///
/// let ports = history.children(history.root())?;
/// assert!(result.probability(ports[0]).unwrap_or_default().abs() < 1e-9);
/// assert!((result.probability(ports[1]).unwrap_or_default() - 1.0).abs() < 1e-9);
/// # Ok::<(), HistoryError>(())
/// ```
#[doc(hidden)]
const _: () = ();
