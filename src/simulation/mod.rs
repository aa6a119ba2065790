// src/simulation/mod.rs

//! Computes the probability of every counter in a history tree.
//! This module contains the `HistoryEngine` entry point and the internal
//! `HistoryEvaluator` that builds event operators and applies the Born rule.

mod config;
pub(crate) mod engine;
mod results;
mod sampling;

pub use config::{EngineConfig, SourceState};
pub use results::{LeafProbability, ProbabilityResult};
pub use sampling::CounterSampler;

use crate::algebra::ComplexMatrix;
use crate::core::{HistoryError, NodeId};
use crate::events::Event;
use crate::histories::{History, HistoryRecord};
use engine::HistoryEvaluator;
use tracing::debug;

/// Evaluates history trees for one spin multiplicity and source state.
///
/// The density operator is built once in [`HistoryEngine::with_config`] and
/// shared by every evaluation; the engine itself is never mutated, so one
/// instance can be reused across threads and trees.
pub struct HistoryEngine {
    config: EngineConfig,
    evaluator: HistoryEvaluator,
}

impl HistoryEngine {
    /// Spin-1/2 engine with an unpolarized source and default tolerances.
    pub fn new() -> Self {
        let config = EngineConfig::default();
        let evaluator = HistoryEvaluator::with_density(&config, engine::unpolarized_density(config.spin));
        Self { config, evaluator }
    }

    /// Engine for an explicit configuration.
    ///
    /// # Errors
    /// `Structural` when a polarized source names an outcome the spin
    /// multiplicity does not have.
    pub fn with_config(config: EngineConfig) -> Result<Self, HistoryError> {
        let evaluator = HistoryEvaluator::init(&config)?;
        Ok(Self { config, evaluator })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// ρ of the source.
    pub fn density_operator(&self) -> &ComplexMatrix {
        self.evaluator.density()
    }

    /// Operator for a single event in this engine's spin space.
    pub fn event_operator(&self, event: &Event) -> Result<ComplexMatrix, HistoryError> {
        self.evaluator.event_operator(event)
    }

    /// Ordered product `E_n ··· E_1` of the events on the path to `node`.
    pub fn class_operator(&self, history: &History, node: NodeId) -> Result<ComplexMatrix, HistoryError> {
        self.evaluator.class_operator(history, node)
    }

    /// Born-rule probability of a class operator against the source state.
    /// `node` is only used to label errors.
    pub fn born_probability(&self, node: NodeId, class_operator: &ComplexMatrix) -> Result<f64, HistoryError> {
        self.evaluator.born(node, class_operator)
    }

    /// Runs the evaluation of the provided history tree.
    ///
    /// Every leaf receives `Re tr(C ρ C†)` for its class operator `C`; if any
    /// leaf is marked ignored the remaining leaves are renormalized so they
    /// sum to one.
    ///
    /// # Errors
    /// * `Structural` if the tree's spin differs from the engine's.
    /// * `NumericalAnomaly` if a Born value leaves `[0, 1]` beyond tolerance
    ///   or keeps an imaginary residual.
    /// * `DegenerateRenormalization` if ignored leaves carry all the mass.
    pub fn run(&self, history: &History) -> Result<ProbabilityResult, HistoryError> {
        let raw = self.evaluator.evaluate(history)?;
        let result = ProbabilityResult::from_raw(raw, self.config.probability_tolerance)?;
        debug!(leaves = result.len(), removed_mass = result.removed_mass(), "evaluated history tree");
        Ok(result)
    }

    /// Reads a persisted tree, evaluates it, and returns the same tree with
    /// every leaf carrying its probability.
    pub fn compute_probabilities(&self, record: &HistoryRecord) -> Result<HistoryRecord, HistoryError> {
        let history = History::from_record(record)?;
        let result = self.run(&history)?;
        Ok(history.annotated_record(&result))
    }
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Outcome, Spin};
    use crate::events::Axis;
    use crate::histories::HistoryBuilder;

    const TEST_TOLERANCE: f64 = 1e-9;

    fn assert_probability(result: &ProbabilityResult, node: NodeId, expected: f64) {
        match result.probability(node) {
            Some(p) => assert!((p - expected).abs() < TEST_TOLERANCE, "{}: {} != {}", node, p, expected),
            None => panic!("{} has no probability", node),
        }
    }

    #[test]
    fn test_single_analyzer_splits_evenly() -> Result<(), HistoryError> {
        let engine = HistoryEngine::new();
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let history = History::single_analyzer(Spin::Half, axis);
            let result = engine.run(&history)?;
            for leaf in history.leaves() {
                assert_probability(&result, leaf, 0.5);
            }
        }
        Ok(())
    }

    #[test]
    fn test_repeated_analyzer_is_certain() -> Result<(), HistoryError> {
        let mut builder = HistoryBuilder::new(Spin::Half);
        let root = builder.root();
        let ports = builder.analyzer(root, Axis::Z)?;
        let second = builder.analyzer(ports[0], Axis::Z)?;
        let history = builder.build();

        let result = HistoryEngine::new().run(&history)?;
        assert_probability(&result, second[0], 0.5);
        assert_probability(&result, second[1], 0.0);
        assert_probability(&result, ports[1], 0.5);
        Ok(())
    }

    #[test]
    fn test_polarized_source_passes_matching_analyzer() -> Result<(), HistoryError> {
        let config = EngineConfig::default().with_source(SourceState::Polarized { axis: Axis::X, outcome: Outcome::Up });
        let engine = HistoryEngine::with_config(config)?;
        let history = History::single_analyzer(Spin::Half, Axis::X);
        let result = engine.run(&history)?;
        let ports = history.children(history.root())?;
        assert_probability(&result, ports[0], 1.0);
        assert_probability(&result, ports[1], 0.0);
        Ok(())
    }

    #[test]
    fn test_polarized_spin_half_source_rejects_zero() {
        let config = EngineConfig::default().with_source(SourceState::Polarized { axis: Axis::Z, outcome: Outcome::Zero });
        assert!(matches!(HistoryEngine::with_config(config), Err(HistoryError::Structural { .. })));
    }

    #[test]
    fn test_class_operator_matches_born_probability() -> Result<(), HistoryError> {
        let engine = HistoryEngine::new();
        let history = History::single_analyzer(Spin::Half, Axis::Y);
        let leaf = history.leaves()[1];
        let c = engine.class_operator(&history, leaf)?;
        let p = engine.born_probability(leaf, &c)?;
        assert!((p - 0.5).abs() < TEST_TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_compute_probabilities_annotates_leaves() -> Result<(), HistoryError> {
        let record = History::single_analyzer(Spin::One, Axis::Z).to_record();
        let engine = HistoryEngine::with_config(EngineConfig::default().with_spin(Spin::One))?;
        let annotated = engine.compute_probabilities(&record)?;
        assert_eq!(annotated.children.len(), 3);
        for child in &annotated.children {
            let p = child.probability.unwrap_or_default();
            assert!((p - 1.0 / 3.0).abs() < TEST_TOLERANCE);
        }
        assert_eq!(annotated.probability, None);
        Ok(())
    }
}
