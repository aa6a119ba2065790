// src/simulation/results.rs
use crate::core::{HistoryError, NodeId};
use crate::histories::History;
use crate::simulation::engine::RawLeaf;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Probability figures for one counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafProbability {
    /// Born-rule value before post-selection.
    pub raw: f64,
    /// Value after conditioning on the non-ignored outcomes; zero for
    /// ignored leaves.
    pub probability: f64,
    pub ignored: bool,
}

/// Holds the probabilities computed for every leaf of a history tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityResult {
    /// Leaves in depth-first order.
    order: Vec<NodeId>,
    leaves: HashMap<NodeId, LeafProbability>,
    /// Raw probability mass carried by ignored leaves.
    removed_mass: f64,
}

impl ProbabilityResult {
    /// Applies post-selection to the raw Born values. (Internal visibility)
    ///
    /// Ignored leaves drop to zero and every other leaf is divided by
    /// `1 - removed_mass`. When that denominator is not above `tolerance`
    /// the conditional probabilities are undefined and
    /// `DegenerateRenormalization` is returned.
    pub(crate) fn from_raw(raw: Vec<RawLeaf>, tolerance: f64) -> Result<Self, HistoryError> {
        let removed_mass: f64 = raw.iter().filter(|l| l.ignored).map(|l| l.raw).sum();
        let any_ignored = raw.iter().any(|l| l.ignored);
        let surviving = 1.0 - removed_mass;
        if any_ignored && (surviving <= tolerance || raw.iter().all(|l| l.ignored)) {
            warn!(removed_mass, "every outcome is post-selected away");
            return Err(HistoryError::DegenerateRenormalization {
                message: format!("ignored leaves carry {:.6} of the probability mass, nothing is left to condition on", removed_mass),
            });
        }

        let mut order = Vec::with_capacity(raw.len());
        let mut leaves = HashMap::with_capacity(raw.len());
        for leaf in raw {
            let probability = match (leaf.ignored, any_ignored) {
                (true, _) => 0.0,
                (false, true) => leaf.raw / surviving,
                (false, false) => leaf.raw,
            };
            order.push(leaf.node);
            leaves.insert(leaf.node, LeafProbability { raw: leaf.raw, probability, ignored: leaf.ignored });
        }
        Ok(Self { order, leaves, removed_mass })
    }

    /// Final probability of the leaf `id`, `None` if it is not a leaf of the
    /// evaluated tree.
    pub fn probability(&self, id: NodeId) -> Option<f64> {
        self.leaves.get(&id).map(|l| l.probability)
    }

    /// Born value of the leaf `id` before post-selection.
    pub fn raw_probability(&self, id: NodeId) -> Option<f64> {
        self.leaves.get(&id).map(|l| l.raw)
    }

    pub fn leaf(&self, id: NodeId) -> Option<&LeafProbability> {
        self.leaves.get(&id)
    }

    /// Leaves with their figures, in depth-first order.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &LeafProbability)> + '_ {
        self.order.iter().filter_map(|id| self.leaves.get(id).map(|l| (*id, l)))
    }

    /// Probability mass that post-selection removed.
    pub fn removed_mass(&self) -> f64 {
        self.removed_mass
    }

    /// Sum of the final probabilities; 1 up to rounding.
    pub fn total(&self) -> f64 {
        self.leaves.values().map(|l| l.probability).sum()
    }

    /// Sum of final probabilities over the leaves below `node`.
    pub fn subtree_probability(&self, history: &History, node: NodeId) -> f64 {
        history.leaves_under(node).into_iter().filter_map(|l| self.probability(l)).sum()
    }

    /// Sum of raw Born values over the leaves below `node`.
    pub fn raw_subtree_probability(&self, history: &History, node: NodeId) -> f64 {
        history.leaves_under(node).into_iter().filter_map(|l| self.raw_probability(l)).sum()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Display for ProbabilityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "History Probabilities:")?;
        for (id, leaf) in self.leaves() {
            write!(f, "  {}: {:.4}", id, leaf.probability)?;
            if leaf.ignored {
                write!(f, " (ignored, raw {:.4})", leaf.raw)?;
            }
            writeln!(f)?;
        }
        if self.removed_mass > 0.0 {
            writeln!(f, "  Post-selection removed {:.4} of the mass", self.removed_mass)?;
        }
        Ok(())
    }
}
