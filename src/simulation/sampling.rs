// src/simulation/sampling.rs

//! Sends simulated particles through an evaluated experiment and tallies
//! which counter each one reaches.

use crate::core::{HistoryError, NodeId};
use crate::histories::History;
use crate::simulation::ProbabilityResult;
use rand::SeedableRng;
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Draws counters with weight equal to their final probability.
pub struct CounterSampler {
    rng: StdRng,
}

impl CounterSampler {
    /// Sampler with an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Sampler seeded from the probabilities themselves, so the same
    /// experiment always produces the same tallies.
    pub fn seeded_from(result: &ProbabilityResult) -> Self {
        let mut hasher = DefaultHasher::new();
        for (id, leaf) in result.leaves() {
            id.hash(&mut hasher);
            leaf.probability.to_ne_bytes().hash(&mut hasher);
        }
        Self::new(hasher.finish())
    }

    /// Picks the counter the next particle reaches. `None` when no leaf has
    /// positive probability.
    pub fn draw(&mut self, result: &ProbabilityResult) -> Option<NodeId> {
        let candidates: Vec<(NodeId, f64)> =
            result.leaves().filter(|(_, l)| l.probability > 0.0).map(|(id, l)| (id, l.probability)).collect();
        let total: f64 = candidates.iter().map(|(_, p)| p).sum();
        if candidates.is_empty() || total <= 0.0 {
            return None;
        }

        let unit: f64 = StandardUniform.sample(&mut self.rng);
        let target = unit * total;
        let mut cumulative = 0.0;
        for (id, p) in &candidates {
            cumulative += p;
            if target < cumulative {
                return Some(*id);
            }
        }
        // target can reach total through rounding
        candidates.last().map(|(id, _)| *id)
    }

    /// Sends `trials` particles through and returns a copy of `history`
    /// with every counter's `count` raised by its tally.
    pub fn record(&mut self, history: &History, result: &ProbabilityResult, trials: u64) -> Result<History, HistoryError> {
        let mut next = history.clone();
        for _ in 0..trials {
            let Some(id) = self.draw(result) else { break };
            let count = next.get(id)?.count();
            next.set_count(id, count + 1)?;
        }
        Ok(next)
    }
}
