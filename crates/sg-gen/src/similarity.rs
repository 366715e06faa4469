use sg_core::{RngHandle, SampleSpace};

use crate::config::SimilarityPolicy;
use crate::contract::Contract;

/// Monte-Carlo estimate of how often two contracts agree.
#[derive(Debug, Clone)]
pub struct SimilarityEstimator {
    space: SampleSpace,
    num_samples: usize,
    threshold: f64,
}

impl SimilarityEstimator {
    /// Creates an estimator drawing from `space`.
    pub fn new(space: SampleSpace, policy: &SimilarityPolicy) -> Self {
        Self {
            space,
            num_samples: policy.num_samples.max(1),
            threshold: policy.threshold,
        }
    }

    /// Agreement fraction above which two contracts are near-duplicates.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Fraction of random samples on which both contracts give the same
    /// answer (both true or both false).
    ///
    /// Repeated calls draw fresh samples and may differ slightly.
    pub fn similarity(&self, first: &Contract, second: &Contract, rng: &mut RngHandle) -> f64 {
        let agreeing = (0..self.num_samples)
            .map(|_| self.space.draw(rng))
            .filter(|sample| first.evaluate(sample) == second.evaluate(sample))
            .count();
        agreeing as f64 / self.num_samples as f64
    }

    /// Returns `true` when the estimated similarity exceeds the threshold.
    pub fn too_close(&self, first: &Contract, second: &Contract, rng: &mut RngHandle) -> bool {
        self.similarity(first, second, rng) > self.threshold
    }
}
