//! Fixed-point co-refinement of contract and sample sets.
//!
//! One pass repairs the contracts against the current samples, then the
//! samples against the repaired contracts, then prunes at most one
//! near-duplicate contract. Passes repeat until a pass leaves the whole
//! `(contracts, samples)` pair unchanged and both repair loops settled.
//! Every loop is capped. A repair loop that runs out of rounds hands its
//! partial result to the next pass, and such a pass never counts as a fixed
//! point. When the samples cannot be repaired against the current contracts,
//! one contract is redrawn so the next pass sees a different target. Only the
//! outer cap is reported, as [`SgError::Convergence`].

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sg_core::{ErrorInfo, RngHandle, Sample, SampleSpace, SgError};
use tracing::{debug, warn};

use crate::config::{GameConfig, RefinePolicy};
use crate::contract::{Contract, ContractFactory};
use crate::similarity::SimilarityEstimator;

/// Jointly refined contract and sample sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedPair {
    /// Contracts in generation order.
    pub contracts: Vec<Contract>,
    /// Samples in generation order.
    pub samples: Vec<Sample>,
}

/// Counters describing how a refinement went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineReport {
    /// Outer passes executed, including the final unchanged one.
    pub passes: usize,
    /// Contracts replaced by repair loops.
    pub contract_replacements: usize,
    /// Samples replaced by repair loops.
    pub sample_replacements: usize,
    /// Descriptors of contracts removed by similarity pruning, in order.
    pub pruned: Vec<String>,
    /// Passes in which a repair loop ran out of rounds.
    pub stalled_passes: usize,
}

/// Result of one capped repair loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired<T> {
    /// Items after repair, in their original slots.
    pub items: Vec<T>,
    /// Replacements made.
    pub replaced: usize,
    /// `false` when the round cap was hit with items still unacceptable.
    pub settled: bool,
}

/// Result of repairing both halves of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRepair {
    /// The repaired pair.
    pub pair: RefinedPair,
    /// Contracts replaced.
    pub contract_replacements: usize,
    /// Samples replaced.
    pub sample_replacements: usize,
    /// Contract repair finished with every contract acceptable.
    pub contracts_settled: bool,
    /// Sample repair finished with every sample acceptable.
    pub samples_settled: bool,
}

impl PairRepair {
    /// Both repair loops finished clean.
    pub fn settled(&self) -> bool {
        self.contracts_settled && self.samples_settled
    }
}

/// `true` when the contract holds for some sample and fails for another.
pub fn contract_splits(contract: &Contract, samples: &[Sample]) -> bool {
    let mut seen_true = false;
    let mut seen_false = false;
    for sample in samples {
        if contract.evaluate(sample) {
            seen_true = true;
        } else {
            seen_false = true;
        }
        if seen_true && seen_false {
            return true;
        }
    }
    false
}

/// `true` when the sample satisfies a strict, non-empty subset of the contracts.
///
/// With fewer than two contracts no sample can qualify, so the check is
/// waived and only distinctness is enforced by the repair loop.
pub fn sample_distinguished(sample: &Sample, contracts: &[Contract]) -> bool {
    if contracts.len() < 2 {
        return true;
    }
    let satisfied = contracts
        .iter()
        .filter(|contract| contract.evaluate(sample))
        .count();
    satisfied > 0 && satisfied < contracts.len()
}

/// Drives the repair/prune passes for one game.
#[derive(Debug)]
pub struct Refiner<'a> {
    num_samples: usize,
    num_contracts: usize,
    space: &'a SampleSpace,
    factory: ContractFactory<'a>,
    estimator: &'a SimilarityEstimator,
    policy: &'a RefinePolicy,
}

impl<'a> Refiner<'a> {
    /// Creates a refiner for the given game shape.
    pub fn new(
        game: &GameConfig,
        space: &'a SampleSpace,
        factory: ContractFactory<'a>,
        estimator: &'a SimilarityEstimator,
        policy: &'a RefinePolicy,
    ) -> Self {
        Self {
            num_samples: game.num_samples,
            num_contracts: game.num_contracts,
            space,
            factory,
            estimator,
            policy,
        }
    }

    /// Draws a fresh pair: independent contracts and distinct samples.
    pub fn initial_pair(&self, rng: &mut RngHandle) -> RefinedPair {
        let contracts = (0..self.num_contracts)
            .map(|_| self.factory.make(rng))
            .collect();
        let samples = (0..self.num_samples).map(|_| self.space.draw(rng)).collect();
        let samples = self.repair_samples(samples, &[], rng).items;
        RefinedPair { contracts, samples }
    }

    /// Runs passes from a fresh pair until nothing changes.
    pub fn refine(&self, rng: &mut RngHandle) -> Result<(RefinedPair, RefineReport), SgError> {
        let initial = self.initial_pair(rng);
        self.refine_from(initial, rng)
    }

    /// Runs passes from `pair` until nothing changes.
    pub fn refine_from(
        &self,
        mut pair: RefinedPair,
        rng: &mut RngHandle,
    ) -> Result<(RefinedPair, RefineReport), SgError> {
        let mut report = RefineReport::default();
        for pass in 1..=self.policy.max_passes {
            let repair = self.repair(pair.clone(), rng);
            let settled = repair.settled();
            let PairRepair {
                pair: RefinedPair {
                    mut contracts,
                    samples,
                },
                contract_replacements,
                sample_replacements,
                samples_settled,
                ..
            } = repair;

            if !samples_settled {
                let index = rng.gen_range(0..contracts.len());
                contracts[index] = self.factory.make(rng);
            }
            let (contracts, pruned) = if self.policy.prune_similar {
                self.prune_similar(contracts, rng)
            } else {
                (contracts, None)
            };

            report.passes = pass;
            report.contract_replacements += contract_replacements;
            report.sample_replacements += sample_replacements;
            if !settled {
                report.stalled_passes += 1;
            }
            let pruned = pruned.map(|contract| contract.descriptor());
            debug!(
                pass,
                contract_replacements,
                sample_replacements,
                settled,
                pruned = pruned.as_deref().unwrap_or("-"),
                "refiner pass"
            );
            report.pruned.extend(pruned);

            let next = RefinedPair { contracts, samples };
            if settled && next == pair {
                return Ok((next, report));
            }
            pair = next;
        }

        warn!(
            passes = self.policy.max_passes,
            num_samples = self.num_samples,
            num_contracts = self.num_contracts,
            stalled_passes = report.stalled_passes,
            "refiner did not reach a fixed point"
        );
        Err(SgError::Convergence(
            ErrorInfo::new(
                "refine-no-fixed-point",
                "contract/sample refinement did not stabilise",
            )
            .with_context("max_passes", self.policy.max_passes)
            .with_context("alphabet", self.space.alphabet())
            .with_context("length", self.space.length())
            .with_context("num_samples", self.num_samples)
            .with_context("num_contracts", self.num_contracts)
            .with_hint("raise refine.max_passes or relax the game shape"),
        ))
    }

    /// Contract repair followed by sample repair against the repaired
    /// contracts.
    ///
    /// A pair that already satisfies both checks comes back unchanged and no
    /// randomness is consumed.
    pub fn repair(&self, pair: RefinedPair, rng: &mut RngHandle) -> PairRepair {
        let contracts = self.repair_contracts(pair.contracts, &pair.samples, rng);
        let samples = self.repair_samples(pair.samples, &contracts.items, rng);
        PairRepair {
            pair: RefinedPair {
                contracts: contracts.items,
                samples: samples.items,
            },
            contract_replacements: contracts.replaced,
            sample_replacements: samples.replaced,
            contracts_settled: contracts.settled,
            samples_settled: samples.settled,
        }
    }

    /// Replaces duplicate contracts and contracts that do not split `samples`
    /// until none remain or the round cap is hit.
    pub fn repair_contracts(
        &self,
        contracts: Vec<Contract>,
        samples: &[Sample],
        rng: &mut RngHandle,
    ) -> Repaired<Contract> {
        replace_flagged(
            contracts,
            |contracts: &[Contract]| {
                let mut seen = HashSet::new();
                contracts
                    .iter()
                    .map(|contract| {
                        !seen.insert(contract.descriptor()) || !contract_splits(contract, samples)
                    })
                    .collect()
            },
            |rng: &mut RngHandle| self.factory.make(rng),
            self.policy.max_repair_rounds,
            "contracts",
            rng,
        )
    }

    /// Replaces duplicate samples and samples that are not distinguished by
    /// `contracts` until none remain or the round cap is hit.
    pub fn repair_samples(
        &self,
        samples: Vec<Sample>,
        contracts: &[Contract],
        rng: &mut RngHandle,
    ) -> Repaired<Sample> {
        replace_flagged(
            samples,
            |samples: &[Sample]| {
                let mut seen = HashSet::new();
                samples
                    .iter()
                    .map(|sample| {
                        !seen.insert(sample.clone()) || !sample_distinguished(sample, contracts)
                    })
                    .collect()
            },
            |rng: &mut RngHandle| self.space.draw(rng),
            self.policy.max_repair_rounds,
            "samples",
            rng,
        )
    }

    /// Removes the contract with the most near-duplicate partners and appends
    /// one fresh replacement. Ties go to the contract seen first in the pair
    /// scan. Returns the removed contract, if any.
    ///
    /// The replacement is not checked here; the next pass repairs or prunes it.
    pub fn prune_similar(
        &self,
        mut contracts: Vec<Contract>,
        rng: &mut RngHandle,
    ) -> (Vec<Contract>, Option<Contract>) {
        let n = contracts.len();
        let mut partners = vec![0usize; n];
        let mut first_seen: Vec<Option<usize>> = vec![None; n];
        let mut order = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                if !self.estimator.too_close(&contracts[i], &contracts[j], rng) {
                    continue;
                }
                for k in [i, j] {
                    partners[k] += 1;
                    if first_seen[k].is_none() {
                        first_seen[k] = Some(order);
                        order += 1;
                    }
                }
            }
        }

        let worst = (0..n).filter(|&k| partners[k] > 0).max_by(|&a, &b| {
            partners[a]
                .cmp(&partners[b])
                .then(first_seen[b].cmp(&first_seen[a]))
        });
        match worst {
            Some(index) => {
                let removed = contracts.remove(index);
                contracts.push(self.factory.make(rng));
                (contracts, Some(removed))
            }
            None => (contracts, None),
        }
    }
}

/// Checks the final pair against the invariants the refiner promises.
pub fn check_invariants(
    pair: &RefinedPair,
    num_samples: usize,
    num_contracts: usize,
) -> Result<(), SgError> {
    if pair.samples.len() != num_samples || pair.contracts.len() != num_contracts {
        return Err(SgError::Invariant(
            ErrorInfo::new("pair-size", "refined pair has the wrong size")
                .with_context("samples", pair.samples.len())
                .with_context("contracts", pair.contracts.len()),
        ));
    }
    if let Some(contract) = pair
        .contracts
        .iter()
        .find(|contract| !contract_splits(contract, &pair.samples))
    {
        return Err(SgError::Invariant(
            ErrorInfo::new("contract-not-splitting", "contract is constant over the samples")
                .with_context("contract", contract),
        ));
    }
    if let Some(sample) = pair
        .samples
        .iter()
        .find(|sample| !sample_distinguished(sample, &pair.contracts))
    {
        return Err(SgError::Invariant(
            ErrorInfo::new(
                "sample-not-distinguished",
                "sample satisfies every contract or none",
            )
            .with_context("sample", sample),
        ));
    }
    let distinct: HashSet<&Sample> = pair.samples.iter().collect();
    let descriptors: HashSet<String> = pair.contracts.iter().map(Contract::descriptor).collect();
    if distinct.len() != pair.samples.len() || descriptors.len() != pair.contracts.len() {
        return Err(SgError::Invariant(ErrorInfo::new(
            "pair-duplicates",
            "refined pair contains duplicate samples or contracts",
        )));
    }
    Ok(())
}

fn replace_flagged<T, F, M>(
    mut items: Vec<T>,
    flag: F,
    mut make: M,
    max_rounds: usize,
    what: &str,
    rng: &mut RngHandle,
) -> Repaired<T>
where
    F: Fn(&[T]) -> Vec<bool>,
    M: FnMut(&mut RngHandle) -> T,
{
    let mut replaced = 0;
    for _ in 0..max_rounds {
        let flags = flag(&items);
        if !flags.contains(&true) {
            return Repaired {
                items,
                replaced,
                settled: true,
            };
        }
        for (item, bad) in items.iter_mut().zip(flags) {
            if bad {
                *item = make(rng);
                replaced += 1;
            }
        }
    }
    let still_flagged = flag(&items).into_iter().filter(|&bad| bad).count();
    if still_flagged > 0 {
        warn!(what, max_rounds, still_flagged, "repair loop gave up for this pass");
    }
    Repaired {
        items,
        replaced,
        settled: still_flagged == 0,
    }
}
