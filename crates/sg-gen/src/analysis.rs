//! Information value of clues, computed by exhaustive enumeration.
//!
//! A clue partitions the sample space by its outcome. Its value is
//! `round(10 * mean(-ln p))`, the mean taken over the distinct outcomes and
//! `p` being the fraction of the space producing that outcome. Several clues
//! evaluated together partition the space by their joint outcome.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sg_core::{ErrorInfo, Sample, SampleSpace, SgError};

use crate::contract::Contract;
use crate::measure::Measurement;

/// Largest sample space the analysis will enumerate.
pub const MAX_ENUMERATED_SAMPLES: u128 = 1 << 20;

/// Anything shown to the player that maps a sample to an outcome.
pub trait Clue {
    /// Display label of the clue.
    fn label(&self) -> String;

    /// Outcome of the clue on `sample`.
    fn observe(&self, sample: &Sample) -> i64;
}

impl Clue for Measurement {
    fn label(&self) -> String {
        self.descriptor()
    }

    fn observe(&self, sample: &Sample) -> i64 {
        i64::from(self.evaluate(sample))
    }
}

impl Clue for Contract {
    fn label(&self) -> String {
        self.descriptor()
    }

    fn observe(&self, sample: &Sample) -> i64 {
        i64::from(self.evaluate(sample))
    }
}

/// Values of several clues alone and together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueComparison {
    /// Value of each clue on its own, in input order.
    pub each: Vec<i64>,
    /// Value of all clues evaluated jointly.
    pub together: i64,
    /// `together / sum(each)`; zero when every clue is worthless alone.
    pub efficiency: f64,
}

/// Enumerates a sample space and scores clues against it.
#[derive(Debug, Clone)]
pub struct InformationAnalyzer {
    space: SampleSpace,
    size: u128,
}

impl InformationAnalyzer {
    /// Creates an analyzer; refuses spaces above [`MAX_ENUMERATED_SAMPLES`].
    pub fn new(space: SampleSpace) -> Result<Self, SgError> {
        match space.size() {
            Some(size) if size <= MAX_ENUMERATED_SAMPLES => Ok(Self { space, size }),
            size => Err(SgError::Analysis(
                ErrorInfo::new("space-too-large", "sample space too large to enumerate")
                    .with_context("alphabet", space.alphabet())
                    .with_context("length", space.length())
                    .with_context(
                        "size",
                        size.map_or_else(|| "overflow".to_string(), |s| s.to_string()),
                    )
                    .with_hint("analysis is limited to 2^20 samples"),
            )),
        }
    }

    /// Fraction of the space producing each joint outcome of `clues`.
    pub fn histogram(&self, clues: &[&dyn Clue]) -> BTreeMap<Vec<i64>, f64> {
        let mut counts: BTreeMap<Vec<i64>, u64> = BTreeMap::new();
        for sample in self.space.iter() {
            let outcome = clues.iter().map(|clue| clue.observe(&sample)).collect();
            *counts.entry(outcome).or_insert(0) += 1;
        }
        let total = self.size as f64;
        counts
            .into_iter()
            .map(|(outcome, count)| (outcome, count as f64 / total))
            .collect()
    }

    /// Joint value of `clues`.
    pub fn value(&self, clues: &[&dyn Clue]) -> i64 {
        let histogram = self.histogram(clues);
        let outcomes = histogram.len() as f64;
        let mean_surprise = histogram.values().map(|p| -p.ln()).sum::<f64>() / outcomes;
        (10.0 * mean_surprise).round() as i64
    }

    /// Compares the clues' individual values with their joint value.
    pub fn compare(&self, clues: &[&dyn Clue]) -> ValueComparison {
        let each: Vec<i64> = clues.iter().map(|&clue| self.value(&[clue])).collect();
        let together = self.value(clues);
        let total: i64 = each.iter().sum();
        let efficiency = if total == 0 {
            0.0
        } else {
            together as f64 / total as f64
        };
        ValueComparison {
            each,
            together,
            efficiency,
        }
    }

    /// Value of every clue on its own, keyed by label, in input order.
    pub fn value_table(&self, clues: &[&dyn Clue]) -> IndexMap<String, i64> {
        clues
            .iter()
            .map(|&clue| (clue.label(), self.value(&[clue])))
            .collect()
    }
}
