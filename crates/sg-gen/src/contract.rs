use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sg_core::{RngHandle, Sample};
use tracing::debug;

use crate::config::ContractPolicy;
use crate::measure::Measurement;
use crate::similarity::SimilarityEstimator;

/// Comparison operator between two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparator {
    /// `≥`
    AtLeast,
    /// `≤`
    AtMost,
    /// `=`
    Equal,
}

impl Comparator {
    /// Every comparator, in draw order.
    pub const ALL: [Comparator; 3] = [Comparator::AtMost, Comparator::AtLeast, Comparator::Equal];

    /// Symbol used in descriptors.
    pub fn symbol(&self) -> char {
        match self {
            Comparator::AtLeast => '≥',
            Comparator::AtMost => '≤',
            Comparator::Equal => '=',
        }
    }

    /// Applies the comparator.
    pub fn holds(&self, lhs: u32, rhs: u32) -> bool {
        match self {
            Comparator::AtLeast => lhs >= rhs,
            Comparator::AtMost => lhs <= rhs,
            Comparator::Equal => lhs == rhs,
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operand {
    /// Another measurement evaluated on the same sample.
    Measure(Measurement),
    /// A fixed integer.
    Constant(u32),
}

impl Operand {
    /// Evaluates the operand on a sample.
    pub fn evaluate(&self, sample: &Sample) -> u32 {
        match self {
            Operand::Measure(measurement) => measurement.evaluate(sample),
            Operand::Constant(value) => *value,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Measure(measurement) => write!(f, "{measurement}"),
            Operand::Constant(value) => write!(f, "{value}"),
        }
    }
}

/// `measurement cmp operand`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comparison {
    /// Left-hand measurement.
    pub lhs: Measurement,
    /// Operator.
    pub comparator: Comparator,
    /// Right-hand operand.
    pub rhs: Operand,
}

impl Comparison {
    /// Evaluates the comparison on a sample.
    pub fn evaluate(&self, sample: &Sample) -> bool {
        self.comparator
            .holds(self.lhs.evaluate(sample), self.rhs.evaluate(sample))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.lhs, self.comparator.symbol(), self.rhs)
    }
}

/// Yes/no clue: one comparison or the conjunction of two.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Contract {
    /// A single comparison.
    Single {
        /// The comparison.
        comparison: Comparison,
    },
    /// Both comparisons must hold.
    Both {
        /// First conjunct.
        first: Comparison,
        /// Second conjunct.
        second: Comparison,
    },
}

impl Contract {
    /// Wraps a single comparison.
    pub fn single(comparison: Comparison) -> Self {
        Contract::Single { comparison }
    }

    /// Conjunction of two comparisons.
    pub fn both(first: Comparison, second: Comparison) -> Self {
        Contract::Both { first, second }
    }

    /// Canonical descriptor used as display label and map key.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }

    /// Evaluates the contract on a sample.
    pub fn evaluate(&self, sample: &Sample) -> bool {
        match self {
            Contract::Single { comparison } => comparison.evaluate(sample),
            Contract::Both { first, second } => first.evaluate(sample) && second.evaluate(sample),
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contract::Single { comparison } => write!(f, "{comparison}"),
            Contract::Both { first, second } => write!(f, "{first} and {second}"),
        }
    }
}

/// Random contract generator over a fixed operand pool.
///
/// The right-hand side is drawn from a pool in which every constant in
/// `1..length` appears `zero_avoidance` times and `0` once; that constant pool
/// is repeated `constant_preference` times and each measurement is added once.
#[derive(Debug, Clone)]
pub struct ContractFactory<'a> {
    operands: &'a [Measurement],
    length: usize,
    policy: &'a ContractPolicy,
    estimator: &'a SimilarityEstimator,
}

impl<'a> ContractFactory<'a> {
    /// Creates a factory. `operands` must not be empty.
    pub fn new(
        operands: &'a [Measurement],
        length: usize,
        policy: &'a ContractPolicy,
        estimator: &'a SimilarityEstimator,
    ) -> Self {
        debug_assert!(!operands.is_empty(), "contract factory needs operands");
        Self {
            operands,
            length,
            policy,
            estimator,
        }
    }

    /// Draws a fresh contract.
    pub fn make(&self, rng: &mut RngHandle) -> Contract {
        if rng.gen::<f64>() >= self.policy.conjunction_probability {
            return Contract::single(self.random_comparison(rng));
        }

        let first = self.random_comparison(rng);
        let first_contract = Contract::single(first.clone());
        for _ in 0..self.policy.max_conjunction_draws {
            let second = self.random_comparison(rng);
            let candidate = Contract::single(second.clone());
            if self.estimator.similarity(&first_contract, &candidate, rng) < self.estimator.threshold()
            {
                return Contract::both(first, second);
            }
        }
        debug!(
            contract = %first_contract,
            draws = self.policy.max_conjunction_draws,
            "no dissimilar second comparison found; keeping single comparison"
        );
        first_contract
    }

    /// Draws one comparison: uniform measurement, uniform comparator, biased
    /// right-hand side.
    pub fn random_comparison(&self, rng: &mut RngHandle) -> Comparison {
        let lhs = self.operands[rng.gen_range(0..self.operands.len())].clone();
        let comparator = Comparator::ALL[rng.gen_range(0..Comparator::ALL.len())];
        let rhs = self.random_operand(rng);
        Comparison {
            lhs,
            comparator,
            rhs,
        }
    }

    /// Draws a right-hand operand from the biased pool.
    pub fn random_operand(&self, rng: &mut RngHandle) -> Operand {
        let nonzero = self.length.saturating_sub(1) * self.policy.zero_avoidance;
        let constant_pool = nonzero + 1;
        let constants = constant_pool * self.policy.constant_preference;
        let index = rng.gen_range(0..constants + self.operands.len());
        if index < constants {
            let slot = index % constant_pool;
            if slot < nonzero {
                Operand::Constant((1 + slot % (self.length - 1)) as u32)
            } else {
                Operand::Constant(0)
            }
        } else {
            Operand::Measure(self.operands[index - constants].clone())
        }
    }
}
