#![deny(missing_docs)]

//! Co-generation of hidden samples and yes/no contracts for a deduction
//! guessing game.
//!
//! A [`GameGenerator`] validates a [`GeneratorConfig`], enumerates the
//! measurement library and drives the fixed-point [`refine::Refiner`] until
//! every contract splits the samples, every sample is told apart by the
//! contracts and no two contracts are near-duplicates. The stable pair is
//! then evaluated into a [`Game`] document.

/// Information value of clues by exhaustive enumeration.
pub mod analysis;
/// YAML configuration schema and defaults.
pub mod config;
/// Contract types and the random contract generator.
pub mod contract;
/// Seed derivation for game series.
pub mod determinism;
/// Game assembly and the public generation entry points.
pub mod game;
/// Canonical game hashing.
pub mod hash;
/// Measurement types and the deterministic measurement library.
pub mod measure;
/// Fixed-point refinement of contract and sample sets.
pub mod refine;
/// JSON helpers for game documents.
pub mod serde;
/// Monte-Carlo contract similarity.
pub mod similarity;

pub use analysis::{Clue, InformationAnalyzer, ValueComparison};
pub use config::{
    AssemblyPolicy, ContractPolicy, GameConfig, GeneratorConfig, MeasurementPool, RefinePolicy,
    SeedPolicy, SimilarityPolicy,
};
pub use contract::{Comparator, Comparison, Contract, ContractFactory, Operand};
pub use game::{assemble, generate, Game, GameGenerator, GenerationOutcome, GAME_ID};
pub use measure::{Measurement, MeasurementLibrary};
pub use refine::{PairRepair, RefineReport, RefinedPair, Refiner, Repaired};
pub use similarity::SimilarityEstimator;
