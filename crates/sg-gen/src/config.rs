use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sg_core::{Alphabet, ErrorInfo, SampleSpace, SgError};

use crate::analysis::MAX_ENUMERATED_SAMPLES;

/// YAML-configurable parameters governing game generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    /// Shape of the game: alphabet, sample length and set sizes.
    #[serde(default)]
    pub game: GameConfig,
    /// Bias knobs for the random contract generator.
    #[serde(default)]
    pub contracts: ContractPolicy,
    /// Monte-Carlo similarity settings.
    #[serde(default)]
    pub similarity: SimilarityPolicy,
    /// Iteration caps for the fixed-point refiner.
    #[serde(default)]
    pub refine: RefinePolicy,
    /// Output assembly options.
    #[serde(default)]
    pub assembly: AssemblyPolicy,
    /// Master seed and label.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

impl GeneratorConfig {
    /// Builds a configuration with default policies around the given game shape.
    pub fn for_game(game: GameConfig) -> Self {
        Self {
            game,
            ..Self::default()
        }
    }

    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, SgError> {
        serde_yaml::from_str(text)
            .map_err(|err| SgError::Serde(ErrorInfo::new("config-parse", err.to_string())))
    }

    /// Loads a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, SgError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            SgError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Serializes the configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String, SgError> {
        serde_yaml::to_string(self)
            .map_err(|err| SgError::Serde(ErrorInfo::new("config-serialize", err.to_string())))
    }

    /// Checks every field and returns the sample space the game lives in.
    ///
    /// Runs before anything is drawn, so a rejected configuration never
    /// consumes randomness.
    pub fn validate(&self) -> Result<SampleSpace, SgError> {
        let space = self.game.validate()?;
        self.contracts.validate()?;
        self.similarity.validate()?;
        self.refine.validate()?;
        self.assembly.validate()?;
        if self.assembly.score_contracts {
            check_enumerable(&space)?;
        }
        Ok(space)
    }
}

/// Shape of a single game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Symbols samples are drawn from.
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
    /// Number of symbols in every sample.
    #[serde(default = "default_length")]
    pub length: usize,
    /// Number of hidden samples in the game.
    #[serde(default = "default_set_size")]
    pub num_samples: usize,
    /// Number of yes/no clues in the game.
    #[serde(default = "default_set_size")]
    pub num_contracts: usize,
}

fn default_alphabet() -> String {
    "ABCD".to_string()
}

fn default_length() -> usize {
    5
}

fn default_set_size() -> usize {
    5
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            alphabet: default_alphabet(),
            length: default_length(),
            num_samples: default_set_size(),
            num_contracts: default_set_size(),
        }
    }
}

impl GameConfig {
    /// Convenience constructor mirroring the public `generate` signature.
    pub fn new(alphabet: &str, length: usize, num_samples: usize, num_contracts: usize) -> Self {
        Self {
            alphabet: alphabet.to_string(),
            length,
            num_samples,
            num_contracts,
        }
    }

    /// Validates the game shape and builds its sample space.
    pub fn validate(&self) -> Result<SampleSpace, SgError> {
        if self.num_samples < 2 {
            return Err(SgError::Config(
                ErrorInfo::new(
                    "num-samples-too-small",
                    "a game needs at least two samples for any clue to split them",
                )
                .with_context("num_samples", self.num_samples),
            ));
        }
        if self.num_contracts == 0 {
            return Err(SgError::config(
                "num-contracts-zero",
                "a game needs at least one contract",
                "num_contracts",
                self.num_contracts,
            ));
        }
        let alphabet = Alphabet::new(&self.alphabet)?;
        let space = SampleSpace::new(alphabet, self.length)?;
        let enough = space
            .size()
            .map_or(true, |size| size >= self.num_samples as u128);
        if !enough {
            return Err(SgError::Config(
                ErrorInfo::new(
                    "num-samples-exceeds-space",
                    "more samples requested than distinct strings exist",
                )
                .with_context("num_samples", self.num_samples)
                .with_context("alphabet", &self.alphabet)
                .with_context("length", self.length),
            ));
        }
        Ok(space)
    }
}

/// Biases applied when drawing random contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractPolicy {
    /// Probability that a fresh contract is a conjunction of two comparisons.
    #[serde(default = "default_conjunction_probability")]
    pub conjunction_probability: f64,
    /// Weight of each non-zero constant relative to the constant zero.
    #[serde(default = "default_zero_avoidance")]
    pub zero_avoidance: usize,
    /// How many times the constant pool is repeated against the measurement pool.
    #[serde(default = "default_constant_preference")]
    pub constant_preference: usize,
    /// Re-draw budget when looking for a dissimilar second comparison.
    #[serde(default = "default_max_conjunction_draws")]
    pub max_conjunction_draws: usize,
}

fn default_conjunction_probability() -> f64 {
    0.3
}

fn default_zero_avoidance() -> usize {
    10
}

fn default_constant_preference() -> usize {
    15
}

fn default_max_conjunction_draws() -> usize {
    1000
}

impl Default for ContractPolicy {
    fn default() -> Self {
        Self {
            conjunction_probability: default_conjunction_probability(),
            zero_avoidance: default_zero_avoidance(),
            constant_preference: default_constant_preference(),
            max_conjunction_draws: default_max_conjunction_draws(),
        }
    }
}

impl ContractPolicy {
    fn validate(&self) -> Result<(), SgError> {
        check_unit_interval("conjunction_probability", self.conjunction_probability)?;
        if self.zero_avoidance == 0 {
            return Err(SgError::config(
                "zero-avoidance-zero",
                "zero_avoidance must be positive",
                "zero_avoidance",
                self.zero_avoidance,
            ));
        }
        if self.constant_preference == 0 {
            return Err(SgError::config(
                "constant-preference-zero",
                "constant_preference must be positive",
                "constant_preference",
                self.constant_preference,
            ));
        }
        if self.max_conjunction_draws == 0 {
            return Err(SgError::config(
                "conjunction-draws-zero",
                "max_conjunction_draws must be positive",
                "max_conjunction_draws",
                self.max_conjunction_draws,
            ));
        }
        Ok(())
    }
}

/// Monte-Carlo similarity settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPolicy {
    /// Agreement fraction above which two contracts count as near-duplicates.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Random samples drawn per estimate.
    #[serde(default = "default_similarity_samples")]
    pub num_samples: usize,
}

fn default_threshold() -> f64 {
    0.7
}

fn default_similarity_samples() -> usize {
    1000
}

impl Default for SimilarityPolicy {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            num_samples: default_similarity_samples(),
        }
    }
}

impl SimilarityPolicy {
    fn validate(&self) -> Result<(), SgError> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(SgError::config(
                "threshold-range",
                "similarity threshold must lie in (0, 1]",
                "threshold",
                self.threshold,
            ));
        }
        if self.num_samples == 0 {
            return Err(SgError::config(
                "similarity-samples-zero",
                "similarity estimates need at least one sample",
                "num_samples",
                self.num_samples,
            ));
        }
        Ok(())
    }
}

/// Iteration caps for the fixed-point search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinePolicy {
    /// Outer passes (repair + prune) before giving up.
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
    /// Replacement rounds allowed inside one repair loop.
    #[serde(default = "default_max_repair_rounds")]
    pub max_repair_rounds: usize,
    /// Whether near-duplicate contracts are pruned.
    #[serde(default = "default_prune_similar")]
    pub prune_similar: bool,
}

fn default_max_passes() -> usize {
    1000
}

fn default_max_repair_rounds() -> usize {
    10_000
}

fn default_prune_similar() -> bool {
    true
}

impl Default for RefinePolicy {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
            max_repair_rounds: default_max_repair_rounds(),
            prune_similar: default_prune_similar(),
        }
    }
}

impl RefinePolicy {
    fn validate(&self) -> Result<(), SgError> {
        if self.max_passes == 0 {
            return Err(SgError::config(
                "max-passes-zero",
                "max_passes must be positive",
                "max_passes",
                self.max_passes,
            ));
        }
        if self.max_repair_rounds == 0 {
            return Err(SgError::config(
                "max-repair-rounds-zero",
                "max_repair_rounds must be positive",
                "max_repair_rounds",
                self.max_repair_rounds,
            ));
        }
        Ok(())
    }
}

/// Options for the final game structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyPolicy {
    /// Chance, in percent, that each display measurement is shown.
    #[serde(default = "default_inclusion_pct")]
    pub measurement_inclusion_pct: f64,
    /// Which measurement family the display subset is drawn from.
    #[serde(default)]
    pub measurement_pool: MeasurementPool,
    /// Attach an information-value comparison of the final contracts.
    #[serde(default)]
    pub score_contracts: bool,
}

/// Measurement family offered to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementPool {
    /// Every contract operand, including the 2-position windows.
    #[default]
    Operands,
    /// Symbol counts, pair counts and 3-position windows only.
    Display,
}

fn default_inclusion_pct() -> f64 {
    100.0
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            measurement_inclusion_pct: default_inclusion_pct(),
            measurement_pool: MeasurementPool::default(),
            score_contracts: false,
        }
    }
}

impl AssemblyPolicy {
    fn validate(&self) -> Result<(), SgError> {
        if !(0.0..=100.0).contains(&self.measurement_inclusion_pct) {
            return Err(SgError::config(
                "inclusion-pct-range",
                "measurement_inclusion_pct must lie in [0, 100]",
                "measurement_inclusion_pct",
                self.measurement_inclusion_pct,
            ));
        }
        Ok(())
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used when the caller does not supply a handle.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional series label, copied into every generation outcome.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x5EED_AB_CD_0005_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), SgError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SgError::Config(
            ErrorInfo::new("probability-range", "probability must lie in [0, 1]")
                .with_context("field", field)
                .with_context("value", value),
        ))
    }
}

fn check_enumerable(space: &SampleSpace) -> Result<(), SgError> {
    match space.size() {
        Some(size) if size <= MAX_ENUMERATED_SAMPLES => Ok(()),
        size => Err(SgError::Config(
            ErrorInfo::new(
                "score-space-too-large",
                "contract scoring enumerates the sample space, which is too large",
            )
            .with_context("alphabet", space.alphabet())
            .with_context("length", space.length())
            .with_context(
                "size",
                size.map_or_else(|| "overflow".to_string(), |s| s.to_string()),
            )
            .with_hint("disable assembly.score_contracts or shorten the samples"),
        )),
    }
}
