use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sg_core::{RngHandle, Sample, SampleSpace, SgError};
use tracing::info;

use crate::analysis::{Clue, InformationAnalyzer, ValueComparison};
use crate::config::{GameConfig, GeneratorConfig, MeasurementPool};
use crate::contract::{Contract, ContractFactory};
use crate::determinism;
use crate::hash;
use crate::measure::{Measurement, MeasurementLibrary};
use crate::refine::{self, RefineReport, RefinedPair, Refiner};
use crate::similarity::SimilarityEstimator;

/// Identifier written into every game document.
pub const GAME_ID: &str = "0";

/// Finished puzzle as consumed by presentation layers.
///
/// Maps keep generation order: samples are named `sample1`, `sample2`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Game identifier, always [`GAME_ID`].
    pub game: String,
    /// Sample name to hidden sample.
    pub answers: IndexMap<String, Sample>,
    /// Sample name to measurement descriptor to value.
    pub measures: IndexMap<String, IndexMap<String, u32>>,
    /// Sample name to contract descriptor to truth value.
    pub contracts: IndexMap<String, IndexMap<String, bool>>,
}

impl Game {
    /// Sample names in generation order.
    pub fn sample_names(&self) -> impl Iterator<Item = &str> {
        self.answers.keys().map(String::as_str)
    }

    /// Contract descriptors in generation order.
    pub fn contract_descriptors(&self) -> Vec<&str> {
        self.contracts
            .values()
            .next()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Truth values of one contract across samples, in sample order.
    pub fn contract_column(&self, descriptor: &str) -> Vec<bool> {
        self.contracts
            .values()
            .filter_map(|row| row.get(descriptor).copied())
            .collect()
    }
}

/// Everything produced by one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// The game document.
    pub game: Game,
    /// How the refiner got there.
    pub report: RefineReport,
    /// Canonical SHA-256 of the game.
    pub game_hash: String,
    /// Information value of the final contracts, when requested.
    pub contract_values: Option<ValueComparison>,
    /// Series label from the seed policy, if any.
    #[serde(default)]
    pub label: Option<String>,
}

/// Names `sample1`, `sample2`, ... in order.
pub fn sample_names() -> impl Iterator<Item = String> {
    (1..).map(|index: usize| format!("sample{index}"))
}

/// Keeps each candidate independently with probability `inclusion_pct / 100`.
pub fn select_measurements(
    candidates: &[Measurement],
    inclusion_pct: f64,
    rng: &mut RngHandle,
) -> Vec<Measurement> {
    candidates
        .iter()
        .filter(|_| 100.0 * rng.gen::<f64>() < inclusion_pct)
        .cloned()
        .collect()
}

/// Evaluates every measurement and contract on every sample of a stable pair.
pub fn assemble(pair: &RefinedPair, measurements: &[Measurement]) -> Game {
    let named: Vec<(String, &Sample)> = sample_names().zip(pair.samples.iter()).collect();

    let answers = named
        .iter()
        .map(|(name, sample)| (name.clone(), (*sample).clone()))
        .collect();
    let measures = named
        .iter()
        .map(|(name, sample)| {
            let row = measurements
                .iter()
                .map(|measurement| (measurement.descriptor(), measurement.evaluate(sample)))
                .collect();
            (name.clone(), row)
        })
        .collect();
    let contracts = named
        .iter()
        .map(|(name, sample)| {
            let row = pair
                .contracts
                .iter()
                .map(|contract| (contract.descriptor(), contract.evaluate(sample)))
                .collect();
            (name.clone(), row)
        })
        .collect();

    Game {
        game: GAME_ID.to_string(),
        answers,
        measures,
        contracts,
    }
}

/// Validated generator holding the measurement library for one game shape.
///
/// Holds no mutable state; concurrent callers each supply their own
/// [`RngHandle`].
#[derive(Debug, Clone)]
pub struct GameGenerator {
    config: GeneratorConfig,
    space: SampleSpace,
    library: MeasurementLibrary,
    estimator: SimilarityEstimator,
}

impl GameGenerator {
    /// Validates `config` and enumerates the measurement library.
    pub fn new(config: GeneratorConfig) -> Result<Self, SgError> {
        let space = config.validate()?;
        let library = MeasurementLibrary::new(&space);
        let estimator = SimilarityEstimator::new(space.clone(), &config.similarity);
        Ok(Self {
            config,
            space,
            library,
            estimator,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Sample space of the game.
    pub fn space(&self) -> &SampleSpace {
        &self.space
    }

    /// Measurement library of the game.
    pub fn library(&self) -> &MeasurementLibrary {
        &self.library
    }

    /// Similarity estimator of the game.
    pub fn estimator(&self) -> &SimilarityEstimator {
        &self.estimator
    }

    /// Random contract generator over the library's operands.
    pub fn contract_factory(&self) -> ContractFactory<'_> {
        ContractFactory::new(
            self.library.operands(),
            self.space.length(),
            &self.config.contracts,
            &self.estimator,
        )
    }

    /// Fixed-point refiner for this game shape.
    pub fn refiner(&self) -> Refiner<'_> {
        Refiner::new(
            &self.config.game,
            &self.space,
            self.contract_factory(),
            &self.estimator,
            &self.config.refine,
        )
    }

    /// Generates one game, drawing all randomness from `rng`.
    pub fn generate(&self, rng: &mut RngHandle) -> Result<GenerationOutcome, SgError> {
        let (pair, report) = self.refiner().refine(rng)?;
        refine::check_invariants(
            &pair,
            self.config.game.num_samples,
            self.config.game.num_contracts,
        )?;

        let pool = match self.config.assembly.measurement_pool {
            MeasurementPool::Operands => self.library.operands(),
            MeasurementPool::Display => self.library.display(),
        };
        let measurements = select_measurements(
            pool,
            self.config.assembly.measurement_inclusion_pct,
            rng,
        );
        let game = assemble(&pair, &measurements);
        let contract_values = if self.config.assembly.score_contracts {
            Some(self.score_contracts(&pair.contracts)?)
        } else {
            None
        };

        info!(
            samples = pair.samples.len(),
            contracts = pair.contracts.len(),
            measurements = measurements.len(),
            passes = report.passes,
            "assembled game"
        );
        Ok(GenerationOutcome {
            game_hash: hash::canonical_game_hash(&game),
            game,
            report,
            contract_values,
            label: self.config.seed_policy.label.clone(),
        })
    }

    /// Generates one game from the configured master seed.
    pub fn generate_seeded(&self) -> Result<GenerationOutcome, SgError> {
        let mut rng = RngHandle::from_seed(self.config.seed_policy.master_seed);
        self.generate(&mut rng)
    }

    /// Generates `count` independent games, game `i` seeded with
    /// [`determinism::game_seed`]`(master_seed, i)`.
    pub fn generate_series(
        &self,
        master_seed: u64,
        count: usize,
    ) -> Result<Vec<GenerationOutcome>, SgError> {
        info!(
            label = self.config.seed_policy.label.as_deref().unwrap_or("-"),
            master_seed,
            count,
            "generating game series"
        );
        (0..count)
            .map(|index| {
                let mut rng = RngHandle::from_seed(determinism::game_seed(master_seed, index));
                self.generate(&mut rng)
            })
            .collect()
    }

    fn score_contracts(&self, contracts: &[Contract]) -> Result<ValueComparison, SgError> {
        let analyzer = InformationAnalyzer::new(self.space.clone())?;
        let clues: Vec<&dyn Clue> = contracts.iter().map(|c| c as &dyn Clue).collect();
        Ok(analyzer.compare(&clues))
    }
}

/// Generates a game with default policies.
///
/// Rejects degenerate shapes before drawing anything from `rng`.
pub fn generate(
    alphabet: &str,
    length: usize,
    num_samples: usize,
    num_contracts: usize,
    rng: &mut RngHandle,
) -> Result<Game, SgError> {
    let config =
        GeneratorConfig::for_game(GameConfig::new(alphabet, length, num_samples, num_contracts));
    let generator = GameGenerator::new(config)?;
    Ok(generator.generate(rng)?.game)
}
