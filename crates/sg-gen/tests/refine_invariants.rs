use std::collections::HashSet;

use proptest::prelude::*;
use rand::RngCore;
use sg_core::{RngHandle, Sample};
use sg_gen::refine::{check_invariants, contract_splits, sample_distinguished};
use sg_gen::{
    generate, Comparator, Comparison, Contract, Game, GameConfig, GameGenerator, GeneratorConfig,
    Measurement, Operand, RefinedPair,
};

fn compare(lhs: Measurement, comparator: Comparator, value: u32) -> Contract {
    Contract::single(Comparison {
        lhs,
        comparator,
        rhs: Operand::Constant(value),
    })
}

fn assert_pair_invariants(pair: &RefinedPair) {
    for contract in &pair.contracts {
        assert!(
            contract_splits(contract, &pair.samples),
            "{contract} does not split the samples"
        );
    }
    for sample in &pair.samples {
        let satisfied = pair
            .contracts
            .iter()
            .filter(|contract| contract.evaluate(sample))
            .count();
        assert!(satisfied > 0, "{sample} satisfies no contract");
        assert!(satisfied < pair.contracts.len(), "{sample} satisfies every contract");
    }
}

#[test]
fn default_refinement_satisfies_invariants() {
    let generator = GameGenerator::new(GeneratorConfig::default()).unwrap();
    let mut rng = RngHandle::from_seed(7);
    let (pair, report) = generator.refiner().refine(&mut rng).unwrap();

    assert_eq!(pair.contracts.len(), 5);
    assert_eq!(pair.samples.len(), 5);
    assert!(report.passes >= 1);
    assert_pair_invariants(&pair);
    check_invariants(&pair, 5, 5).unwrap();
}

#[test]
fn final_contracts_are_not_near_duplicates() {
    let generator = GameGenerator::new(GeneratorConfig::default()).unwrap();
    let mut rng = RngHandle::from_seed(8);
    let (pair, _) = generator.refiner().refine(&mut rng).unwrap();

    let estimator = generator.estimator();
    for (i, a) in pair.contracts.iter().enumerate() {
        for b in &pair.contracts[i + 1..] {
            let estimate = estimator.similarity(a, b, &mut rng);
            assert!(estimate < 0.8, "{a} ~ {b}: {estimate}");
        }
    }
}

#[test]
fn repair_leaves_a_stable_pair_untouched() {
    let generator = GameGenerator::new(GeneratorConfig::default()).unwrap();
    let mut rng = RngHandle::from_seed(21);
    let (pair, _) = generator.refiner().refine(&mut rng).unwrap();

    let mut replay = rng.clone();
    let repair = generator.refiner().repair(pair.clone(), &mut replay);

    assert_eq!(repair.pair, pair);
    assert_eq!(repair.contract_replacements, 0);
    assert_eq!(repair.sample_replacements, 0);
    assert!(repair.settled());
    assert_eq!(replay.next_u64(), rng.next_u64(), "repair consumed randomness");
}

#[test]
fn constant_contracts_are_replaced() {
    let generator = GameGenerator::new(GeneratorConfig::default()).unwrap();
    let refiner = generator.refiner();
    let mut rng = RngHandle::from_seed(4);
    let samples: Vec<Sample> = ["AAAAA", "BBBBB", "ABCDA", "DCBAD", "CCCCC"]
        .into_iter()
        .map(Sample::new_unchecked)
        .collect();
    let always = compare(Measurement::symbol_count('A'), Comparator::AtLeast, 0);
    let never = compare(Measurement::symbol_count('A'), Comparator::AtLeast, 6);
    let splitting = compare(Measurement::symbol_count('A'), Comparator::AtLeast, 1);

    let repaired = refiner.repair_contracts(
        vec![always.clone(), splitting.clone(), never.clone()],
        &samples,
        &mut rng,
    );
    assert!(repaired.settled);
    assert!(repaired.replaced >= 2);
    let contracts = repaired.items;
    assert_eq!(contracts[1], splitting);
    assert!(!contracts.contains(&always));
    assert!(!contracts.contains(&never));
    assert!(contracts
        .iter()
        .all(|contract| contract_splits(contract, &samples)));
}

#[test]
fn duplicate_contracts_and_samples_are_replaced() {
    let generator = GameGenerator::new(GeneratorConfig::default()).unwrap();
    let refiner = generator.refiner();
    let mut rng = RngHandle::from_seed(12);
    let samples: Vec<Sample> = ["AAAAA", "BBBBB", "ABCDA"]
        .into_iter()
        .map(Sample::new_unchecked)
        .collect();
    let splitting = compare(Measurement::symbol_count('A'), Comparator::AtLeast, 1);

    let contracts = refiner
        .repair_contracts(vec![splitting.clone(), splitting.clone()], &samples, &mut rng)
        .items;
    assert_eq!(contracts[0], splitting);
    assert_ne!(contracts[1].descriptor(), splitting.descriptor());

    let duplicated: Vec<Sample> = ["ABCDA", "ABCDA"]
        .into_iter()
        .map(Sample::new_unchecked)
        .collect();
    let repaired = refiner.repair_samples(duplicated, &[], &mut rng);
    let deduped = &repaired.items;
    assert_eq!(deduped[0].as_str(), "ABCDA");
    assert_ne!(deduped[1], deduped[0]);
    assert!(repaired.replaced >= 1);
}

#[test]
fn single_contract_waives_sample_distinction() {
    let contract = compare(Measurement::symbol_count('A'), Comparator::AtLeast, 1);
    let sample = Sample::new_unchecked("AAB");
    assert!(sample_distinguished(&sample, std::slice::from_ref(&contract)));

    let other = compare(Measurement::symbol_count('B'), Comparator::AtLeast, 1);
    assert!(!sample_distinguished(&sample, &[contract.clone(), other.clone()]));
    assert!(sample_distinguished(
        &Sample::new_unchecked("AAA"),
        &[contract, other]
    ));
}

#[test]
fn pruning_removes_the_earliest_most_connected_contract() {
    let generator = GameGenerator::new(GeneratorConfig::default()).unwrap();
    let refiner = generator.refiner();
    let mut rng = RngHandle::from_seed(30);

    let plain = compare(Measurement::symbol_count('A'), Comparator::AtLeast, 1);
    let padded = Contract::both(
        Comparison {
            lhs: Measurement::symbol_count('A'),
            comparator: Comparator::AtLeast,
            rhs: Operand::Constant(1),
        },
        Comparison {
            lhs: Measurement::symbol_count('B'),
            comparator: Comparator::AtLeast,
            rhs: Operand::Constant(0),
        },
    );
    let absent = compare(Measurement::symbol_count('A'), Comparator::Equal, 0);

    let (contracts, removed) = refiner.prune_similar(
        vec![plain.clone(), padded.clone(), absent.clone()],
        &mut rng,
    );
    assert_eq!(removed, Some(plain));
    assert_eq!(contracts.len(), 3);
    assert_eq!(contracts[0], padded);
    assert_eq!(contracts[1], absent);
}

#[test]
fn pruning_keeps_dissimilar_contracts() {
    let generator = GameGenerator::new(GeneratorConfig::default()).unwrap();
    let refiner = generator.refiner();
    let mut rng = RngHandle::from_seed(31);
    let some = compare(Measurement::symbol_count('A'), Comparator::AtLeast, 1);
    let none = compare(Measurement::symbol_count('A'), Comparator::Equal, 0);

    let (contracts, removed) = refiner.prune_similar(vec![some.clone(), none.clone()], &mut rng);
    assert_eq!(removed, None);
    assert_eq!(contracts, vec![some, none]);
}

#[test]
fn impossible_shape_reports_non_convergence() {
    // Every splitting contract over {A, B} is "is A" or "is B", so three of
    // them always contain a near-duplicate pair and pruning never settles.
    let mut config = GeneratorConfig::default();
    config.game.alphabet = "AB".into();
    config.game.length = 1;
    config.game.num_samples = 2;
    config.game.num_contracts = 3;
    config.contracts.conjunction_probability = 0.0;
    config.refine.max_passes = 25;
    config.refine.max_repair_rounds = 200;
    let generator = GameGenerator::new(config).unwrap();

    let mut rng = RngHandle::from_seed(1);
    let err = generator.refiner().refine(&mut rng).unwrap_err();
    assert!(err.is_convergence());
    assert_eq!(err.info().code, "refine-no-fixed-point");
    assert_eq!(err.info().context["max_passes"], "25");
}

fn tiny_generator(alphabet: &str, length: usize, samples: usize, contracts: usize) -> GameGenerator {
    let mut config =
        GeneratorConfig::for_game(GameConfig::new(alphabet, length, samples, contracts));
    config.refine.max_repair_rounds = 50;
    config.refine.max_passes = 300;
    GameGenerator::new(config).unwrap()
}

fn assert_game_invariants(game: &Game) {
    let distinct: HashSet<_> = game.answers.values().collect();
    assert_eq!(distinct.len(), game.answers.len(), "duplicate samples");
    for descriptor in game.contract_descriptors() {
        let column = game.contract_column(descriptor);
        assert!(column.contains(&true) && column.contains(&false), "{descriptor}");
    }
    for (name, row) in &game.contracts {
        let held = row.values().filter(|&&truth| truth).count();
        assert!(held > 0 && held < row.len(), "{name} holds {held} of {}", row.len());
    }
}

#[test]
fn unsatisfiable_sample_repair_is_reported_unsettled() {
    let generator = tiny_generator("AB", 2, 4, 2);
    let refiner = generator.refiner();
    let mut rng = RngHandle::from_seed(2);
    let contracts = vec![
        compare(Measurement::symbol_count('A'), Comparator::AtLeast, 1),
        compare(Measurement::symbol_count('B'), Comparator::AtLeast, 1),
    ];
    let samples: Vec<Sample> = ["AA", "AB", "BA", "BB"]
        .into_iter()
        .map(Sample::new_unchecked)
        .collect();

    let repaired = refiner.repair_samples(samples, &contracts, &mut rng);
    assert!(!repaired.settled);
    assert!(repaired.replaced >= 50);

    let pair = RefinedPair {
        contracts,
        samples: repaired.items,
    };
    let repair = refiner.repair(pair, &mut rng);
    assert!(!repair.samples_settled);
    assert!(!repair.settled());
}

#[test]
fn tiny_shapes_never_return_broken_pairs() {
    let generator = tiny_generator("AB", 2, 4, 2);
    let mut converged = 0;
    for seed in 0..20 {
        let mut rng = RngHandle::from_seed(seed);
        match generator.refiner().refine(&mut rng) {
            Ok((pair, report)) => {
                check_invariants(&pair, 4, 2)
                    .unwrap_or_else(|err| panic!("seed {seed}: {err} after {report:?}"));
                converged += 1;
            }
            Err(err) => assert!(err.is_convergence(), "seed {seed}: {err}"),
        }
    }
    assert!(converged > 0, "no seed reached a fixed point");
}

#[test]
fn stalled_passes_are_counted() {
    let generator = tiny_generator("AB", 2, 4, 2);
    let mut stalled = 0;
    for seed in 0..10 {
        let mut rng = RngHandle::from_seed(seed);
        if let Ok((_, report)) = generator.refiner().refine(&mut rng) {
            assert!(report.stalled_passes < report.passes);
            stalled += report.stalled_passes;
        }
    }
    assert!(stalled > 0);
}

#[test]
fn check_invariants_flags_constant_contracts() {
    let pair = RefinedPair {
        contracts: vec![compare(Measurement::symbol_count('A'), Comparator::AtLeast, 0)],
        samples: vec![Sample::new_unchecked("AB"), Sample::new_unchecked("BA")],
    };
    let err = check_invariants(&pair, 2, 1).unwrap_err();
    assert_eq!(err.info().code, "contract-not-splitting");

    let err = check_invariants(&pair, 3, 1).unwrap_err();
    assert_eq!(err.info().code, "pair-size");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn refined_pairs_hold_invariants_for_any_seed(seed in any::<u64>()) {
        let generator = GameGenerator::new(GeneratorConfig::default()).unwrap();
        let mut rng = RngHandle::from_seed(seed);
        let (pair, _) = generator.refiner().refine(&mut rng).unwrap();
        prop_assert!(check_invariants(&pair, 5, 5).is_ok());
        for contract in &pair.contracts {
            prop_assert!(contract_splits(contract, &pair.samples));
        }
        for sample in &pair.samples {
            prop_assert!(sample_distinguished(sample, &pair.contracts));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn small_shapes_yield_valid_games_or_convergence_errors(
        seed in any::<u64>(),
        shape in prop::sample::select(vec![("AB", 2usize), ("ABC", 1usize)]),
    ) {
        let (alphabet, length) = shape;
        let mut rng = RngHandle::from_seed(seed);
        match generate(alphabet, length, 3, 2, &mut rng) {
            Ok(game) => assert_game_invariants(&game),
            Err(err) => prop_assert!(err.is_convergence(), "{err}"),
        }
    }
}
