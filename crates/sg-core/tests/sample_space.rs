use std::collections::BTreeSet;

use proptest::prelude::*;
use sg_core::{Alphabet, RngHandle, SampleSpace};

fn space(symbols: &str, length: usize) -> SampleSpace {
    SampleSpace::new(Alphabet::new(symbols).unwrap(), length).unwrap()
}

#[test]
fn alphabet_is_upper_cased_and_ordered() {
    let alphabet = Alphabet::new("abDc").unwrap();
    assert_eq!(alphabet.symbols(), &['A', 'B', 'D', 'C']);
    assert_eq!(alphabet.to_string(), "ABDC");
}

#[test]
fn alphabet_rejects_bad_input() {
    assert_eq!(Alphabet::new("").unwrap_err().info().code, "alphabet-empty");
    assert_eq!(Alphabet::new("aA").unwrap_err().info().code, "alphabet-duplicate");
    assert_eq!(Alphabet::new("A.").unwrap_err().info().code, "alphabet-symbol");
    assert_eq!(Alphabet::new("A1").unwrap_err().info().code, "alphabet-symbol");
}

#[test]
fn zero_length_is_rejected() {
    let err = SampleSpace::new(Alphabet::new("AB").unwrap(), 0).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "length-zero");
}

#[test]
fn enumeration_covers_every_string_once() {
    let space = space("ABC", 3);
    let all: Vec<_> = space.iter().collect();
    assert_eq!(all.len() as u128, space.size().unwrap());
    assert_eq!(all.first().unwrap().as_str(), "AAA");
    assert_eq!(all.last().unwrap().as_str(), "CCC");
    let unique: BTreeSet<_> = all.iter().collect();
    assert_eq!(unique.len(), all.len());
}

#[test]
fn parse_validates_symbols_and_length() {
    let space = space("AB", 3);
    assert_eq!(space.parse("aba").unwrap().as_str(), "ABA");
    assert_eq!(space.parse("AB").unwrap_err().info().code, "sample-length");
    assert_eq!(space.parse("ABC").unwrap_err().info().code, "sample-symbol");
}

#[test]
fn alphabet_round_trips_as_plain_string() {
    let alphabet = Alphabet::new("ABCD").unwrap();
    let json = serde_json::to_string(&alphabet).unwrap();
    assert_eq!(json, "\"ABCD\"");
    assert!(serde_json::from_str::<Alphabet>("\"AA\"").is_err());
}

proptest! {
    #[test]
    fn draws_stay_inside_the_space(seed in any::<u64>(), length in 1usize..12) {
        let space = space("ABCD", length);
        let mut rng = RngHandle::from_seed(seed);
        for _ in 0..16 {
            let sample = space.draw(&mut rng);
            prop_assert_eq!(sample.len(), length);
            prop_assert!(sample.as_str().chars().all(|c| space.alphabet().contains(c)));
            prop_assert_eq!(space.parse(sample.as_str()).unwrap(), sample);
        }
    }
}
