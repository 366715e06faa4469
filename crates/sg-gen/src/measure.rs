use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sg_core::{Sample, SampleSpace};

/// Numeric clue computed from a sample.
///
/// The descriptor is rendered from the same fields that drive evaluation, so
/// the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Measurement {
    /// Occurrences of a symbol anywhere in the sample. Rendered as `A`.
    SymbolCount {
        /// Counted symbol.
        symbol: char,
    },
    /// Overlapping occurrences of a two-symbol substring. Rendered as `AB`.
    PairCount {
        /// Counted substring.
        pair: [char; 2],
    },
    /// Occurrences of a symbol at a fixed set of positions. Rendered as a
    /// pattern such as `A..A.`.
    PositionCount {
        /// Counted symbol.
        symbol: char,
        /// Sorted, distinct, in-bounds positions.
        positions: Vec<usize>,
        /// Sample length the pattern is rendered for.
        length: usize,
    },
}

impl Measurement {
    /// Counts `symbol` anywhere in the sample.
    pub fn symbol_count(symbol: char) -> Self {
        Measurement::SymbolCount { symbol }
    }

    /// Counts the substring `first second` over sliding windows.
    pub fn pair_count(first: char, second: char) -> Self {
        Measurement::PairCount {
            pair: [first, second],
        }
    }

    /// Counts `symbol` at `positions` for samples of `length` symbols.
    ///
    /// Negative positions count from the end. Positions are sorted and
    /// de-duplicated. Returns `None` when a position falls outside the sample
    /// or when the set covers every position, which would merely duplicate
    /// [`Measurement::SymbolCount`].
    pub fn at_positions(length: usize, positions: &[isize], symbol: char) -> Option<Self> {
        let mut resolved = Vec::with_capacity(positions.len());
        for &position in positions {
            let index = if position < 0 {
                length.checked_sub(position.unsigned_abs())?
            } else {
                position as usize
            };
            if index >= length {
                return None;
            }
            resolved.push(index);
        }
        resolved.sort_unstable();
        resolved.dedup();
        if resolved.is_empty() || resolved.len() == length {
            return None;
        }
        Some(Measurement::PositionCount {
            symbol,
            positions: resolved,
            length,
        })
    }

    /// Canonical descriptor used as display label and map key.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }

    /// Evaluates the measurement on a sample.
    pub fn evaluate(&self, sample: &Sample) -> u32 {
        let bytes = sample.as_bytes();
        let count = match self {
            Measurement::SymbolCount { symbol } => {
                bytes.iter().filter(|&&byte| byte as char == *symbol).count()
            }
            Measurement::PairCount { pair } => bytes
                .windows(2)
                .filter(|window| window[0] as char == pair[0] && window[1] as char == pair[1])
                .count(),
            Measurement::PositionCount {
                symbol, positions, ..
            } => positions
                .iter()
                .filter(|&&position| {
                    debug_assert!(position < bytes.len(), "position {position} out of bounds");
                    sample.symbol_at(position) == Some(*symbol)
                })
                .count(),
        };
        count as u32
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::SymbolCount { symbol } => write!(f, "{symbol}"),
            Measurement::PairCount { pair } => write!(f, "{}{}", pair[0], pair[1]),
            Measurement::PositionCount {
                symbol,
                positions,
                length,
            } => {
                let mut pattern = vec!['.'; *length];
                for &position in positions {
                    pattern[position] = *symbol;
                }
                f.write_str(&pattern.into_iter().collect::<String>())
            }
        }
    }
}

/// Slides `kernel` across every start offset that keeps its last element at
/// or below `max`.
///
/// `kernel` must be ascending.
pub fn sweep_offsets(kernel: &[usize], max: usize) -> Vec<Vec<usize>> {
    let Some(&last) = kernel.last() else {
        return Vec::new();
    };
    (0..)
        .take_while(|offset| last + offset <= max)
        .map(|offset| kernel.iter().map(|k| k + offset).collect())
        .collect()
}

const DISPLAY_TRIPLES: [&[usize]; 3] = [&[0, 1, 2], &[0, 2, 4], &[0, 3, 4]];
const EXTRA_TRIPLES: [&[usize]; 1] = [&[0, 2, 3]];
const EXTRA_PAIRS: [&[usize]; 3] = [&[0, 1], &[0, 2], &[0, 3]];

/// Deterministic enumeration of the measurements available for a sample space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementLibrary {
    display: Vec<Measurement>,
    operands: Vec<Measurement>,
}

impl MeasurementLibrary {
    /// Enumerates both measurement families for `space`.
    pub fn new(space: &SampleSpace) -> Self {
        let symbols = space.alphabet().symbols();
        let length = space.length();
        let max = length - 1;

        let mut display = Vec::new();
        display.extend(symbols.iter().map(|&symbol| Measurement::symbol_count(symbol)));
        for &first in symbols {
            for &second in symbols {
                display.push(Measurement::pair_count(first, second));
            }
        }
        let mut triples: Vec<Vec<isize>> = DISPLAY_TRIPLES
            .iter()
            .flat_map(|kernel| sweep_offsets(kernel, max))
            .map(signed)
            .collect();
        triples.push(vec![0, (length / 2) as isize, -1]);
        extend_positional(&mut display, length, &triples, symbols);
        let display = dedup_by_descriptor(display);

        let mut operands = display.clone();
        let extra_triples: Vec<Vec<isize>> = EXTRA_TRIPLES
            .iter()
            .flat_map(|kernel| sweep_offsets(kernel, max))
            .map(signed)
            .collect();
        extend_positional(&mut operands, length, &extra_triples, symbols);
        let extra_pairs: Vec<Vec<isize>> = EXTRA_PAIRS
            .iter()
            .flat_map(|kernel| sweep_offsets(kernel, max))
            .map(signed)
            .collect();
        extend_positional(&mut operands, length, &extra_pairs, symbols);
        let operands = dedup_by_descriptor(operands);

        Self { display, operands }
    }

    /// Measurements eligible to be shown to the player.
    pub fn display(&self) -> &[Measurement] {
        &self.display
    }

    /// Superset of [`Self::display`] that contracts may compare.
    pub fn operands(&self) -> &[Measurement] {
        &self.operands
    }
}

fn signed(positions: Vec<usize>) -> Vec<isize> {
    positions.into_iter().map(|p| p as isize).collect()
}

fn extend_positional(
    out: &mut Vec<Measurement>,
    length: usize,
    position_sets: &[Vec<isize>],
    symbols: &[char],
) {
    for positions in position_sets {
        for &symbol in symbols {
            if let Some(measurement) = Measurement::at_positions(length, positions, symbol) {
                out.push(measurement);
            }
        }
    }
}

fn dedup_by_descriptor(measurements: Vec<Measurement>) -> Vec<Measurement> {
    let mut seen = HashSet::new();
    measurements
        .into_iter()
        .filter(|measurement| seen.insert(measurement.descriptor()))
        .collect()
}
