//! Alphabet, sample strings and the space they are drawn from.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SgError};
use crate::rng::RngHandle;

/// Ordered set of distinct upper-case ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    /// Parses an alphabet, upper-casing every symbol.
    ///
    /// Rejects empty input, anything that is not an ASCII letter and symbols
    /// that repeat once case is folded.
    pub fn new(symbols: &str) -> Result<Self, SgError> {
        if symbols.is_empty() {
            return Err(SgError::Config(
                ErrorInfo::new("alphabet-empty", "alphabet must contain at least one symbol")
                    .with_hint("use e.g. \"ABCD\""),
            ));
        }
        let mut parsed: Vec<char> = Vec::with_capacity(symbols.len());
        for symbol in symbols.chars() {
            if !symbol.is_ascii_alphabetic() {
                return Err(SgError::config(
                    "alphabet-symbol",
                    "alphabet symbols must be ASCII letters",
                    "symbol",
                    symbol,
                ));
            }
            let symbol = symbol.to_ascii_uppercase();
            if parsed.contains(&symbol) {
                return Err(SgError::config(
                    "alphabet-duplicate",
                    "alphabet symbols must be distinct",
                    "symbol",
                    symbol,
                ));
            }
            parsed.push(symbol);
        }
        Ok(Self { symbols: parsed })
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Always `false` for a constructed alphabet.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns `true` when `symbol` belongs to the alphabet.
    pub fn contains(&self, symbol: char) -> bool {
        self.symbols.contains(&symbol)
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Alphabet {
    type Error = SgError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Alphabet::new(&value)
    }
}

impl From<Alphabet> for String {
    fn from(value: Alphabet) -> Self {
        value.to_string()
    }
}

/// One candidate hidden answer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample(String);

impl Sample {
    /// Wraps a string without validation; use [`SampleSpace::parse`] for
    /// untrusted input.
    pub fn new_unchecked(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The sample as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The sample as ASCII bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Symbol at `position`, if any.
    pub fn symbol_at(&self, position: usize) -> Option<char> {
        self.as_bytes().get(position).map(|&byte| byte as char)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All strings of a fixed length over an alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSpace {
    alphabet: Alphabet,
    length: usize,
}

impl SampleSpace {
    /// Creates a sample space; `length` must be positive.
    pub fn new(alphabet: Alphabet, length: usize) -> Result<Self, SgError> {
        if length == 0 {
            return Err(SgError::config(
                "length-zero",
                "sample length must be positive",
                "length",
                length,
            ));
        }
        Ok(Self { alphabet, length })
    }

    /// Alphabet the samples are drawn from.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Length of every sample.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of distinct samples, or `None` if it overflows `u128`.
    pub fn size(&self) -> Option<u128> {
        let base = self.alphabet.len() as u128;
        let exponent = u32::try_from(self.length).ok()?;
        base.checked_pow(exponent)
    }

    /// Draws a uniformly random sample.
    pub fn draw(&self, rng: &mut RngHandle) -> Sample {
        let symbols = self.alphabet.symbols();
        let text: String = (0..self.length)
            .map(|_| symbols[rng.gen_range(0..symbols.len())])
            .collect();
        Sample(text)
    }

    /// Validates `text` against this space, upper-casing it first.
    pub fn parse(&self, text: &str) -> Result<Sample, SgError> {
        let upper = text.to_ascii_uppercase();
        if upper.chars().count() != self.length {
            return Err(SgError::Config(
                ErrorInfo::new("sample-length", "sample has the wrong length")
                    .with_context("expected", self.length)
                    .with_context("found", upper.chars().count()),
            ));
        }
        if let Some(bad) = upper.chars().find(|&symbol| !self.alphabet.contains(symbol)) {
            return Err(SgError::config(
                "sample-symbol",
                "sample contains a symbol outside the alphabet",
                "symbol",
                bad,
            ));
        }
        Ok(Sample(upper))
    }

    /// Iterates every sample in lexicographic alphabet order.
    pub fn iter(&self) -> SampleIter<'_> {
        SampleIter {
            space: self,
            digits: Some(vec![0; self.length]),
        }
    }
}

/// Odometer over every sample of a [`SampleSpace`].
#[derive(Debug, Clone)]
pub struct SampleIter<'a> {
    space: &'a SampleSpace,
    digits: Option<Vec<usize>>,
}

impl Iterator for SampleIter<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let digits = self.digits.as_mut()?;
        let symbols = self.space.alphabet.symbols();
        let sample = Sample(digits.iter().map(|&digit| symbols[digit]).collect());

        let mut exhausted = true;
        for digit in digits.iter_mut().rev() {
            *digit += 1;
            if *digit < symbols.len() {
                exhausted = false;
                break;
            }
            *digit = 0;
        }
        if exhausted {
            self.digits = None;
        }
        Some(sample)
    }
}
