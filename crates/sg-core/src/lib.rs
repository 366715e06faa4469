#![deny(missing_docs)]
#![doc = "Core types for the string-guessing game generator: structured errors, seeded randomness and the sample space."]

pub mod errors;
pub mod rng;
pub mod sample;

pub use errors::{ErrorInfo, SgError};
pub use rng::{derive_substream_seed, RngHandle};
pub use sample::{Alphabet, Sample, SampleIter, SampleSpace};
