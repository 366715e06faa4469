use sg_core::derive_substream_seed;

/// Derives the seed of game `index` within a series.
pub fn game_seed(master_seed: u64, index: usize) -> u64 {
    derive_substream_seed(master_seed, index as u64)
}
