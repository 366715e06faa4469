use sha2::{Digest, Sha256};

use crate::game::Game;

fn update_str(hasher: &mut Sha256, text: &str) {
    hasher.update((text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

/// Computes the canonical structural hash of a game.
///
/// Covers sample names and strings, every measurement value and every
/// contract truth value, in document order.
pub fn canonical_game_hash(game: &Game) -> String {
    let mut hasher = Sha256::new();
    update_str(&mut hasher, &game.game);

    hasher.update((game.answers.len() as u64).to_le_bytes());
    for (name, sample) in &game.answers {
        update_str(&mut hasher, name);
        update_str(&mut hasher, sample.as_str());
    }

    for (name, row) in &game.measures {
        update_str(&mut hasher, name);
        hasher.update((row.len() as u64).to_le_bytes());
        for (descriptor, value) in row {
            update_str(&mut hasher, descriptor);
            hasher.update(u64::from(*value).to_le_bytes());
        }
    }

    for (name, row) in &game.contracts {
        update_str(&mut hasher, name);
        hasher.update((row.len() as u64).to_le_bytes());
        for (descriptor, truth) in row {
            update_str(&mut hasher, descriptor);
            hasher.update([u8::from(*truth)]);
        }
    }

    let digest = hasher.finalize();
    digest
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>()
}
