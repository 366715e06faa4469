use sg_core::{ErrorInfo, SgError};

use crate::game::Game;

/// Serializes a game to compact JSON.
pub fn to_json(game: &Game) -> Result<String, SgError> {
    serde_json::to_string(game)
        .map_err(|err| SgError::Serde(ErrorInfo::new("json-serialize", err.to_string())))
}

/// Serializes a game to indented JSON.
pub fn to_json_pretty(game: &Game) -> Result<String, SgError> {
    serde_json::to_string_pretty(game)
        .map_err(|err| SgError::Serde(ErrorInfo::new("json-serialize", err.to_string())))
}

/// Restores a game from JSON.
pub fn from_json(data: &str) -> Result<Game, SgError> {
    serde_json::from_str(data)
        .map_err(|err| SgError::Serde(ErrorInfo::new("json-deserialize", err.to_string())))
}
