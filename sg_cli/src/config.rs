//! Runner configuration management.
//!
//! Layers, lowest first: built-in defaults, an optional JSON file,
//! `SG_*` environment variables, then command line flags.

use set_game::{GameConfig, GameError};
use std::path::{Path, PathBuf};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bad config file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: GameError,
    },
}

/// Load the base configuration and apply environment overrides
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load(file: Option<&Path>) -> Result<GameConfig, ConfigError> {
    let mut config = match file {
        Some(path) => from_file(path)?,
        None => GameConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn from_file(path: &Path) -> Result<GameConfig, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    GameConfig::from_json(&json).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Override fields from `SG_*` variables. Unparsable values are ignored.
pub fn apply_env(config: &mut GameConfig, lookup: impl Fn(&str) -> Option<String>) {
    config.players = parse_env_or(&lookup, "SG_PLAYERS", config.players);
    config.human_players = parse_env_or(&lookup, "SG_HUMAN_PLAYERS", config.human_players);
    config.set_size = parse_env_or(&lookup, "SG_SET_SIZE", config.set_size);
    config.feature_count = parse_env_or(&lookup, "SG_FEATURE_COUNT", config.feature_count);
    config.deck_size = parse_env_or(&lookup, "SG_DECK_SIZE", config.deck_size);
    config.table_size = parse_env_or(&lookup, "SG_TABLE_SIZE", config.table_size);
    config.turn_timeout_ms = parse_env_or(&lookup, "SG_TURN_TIMEOUT_MS", config.turn_timeout_ms);
    config.turn_timeout_warning_ms = parse_env_or(
        &lookup,
        "SG_TURN_TIMEOUT_WARNING_MS",
        config.turn_timeout_warning_ms,
    );
    config.point_freeze_ms = parse_env_or(&lookup, "SG_POINT_FREEZE_MS", config.point_freeze_ms);
    config.penalty_freeze_ms =
        parse_env_or(&lookup, "SG_PENALTY_FREEZE_MS", config.penalty_freeze_ms);
    config.table_delay_ms = parse_env_or(&lookup, "SG_TABLE_DELAY_MS", config.table_delay_ms);
    config.computer_think_ms =
        parse_env_or(&lookup, "SG_COMPUTER_THINK_MS", config.computer_think_ms);
    config.hints = parse_env_or(&lookup, "SG_HINTS", config.hints);
    if let Some(seed) = lookup("SG_SEED").and_then(|v| v.parse().ok()) {
        config.seed = Some(seed);
    }
}

/// Validate configuration after all layers are applied
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] with the reason reported by the game
pub fn validate(config: &GameConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|reason| ConfigError::Invalid {
        var: "game".to_string(),
        reason,
    })
}

/// Helper to parse a variable with default fallback
fn parse_env_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
