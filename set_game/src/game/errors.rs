//! Error types for running a game.

use super::entities::PlayerId;
use thiserror::Error;

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Error)]
pub enum GameError {
    /// Configuration rejected by [`crate::GameConfig::validate`]
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed
    #[error("Malformed configuration: {0}")]
    MalformedConfig(#[from] serde_json::Error),

    /// No such seat at the table
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// Key presses are only accepted for human seats
    #[error("Player {0} is not a human player")]
    NotHuman(PlayerId),

    /// A player task panicked; the run was aborted
    #[error("Player {player} crashed: {source}")]
    PlayerCrashed {
        player: PlayerId,
        #[source]
        source: tokio::task::JoinError,
    },

    /// The dealer task panicked or was aborted
    #[error("Dealer task failed: {0}")]
    DealerCrashed(#[from] tokio::task::JoinError),
}
