//! Game configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{GameError, PlayerId};

/// Game configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of seats (default: 2)
    pub players: usize,

    /// How many of the seats are typed in by a person. Seats
    /// `0..human_players` are human, the rest are computer players.
    pub human_players: usize,

    /// Cards in a set, also the number of values a feature can take
    pub set_size: usize,

    /// Features per card
    pub feature_count: usize,

    /// Cards in the deck, at most `set_size ^ feature_count`
    pub deck_size: usize,

    /// Slots on the table
    pub table_size: usize,

    /// Time until the table is reshuffled
    pub turn_timeout_ms: u64,

    /// Below this much remaining time the countdown turns into a warning
    pub turn_timeout_warning_ms: u64,

    /// Freeze after a found set
    pub point_freeze_ms: u64,

    /// Freeze after a wrong set, never shorter than the point freeze
    pub penalty_freeze_ms: u64,

    /// Pause after each card the dealer lays down
    pub table_delay_ms: u64,

    /// Pause between two key presses of a computer player
    pub computer_think_ms: u64,

    /// Log the sets visible on the table after every deal
    pub hints: bool,

    /// Seed for the dealer and computer players. Random when unset.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: 2,
            human_players: 0,
            set_size: 3,
            feature_count: 4,
            deck_size: 81,
            table_size: 12,
            turn_timeout_ms: 60_000,
            turn_timeout_warning_ms: 5_000,
            point_freeze_ms: 1_000,
            penalty_freeze_ms: 3_000,
            table_delay_ms: 10,
            computer_think_ms: 100,
            hints: false,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(GameError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.players == 0 {
            return Err("Need at least one player".to_string());
        }

        if self.human_players > self.players {
            return Err(format!(
                "Human players ({}) exceed players ({})",
                self.human_players, self.players
            ));
        }

        if self.set_size < 2 {
            return Err("Set size must be at least 2".to_string());
        }

        if self.table_size < self.set_size {
            return Err(format!(
                "Table size ({}) must fit a set of {}",
                self.table_size, self.set_size
            ));
        }

        let full_deck = (self.set_size as u64)
            .checked_pow(self.feature_count as u32)
            .filter(|n| *n <= u64::from(u16::MAX) + 1)
            .ok_or_else(|| "Too many distinct cards".to_string())?;
        if self.deck_size == 0 || self.deck_size as u64 > full_deck {
            return Err(format!("Deck size must be between 1 and {full_deck}"));
        }

        if self.turn_timeout_ms == 0 {
            return Err("Turn timeout must be positive".to_string());
        }

        if self.turn_timeout_warning_ms > self.turn_timeout_ms {
            return Err("Warning threshold exceeds turn timeout".to_string());
        }

        if self.penalty_freeze_ms < self.point_freeze_ms {
            return Err(format!(
                "Penalty freeze ({}ms) must not be shorter than point freeze ({}ms)",
                self.penalty_freeze_ms, self.point_freeze_ms
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn is_human(&self, player: PlayerId) -> bool {
        player < self.human_players
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    pub fn turn_timeout_warning(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_warning_ms)
    }

    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_ms)
    }

    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_ms)
    }

    pub fn table_delay(&self) -> Duration {
        Duration::from_millis(self.table_delay_ms)
    }

    pub fn computer_think_time(&self) -> Duration {
        Duration::from_millis(self.computer_think_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            GameConfig {
                players: 0,
                ..GameConfig::default()
            },
            GameConfig {
                human_players: 3,
                ..GameConfig::default()
            },
            GameConfig {
                table_size: 2,
                ..GameConfig::default()
            },
            GameConfig {
                deck_size: 82,
                ..GameConfig::default()
            },
            GameConfig {
                turn_timeout_warning_ms: 70_000,
                ..GameConfig::default()
            },
            GameConfig {
                point_freeze_ms: 4_000,
                penalty_freeze_ms: 3_000,
                ..GameConfig::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn test_equal_freezes_are_allowed() {
        let config = GameConfig {
            point_freeze_ms: 2_000,
            penalty_freeze_ms: 2_000,
            ..GameConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = GameConfig::from_json(r#"{"players": 4, "human_players": 1}"#).unwrap();
        assert_eq!(config.players, 4);
        assert!(config.is_human(0));
        assert!(!config.is_human(1));
        assert_eq!(config.table_size, 12);
    }

    #[test]
    fn test_from_json_validates() {
        let err = GameConfig::from_json(r#"{"players": 0}"#).unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));

        let err = GameConfig::from_json("{").unwrap_err();
        assert!(matches!(err, GameError::MalformedConfig(_)));
    }
}
