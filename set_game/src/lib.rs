//! # Set Game
//!
//! Concurrent coordination core for the card game "Set".
//!
//! A single dealer task owns the deck and the table. Every player runs in
//! its own task and competes to mark a set of cards with tokens; the first
//! to mark a valid set wins the cards and a point, a wrong guess costs a
//! freeze. When no set is left among the remaining cards the dealer stops
//! the players and announces the winners.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, deck, table, set validation and the display sink
//! - [`dealer`]: The coordinator, its configuration and the shared state
//! - [`player`]: Player agents and the random input of computer players
//!
//! ## Example
//!
//! ```no_run
//! use set_game::{Dealer, FeatureValidator, GameConfig, LogUi};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), set_game::GameError> {
//! let config = GameConfig {
//!     players: 4,
//!     ..GameConfig::default()
//! };
//! let handle = Dealer::new(config, Arc::new(FeatureValidator::default()), Arc::new(LogUi))?.spawn();
//! let outcome = handle.join().await?;
//! println!("Scores: {:?}", outcome.scores);
//! # Ok(())
//! # }
//! ```

/// The coordinator and the state it shares with the players.
pub mod dealer;
pub use dealer::{Dealer, DealerHandle, GameConfig, GameOutcome, GameRemote};

/// Cards, table and set validation.
pub mod game;
pub use game::{
    Card, Deck, FeatureValidator, GameError, GameResult, LogUi, PlayerId, RecordingUi, Score,
    SetValidator, Slot, Table, Ui, UiEvent,
};

/// Player agents and input generators.
pub mod player;
pub use player::{PlayerAgent, PlayerHandle, Selection};
