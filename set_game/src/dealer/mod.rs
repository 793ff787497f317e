//! Dealer module: the coordinator of a game run.
//!
//! This module implements:
//! - Dealer: deals cards, drives the countdown, resolves claims
//! - DealerHandle / GameRemote: termination and human key presses
//! - The shared state behind one async mutex
//! - Game configuration
//!
//! ## Architecture
//!
//! The dealer runs in its own Tokio task and spawns one task per player,
//! each with an optional input generator. Players raise claims through the
//! shared state and wake the dealer with a `Notify`; the dealer answers
//! through a oneshot carried by the claim.
//!
//! ## Example
//!
//! ```no_run
//! use set_game::{Dealer, FeatureValidator, GameConfig, LogUi};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dealer = Dealer::new(
//!         GameConfig::default(),
//!         Arc::new(FeatureValidator::default()),
//!         Arc::new(LogUi),
//!     )
//!     .unwrap();
//!     let handle = dealer.spawn();
//!     let outcome = handle.join().await.unwrap();
//!     println!("Winners: {:?}", outcome.winners);
//! }
//! ```

pub mod actor;
pub mod config;
pub mod messages;
pub mod state;

pub use actor::{Dealer, DealerHandle, GameRemote};
pub use config::GameConfig;
pub use messages::{Claim, GameOutcome, RoundEnd};
pub use state::{GameState, SharedGame};
