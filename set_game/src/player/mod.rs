//! Player module: one task per seat.
//!
//! This module implements:
//! - PlayerAgent: turns key presses into tokens and claims
//! - InputGenerator: random key presses for computer seats, throttled so
//!   it never runs ahead of its player
//!
//! Human seats have no generator; their presses arrive through
//! [`crate::GameRemote::key_pressed`].

pub mod agent;
pub mod input;

pub use agent::{PlayerAgent, PlayerHandle, Selection};
pub use input::{GeneratorHandle, InputGenerator, RandomSlots};
