//! Game entities and the collaborators the dealer and players work against.
//!
//! - Cards, slots, player ids and the deck
//! - The table: slot storage plus the slot × player token matrix
//! - The set validity predicate
//! - The one-way display sink

pub mod entities;
pub mod errors;
pub mod table;
pub mod ui;
pub mod validator;

pub use entities::{Card, Deck, PlayerId, Score, Slot};
pub use errors::{GameError, GameResult};
pub use table::Table;
pub use ui::{LogUi, RecordingUi, Ui, UiEvent};
pub use validator::{FeatureValidator, SetValidator};
