use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Index of a table slot, `0..table_size`.
pub type Slot = usize;

/// Stable seat index of a player, starting from 0.
pub type PlayerId = usize;

/// Points awarded for found sets.
pub type Score = u32;

/// A card identifier, `0..deck_size`.
///
/// The card's features are the digits of its id written in base
/// `set_size` (see [`crate::game::FeatureValidator`]).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub u16);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02}", self.0)
    }
}

impl From<usize> for Card {
    fn from(value: usize) -> Self {
        Self(value as u16)
    }
}

/// The cards that are neither on the table nor consumed by a found set.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A deck holding every card `0..size` in order.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            cards: (0..size).map(Card::from).collect(),
        }
    }

    /// Draw one card uniformly at random, without replacement.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Card> {
        if self.cards.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.cards.len());
        Some(self.cards.swap_remove(idx))
    }

    /// Return a card from the table.
    pub fn put_back(&mut self, card: Card) {
        debug_assert!(!self.cards.contains(&card), "{card} returned twice");
        self.cards.push(card);
    }

    /// Permanently remove a card. Returns whether it was still in the deck.
    pub fn discard(&mut self, card: Card) -> bool {
        match self.cards.iter().position(|c| *c == card) {
            Some(idx) => {
                self.cards.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
