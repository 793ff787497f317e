//! Slot storage and the slot × player token matrix.

use super::{
    entities::{Card, PlayerId, Slot},
    ui::{Ui, UiEvent},
};
use std::{collections::HashMap, sync::Arc};

/// The cards laid out in front of the players.
///
/// A token may only sit on a slot that holds a card; removing a card
/// therefore removes every token on its slot first.
pub struct Table {
    slot_to_card: Vec<Option<Card>>,
    card_to_slot: HashMap<Card, Slot>,
    /// `tokens[slot][player]`
    tokens: Vec<Vec<bool>>,
    ui: Arc<dyn Ui>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("slot_to_card", &self.slot_to_card)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl Table {
    pub fn new(table_size: usize, players: usize, ui: Arc<dyn Ui>) -> Self {
        Self {
            slot_to_card: vec![None; table_size],
            card_to_slot: HashMap::with_capacity(table_size),
            tokens: vec![vec![false; players]; table_size],
            ui,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.slot_to_card.len()
    }

    #[must_use]
    pub fn card_at(&self, slot: Slot) -> Option<Card> {
        self.slot_to_card.get(slot).copied().flatten()
    }

    #[must_use]
    pub fn slot_of(&self, card: Card) -> Option<Slot> {
        self.card_to_slot.get(&card).copied()
    }

    /// Number of occupied slots
    #[must_use]
    pub fn count_cards(&self) -> usize {
        self.card_to_slot.len()
    }

    /// Cards currently on the table, in slot order
    #[must_use]
    pub fn cards(&self) -> Vec<Card> {
        self.slot_to_card.iter().flatten().copied().collect()
    }

    /// Slots without a card, in slot order
    #[must_use]
    pub fn empty_slots(&self) -> Vec<Slot> {
        (0..self.size())
            .filter(|slot| self.slot_to_card[*slot].is_none())
            .collect()
    }

    pub fn place_card(&mut self, card: Card, slot: Slot) {
        assert!(
            self.slot_to_card[slot].is_none(),
            "slot {slot} already holds a card"
        );
        self.slot_to_card[slot] = Some(card);
        self.card_to_slot.insert(card, slot);
        self.ui.notify(UiEvent::CardPlaced { card, slot });
    }

    /// Take the card off a slot along with any tokens still on it.
    pub fn remove_card(&mut self, slot: Slot) -> Option<Card> {
        let card = self.slot_to_card.get_mut(slot)?.take()?;
        for player in self.tokens_on(slot) {
            self.remove_token(player, slot);
        }
        self.card_to_slot.remove(&card);
        self.ui.notify(UiEvent::CardRemoved { slot });
        Some(card)
    }

    /// Returns `false` when the slot is empty or already carries the token.
    pub fn place_token(&mut self, player: PlayerId, slot: Slot) -> bool {
        if self.card_at(slot).is_none() || self.tokens[slot][player] {
            return false;
        }
        self.tokens[slot][player] = true;
        self.ui.notify(UiEvent::TokenPlaced { player, slot });
        true
    }

    /// Returns whether a token was actually removed.
    pub fn remove_token(&mut self, player: PlayerId, slot: Slot) -> bool {
        match self.tokens.get_mut(slot).and_then(|row| row.get_mut(player)) {
            Some(token) if *token => {
                *token = false;
                self.ui.notify(UiEvent::TokenRemoved { player, slot });
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn has_token(&self, player: PlayerId, slot: Slot) -> bool {
        self.tokens
            .get(slot)
            .and_then(|row| row.get(player))
            .copied()
            .unwrap_or(false)
    }

    /// Players holding a token on `slot`
    #[must_use]
    pub fn tokens_on(&self, slot: Slot) -> Vec<PlayerId> {
        self.tokens
            .get(slot)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter_map(|(player, token)| token.then_some(player))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.iter().flatten().filter(|t| **t).count()
    }

    pub fn reset_tokens(&mut self) {
        self.tokens.iter_mut().flatten().for_each(|t| *t = false);
        self.ui.notify(UiEvent::TokensReset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ui::RecordingUi;

    fn table(size: usize, players: usize) -> (Table, Arc<RecordingUi>) {
        let ui = Arc::new(RecordingUi::new());
        (Table::new(size, players, ui.clone()), ui)
    }

    #[test]
    fn test_place_and_remove_card() {
        let (mut table, ui) = table(4, 2);
        table.place_card(Card(9), 2);

        assert_eq!(table.card_at(2), Some(Card(9)));
        assert_eq!(table.slot_of(Card(9)), Some(2));
        assert_eq!(table.count_cards(), 1);
        assert_eq!(table.empty_slots(), vec![0, 1, 3]);

        assert_eq!(table.remove_card(2), Some(Card(9)));
        assert_eq!(table.remove_card(2), None);
        assert_eq!(table.slot_of(Card(9)), None);
        assert_eq!(
            ui.events(),
            vec![
                UiEvent::CardPlaced {
                    card: Card(9),
                    slot: 2
                },
                UiEvent::CardRemoved { slot: 2 },
            ]
        );
    }

    #[test]
    fn test_token_requires_card() {
        let (mut table, _) = table(3, 2);
        assert!(!table.place_token(0, 1));
        assert!(!table.has_token(0, 1));

        table.place_card(Card(1), 1);
        assert!(table.place_token(0, 1));
        assert!(!table.place_token(0, 1), "second placement is a no-op");
        assert!(table.has_token(0, 1));
    }

    #[test]
    fn test_removing_card_strips_all_tokens() {
        let (mut table, _) = table(3, 3);
        table.place_card(Card(4), 0);
        table.place_token(0, 0);
        table.place_token(2, 0);
        assert_eq!(table.tokens_on(0), vec![0, 2]);

        table.remove_card(0);
        assert!(table.tokens_on(0).is_empty());
        assert_eq!(table.token_count(), 0);
    }

    #[test]
    fn test_place_then_remove_token_round_trip() {
        let (mut table, _) = table(3, 2);
        table.place_card(Card(0), 0);
        table.place_token(1, 0);
        let before = table.tokens.clone();

        assert!(table.place_token(0, 0));
        assert!(table.remove_token(0, 0));
        assert_eq!(table.tokens, before);
        assert!(!table.remove_token(0, 0));
    }

    #[test]
    fn test_reset_tokens() {
        let (mut table, ui) = table(2, 2);
        table.place_card(Card(0), 0);
        table.place_card(Card(1), 1);
        table.place_token(0, 0);
        table.place_token(1, 1);

        table.reset_tokens();
        assert_eq!(table.token_count(), 0);
        assert_eq!(table.count_cards(), 2);
        assert_eq!(ui.events().last(), Some(&UiEvent::TokensReset));
    }

    #[test]
    #[should_panic(expected = "already holds a card")]
    fn test_double_placement_panics() {
        let (mut table, _) = table(2, 1);
        table.place_card(Card(0), 0);
        table.place_card(Card(1), 0);
    }
}
