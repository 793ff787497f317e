//! State shared between the dealer and the players.
//!
//! Everything lives behind a single async mutex. The busy flag and the
//! claim marker are only changed through [`GameState`] methods, which keep
//! the `open` watch channel in step so players can sleep until the table
//! takes selections again instead of polling.

use super::{config::GameConfig, messages::Claim};
use crate::game::{Card, Deck, PlayerId, Slot, Table, Ui};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, MutexGuard, Notify, watch},
    time::Instant,
};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Table, deck, and the coordination fields for one game run.
#[derive(Debug)]
pub struct GameState {
    pub table: Table,

    /// Undealt cards. Cards of found sets are gone for good.
    pub deck: Deck,

    /// When the dealer reshuffles; `None` until the first deal
    pub reshuffle_at: Option<Instant>,

    /// Each player's tokened slots in the order they were placed
    selections: Vec<Vec<Slot>>,

    /// At most one claim awaits the dealer
    claim: Option<Claim>,

    /// The dealer is changing the table
    busy: bool,

    /// Game over; the table never reopens
    closed: bool,

    /// Mirrors `accepts_selections()`
    open: watch::Sender<bool>,
}

impl GameState {
    pub fn new(config: &GameConfig, ui: Arc<dyn Ui>) -> Self {
        let (open, _) = watch::channel(true);
        Self {
            table: Table::new(config.table_size, config.players, ui),
            deck: Deck::new(config.deck_size),
            reshuffle_at: None,
            selections: vec![Vec::with_capacity(config.set_size); config.players],
            claim: None,
            busy: false,
            closed: false,
            open,
        }
    }

    /// Players may place or remove tokens.
    #[must_use]
    pub fn accepts_selections(&self) -> bool {
        !self.busy && self.claim.is_none()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Player whose claim is pending, if any
    #[must_use]
    pub fn claimant(&self) -> Option<PlayerId> {
        self.claim.as_ref().map(|claim| claim.player)
    }

    /// Take or release exclusive access to the table. A closed table stays busy.
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy || self.closed;
        self.publish();
    }

    /// Shut the table for the rest of the run.
    pub fn close(&mut self) {
        self.closed = true;
        self.set_busy(true);
    }

    /// Put a claim in the marker.
    ///
    /// # Panics
    ///
    /// If another claim is still pending. The selection guard makes that
    /// unreachable; scores would be corrupted if it ever happened.
    pub fn raise_claim(&mut self, claim: Claim) {
        if let Some(pending) = &self.claim {
            panic!(
                "player {} raised a claim while player {}'s claim is pending",
                claim.player, pending.player
            );
        }
        self.claim = Some(claim);
        self.publish();
    }

    pub fn take_claim(&mut self) -> Option<Claim> {
        let claim = self.claim.take();
        self.publish();
        claim
    }

    #[must_use]
    pub fn selection(&self, player: PlayerId) -> &[Slot] {
        self.selections
            .get(player)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Cards under a player's tokens, in placement order
    #[must_use]
    pub fn selected_cards(&self, player: PlayerId) -> Vec<Card> {
        self.selection(player)
            .iter()
            .filter_map(|slot| self.table.card_at(*slot))
            .collect()
    }

    /// Token on both the table and the player's own list.
    pub fn place_token(&mut self, player: PlayerId, slot: Slot) -> bool {
        if !self.table.place_token(player, slot) {
            return false;
        }
        self.selections[player].push(slot);
        true
    }

    pub fn remove_token(&mut self, player: PlayerId, slot: Slot) -> bool {
        let Some(selection) = self.selections.get_mut(player) else {
            return false;
        };
        selection.retain(|s| *s != slot);
        self.table.remove_token(player, slot)
    }

    /// Remove every player's token from a slot. Returns the players that lost one.
    pub fn strip_slot(&mut self, slot: Slot) -> Vec<PlayerId> {
        let players = self.table.tokens_on(slot);
        for player in &players {
            self.remove_token(*player, slot);
        }
        players
    }

    /// Clear all tokens, table side and player side.
    pub fn reset_tokens(&mut self) {
        self.table.reset_tokens();
        self.selections.iter_mut().for_each(Vec::clear);
    }

    /// Every card not yet consumed: the deck plus the table
    #[must_use]
    pub fn remaining_cards(&self) -> Vec<Card> {
        let mut cards = self.deck.cards().to_vec();
        cards.extend(self.table.cards());
        cards
    }

    fn publish(&self) {
        self.open.send_replace(self.accepts_selections());
    }
}

/// Handle to the game state plus the wake-up signals around it.
#[derive(Debug)]
pub struct SharedGame {
    state: Mutex<GameState>,
    claim_raised: Notify,
    open: watch::Receiver<bool>,

    /// Tripped when a player task unwinds
    fault: CancellationToken,
}

impl SharedGame {
    pub fn new(config: &GameConfig, ui: Arc<dyn Ui>) -> Self {
        let state = GameState::new(config, ui);
        let open = state.open.subscribe();
        Self {
            state: Mutex::new(state),
            claim_raised: Notify::new(),
            open,
            fault: CancellationToken::new(),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().await
    }

    /// Wake the dealer. The permit is kept if the dealer is not waiting yet.
    pub fn notify_claim(&self) {
        self.claim_raised.notify_one();
    }

    /// Resolves once a claim was announced through [`Self::notify_claim`].
    pub async fn claim_raised(&self) {
        self.claim_raised.notified().await;
    }

    /// Receiver reporting whether the table takes selections
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.open.clone()
    }

    /// Guard a player task holds while it runs. Dropping it without
    /// [`DropGuard::disarm`], as happens when the task panics, trips the
    /// fault signal.
    pub fn fault_guard(&self) -> DropGuard {
        self.fault.clone().drop_guard()
    }

    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.fault.is_cancelled()
    }

    /// Resolves once a player task has crashed.
    pub async fn faulted(&self) {
        self.fault.cancelled().await;
    }
}
