//! Player agent: one task per seat.

use super::input::{GeneratorHandle, InputGenerator};
use crate::{
    dealer::{Claim, GameConfig, SharedGame},
    game::{GameError, GameResult, PlayerId, Score, SetValidator, Slot, Ui, UiEvent},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

/// How often a frozen player refreshes its freeze display
const FREEZE_TICK: Duration = Duration::from_secs(1);

/// What a key press did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Player is serving a reward or penalty freeze
    Frozen,
    /// Dealer is changing the table or a claim is pending
    TableBusy,
    /// Empty slot, unknown slot, or no tokens left
    Ignored,
    /// Own token taken back
    Removed,
    /// Token placed, set not complete yet
    Placed,
    /// Completed a valid set; a claim is pending
    Claimed,
    /// Completed a set that is not valid
    Penalized,
}

/// Outcome waiting to be served
#[derive(Debug)]
enum Outcome {
    /// Point once the dealer took the cards away
    AwaitingReward(oneshot::Receiver<()>),
    AwaitingPenalty,
}

/// Decision loop of one seat.
pub struct PlayerAgent {
    id: PlayerId,
    config: Arc<GameConfig>,
    shared: Arc<SharedGame>,
    validator: Arc<dyn SetValidator>,
    ui: Arc<dyn Ui>,
    inbox: mpsc::Receiver<Slot>,
    open: watch::Receiver<bool>,
    /// Computer input, started together with the agent
    input: Option<InputGenerator>,
    generator: Option<GeneratorHandle>,
    outcome: Option<Outcome>,
    score: Score,
    cancel: CancellationToken,
}

/// Dealer's side of a running player
#[derive(Debug)]
pub struct PlayerHandle {
    id: PlayerId,
    cancel: CancellationToken,
    join: JoinHandle<Score>,
}

impl PlayerHandle {
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Stop the player and wait for its task. Returns the final score.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerCrashed`] if the task panicked
    pub async fn stop(self) -> GameResult<Score> {
        self.cancel.cancel();
        self.join.await.map_err(|source| {
            log::error!("Player {} crashed: {}", self.id, source);
            GameError::PlayerCrashed {
                player: self.id,
                source,
            }
        })
    }
}

impl PlayerAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PlayerId,
        config: Arc<GameConfig>,
        shared: Arc<SharedGame>,
        validator: Arc<dyn SetValidator>,
        ui: Arc<dyn Ui>,
        inbox: mpsc::Receiver<Slot>,
        input: Option<InputGenerator>,
        cancel: CancellationToken,
    ) -> Self {
        let open = shared.subscribe();
        Self {
            id,
            config,
            shared,
            validator,
            ui,
            inbox,
            open,
            input,
            generator: None,
            outcome: None,
            score: 0,
            cancel,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn score(&self) -> Score {
        self.score
    }

    /// Spawn the player task and wait until it (and its input generator)
    /// is up.
    pub async fn spawn(self) -> PlayerHandle {
        let id = self.id;
        let cancel = self.cancel.clone();
        let (started, is_started) = oneshot::channel();
        let join = tokio::spawn(self.run(started));
        if is_started.await.is_err() {
            log::warn!("Player {} exited before starting", id);
        }
        PlayerHandle { id, cancel, join }
    }

    async fn run(mut self, started: oneshot::Sender<()>) -> Score {
        log::info!("Player {} starting", self.id);
        let fault = self.shared.fault_guard();
        if let Some(input) = self.input.take() {
            self.generator = Some(input.spawn().await);
        }
        let _ = started.send(());

        loop {
            let slot = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                slot = self.inbox.recv() => match slot {
                    Some(slot) => slot,
                    None => break,
                },
            };

            let selection = self.key_pressed(slot).await;
            log::trace!("Player {} pressed {}: {:?}", self.id, slot, selection);

            if selection == Selection::TableBusy && !self.wait_for_open_table().await {
                break;
            }
            if !self.settle().await {
                break;
            }
            if let Some(generator) = &self.generator {
                generator.release();
            }
        }

        if let Some(generator) = self.generator.take() {
            generator.stop().await;
        }
        let _token = fault.disarm();
        log::info!("Player {} terminated", self.id);
        self.score
    }

    /// Handle one selection of `slot`.
    ///
    /// Only accepted while the player is not frozen, the dealer is not
    /// busy, and no claim is pending.
    pub async fn key_pressed(&mut self, slot: Slot) -> Selection {
        if self.outcome.is_some() {
            return Selection::Frozen;
        }

        let mut state = self.shared.lock().await;
        if !state.accepts_selections() {
            return Selection::TableBusy;
        }
        if state.table.card_at(slot).is_none() {
            return Selection::Ignored;
        }
        if state.table.has_token(self.id, slot) {
            state.remove_token(self.id, slot);
            return Selection::Removed;
        }
        if state.selection(self.id).len() >= self.config.set_size {
            return Selection::Ignored;
        }

        state.place_token(self.id, slot);
        if state.selection(self.id).len() < self.config.set_size {
            return Selection::Placed;
        }

        let cards = state.selected_cards(self.id);
        if self.validator.is_valid_set(&cards) {
            log::debug!("Player {} claims {:?}", self.id, cards);
            let (claim, resolved) = Claim::new(self.id, cards);
            state.raise_claim(claim);
            drop(state);
            self.shared.notify_claim();
            self.outcome = Some(Outcome::AwaitingReward(resolved));
            Selection::Claimed
        } else {
            log::debug!("Player {} picked a wrong set {:?}", self.id, cards);
            self.outcome = Some(Outcome::AwaitingPenalty);
            Selection::Penalized
        }
    }

    /// Serve a pending reward or penalty. Returns `false` when cancelled.
    pub async fn settle(&mut self) -> bool {
        let resolved = match self.outcome.as_mut() {
            None => return true,
            Some(Outcome::AwaitingPenalty) => None,
            Some(Outcome::AwaitingReward(resolved)) => Some(tokio::select! {
                biased;
                resolved = resolved => resolved.is_ok(),
                _ = self.cancel.cancelled() => return false,
            }),
        };

        let freeze = match resolved {
            None => self.config.penalty_freeze(),
            Some(true) => {
                self.point();
                self.config.point_freeze()
            }
            // claim dropped without being resolved: no point, no freeze
            Some(false) => Duration::ZERO,
        };

        let finished = self.freeze(freeze).await;
        if finished {
            self.outcome = None;
            self.discard_stale_presses();
        }
        finished
    }

    fn point(&mut self) {
        self.score += 1;
        log::info!("Player {} found a set, score {}", self.id, self.score);
        self.ui.notify(UiEvent::Score {
            player: self.id,
            score: self.score,
        });
    }

    async fn freeze(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return true;
        }
        let until = Instant::now() + duration;
        loop {
            let remaining = until.saturating_duration_since(Instant::now());
            self.ui.notify(UiEvent::Freeze {
                player: self.id,
                millis: remaining.as_millis() as u64,
            });
            if remaining.is_zero() {
                return true;
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                _ = tokio::time::sleep(remaining.min(FREEZE_TICK)) => {}
            }
        }
    }

    async fn wait_for_open_table(&mut self) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            open = self.open.wait_for(|open| *open) => open.is_ok(),
        }
    }

    /// Presses typed during a freeze do not count.
    fn discard_stale_presses(&mut self) {
        let mut dropped = 0;
        while self.inbox.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            log::debug!("Player {} dropped {} presses made while frozen", self.id, dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Card, FeatureValidator, RecordingUi};

    struct Fixture {
        shared: Arc<SharedGame>,
        ui: Arc<RecordingUi>,
        config: Arc<GameConfig>,
        inboxes: Vec<mpsc::Sender<Slot>>,
    }

    impl Fixture {
        /// Table 0..6 holds cards 0, 1, 2, 3, 4, 5. Cards 0, 1, 2 are a
        /// set, 0, 1, 3 are not.
        async fn new(players: usize) -> Self {
            let config = Arc::new(GameConfig {
                players,
                table_size: 6,
                point_freeze_ms: 1_000,
                penalty_freeze_ms: 3_000,
                ..GameConfig::default()
            });
            let ui = Arc::new(RecordingUi::new());
            let shared = Arc::new(SharedGame::new(&config, ui.clone()));
            {
                let mut state = shared.lock().await;
                for slot in 0..6 {
                    let card = Card::from(slot);
                    state.deck.discard(card);
                    state.table.place_card(card, slot);
                }
            }
            Self {
                shared,
                ui,
                config,
                inboxes: Vec::new(),
            }
        }

        fn agent(&mut self, id: PlayerId) -> PlayerAgent {
            self.agent_with(id, Arc::new(FeatureValidator::default()))
        }

        fn agent_with(&mut self, id: PlayerId, validator: Arc<dyn SetValidator>) -> PlayerAgent {
            let (tx, rx) = mpsc::channel(3);
            self.inboxes.push(tx);
            PlayerAgent::new(
                id,
                self.config.clone(),
                self.shared.clone(),
                validator,
                self.ui.clone(),
                rx,
                None,
                CancellationToken::new(),
            )
        }
    }

    // === Selection Tests ===

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);

        assert_eq!(agent.key_pressed(4).await, Selection::Placed);
        assert_eq!(agent.key_pressed(4).await, Selection::Removed);

        let state = fixture.shared.lock().await;
        assert!(state.selection(0).is_empty());
        assert_eq!(state.table.token_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_and_unknown_slots_are_ignored() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);
        fixture.shared.lock().await.table.remove_card(5);

        assert_eq!(agent.key_pressed(5).await, Selection::Ignored);
        assert_eq!(agent.key_pressed(40).await, Selection::Ignored);
        assert!(fixture.shared.lock().await.selection(0).is_empty());
    }

    #[tokio::test]
    async fn test_busy_dealer_blocks_selection() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);
        fixture.shared.lock().await.set_busy(true);

        assert_eq!(agent.key_pressed(0).await, Selection::TableBusy);
        assert!(fixture.shared.lock().await.selection(0).is_empty());
    }

    #[tokio::test]
    async fn test_wrong_set_is_penalized() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);

        agent.key_pressed(0).await;
        agent.key_pressed(1).await;
        assert_eq!(agent.key_pressed(3).await, Selection::Penalized);
        assert_eq!(fixture.shared.lock().await.claimant(), None);

        // frozen until the penalty is served
        assert_eq!(agent.key_pressed(3).await, Selection::Frozen);
    }

    #[tokio::test]
    async fn test_valid_set_raises_claim() {
        let mut fixture = Fixture::new(2).await;
        let mut agent = fixture.agent(0);

        agent.key_pressed(2).await;
        agent.key_pressed(0).await;
        assert_eq!(agent.key_pressed(1).await, Selection::Claimed);

        let mut state = fixture.shared.lock().await;
        assert_eq!(state.claimant(), Some(0));
        assert!(!state.accepts_selections());
        let claim = state.take_claim().unwrap();
        assert_eq!(claim.cards, vec![Card(2), Card(0), Card(1)]);
    }

    #[tokio::test]
    async fn test_pending_claim_blocks_other_players() {
        let mut fixture = Fixture::new(2).await;
        let mut first = fixture.agent(0);
        let mut second = fixture.agent(1);

        for slot in [3, 4] {
            second.key_pressed(slot).await;
        }
        for slot in [0, 1] {
            first.key_pressed(slot).await;
        }
        assert_eq!(first.key_pressed(2).await, Selection::Claimed);

        // slots 3, 4, 5 would be a set for the second player, but it has to wait
        assert_eq!(second.key_pressed(5).await, Selection::TableBusy);
        assert_eq!(fixture.shared.lock().await.selection(1), &[3, 4]);
    }

    #[tokio::test]
    async fn test_full_selection_only_allows_removal() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);
        agent.key_pressed(0).await;
        agent.key_pressed(1).await;
        agent.key_pressed(3).await;
        // serve the penalty by hand
        agent.outcome = None;

        assert_eq!(agent.key_pressed(4).await, Selection::Ignored);
        assert_eq!(agent.key_pressed(3).await, Selection::Removed);
        assert_eq!(fixture.shared.lock().await.selection(0).len(), 2);
    }

    // === Outcome Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_point_waits_for_resolution() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);
        for slot in [0, 1, 2] {
            agent.key_pressed(slot).await;
        }

        let shared = fixture.shared.clone();
        let dealer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let claim = shared.lock().await.take_claim().unwrap();
            claim.resolve();
        });

        let started = Instant::now();
        assert!(agent.settle().await);
        dealer.await.unwrap();

        assert_eq!(agent.score(), 1);
        // two seconds waiting for the dealer, one second frozen
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(fixture.ui.score_of(0), Some(1));
        let events = fixture.ui.events();
        assert_eq!(
            events.last(),
            Some(&UiEvent::Freeze {
                player: 0,
                millis: 0
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_penalty_freeze_then_accepts_again() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);
        for slot in [0, 1, 3] {
            agent.key_pressed(slot).await;
        }

        let started = Instant::now();
        assert!(agent.settle().await);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(agent.score(), 0);
        assert_eq!(agent.key_pressed(3).await, Selection::Removed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_claim_gives_no_point() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);
        for slot in [0, 1, 2] {
            agent.key_pressed(slot).await;
        }
        drop(fixture.shared.lock().await.take_claim());

        assert!(agent.settle().await);
        assert_eq!(agent.score(), 0);
        assert_eq!(fixture.ui.score_of(0), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_presses_during_freeze_are_dropped() {
        let mut fixture = Fixture::new(1).await;
        let mut agent = fixture.agent(0);
        for slot in [0, 1, 3] {
            agent.key_pressed(slot).await;
        }
        fixture.inboxes[0].send(4).await.unwrap();

        assert!(agent.settle().await);
        assert!(agent.inbox.try_recv().is_err());
    }

    // === Task Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_spawned_human_player_scores_and_stops() {
        let mut fixture = Fixture::new(1).await;
        let agent = fixture.agent(0);
        let handle = agent.spawn().await;
        let input = fixture.inboxes[0].clone();

        for slot in [0, 1, 2] {
            input.send(slot).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        let claim = fixture.shared.lock().await.take_claim().unwrap();
        claim.resolve();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.stop().await.unwrap(), 1);
    }

    struct PanickingRules;

    impl SetValidator for PanickingRules {
        fn set_size(&self) -> usize {
            3
        }

        fn is_valid_set(&self, _cards: &[Card]) -> bool {
            panic!("rules bug");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_player_reports_error_and_trips_fault() {
        let mut fixture = Fixture::new(1).await;
        let agent = fixture.agent_with(0, Arc::new(PanickingRules));
        let handle = agent.spawn().await;
        assert!(!fixture.shared.is_faulted());

        let input = fixture.inboxes[0].clone();
        for slot in [0, 1, 2] {
            input.send(slot).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(fixture.shared.is_faulted());

        let result = handle.stop().await;
        assert!(matches!(
            result,
            Err(GameError::PlayerCrashed { player: 0, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_table_parks_player_until_reopened() {
        let mut fixture = Fixture::new(1).await;
        let agent = fixture.agent(0);
        let handle = agent.spawn().await;
        fixture.shared.lock().await.set_busy(true);

        let input = fixture.inboxes[0].clone();
        input.send(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        // the player is parked, so this press stays queued
        input.send(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(fixture.shared.lock().await.selection(0).is_empty());

        fixture.shared.lock().await.set_busy(false);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fixture.shared.lock().await.selection(0), &[1]);

        assert_eq!(handle.stop().await.unwrap(), 0);
    }
}
