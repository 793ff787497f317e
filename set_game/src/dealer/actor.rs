//! Dealer: owns the game lifecycle.

use super::{
    config::GameConfig,
    messages::{Claim, GameOutcome, RoundEnd},
    state::{GameState, SharedGame},
};
use crate::{
    game::{GameError, GameResult, PlayerId, Score, SetValidator, Slot, Ui, UiEvent},
    player::{InputGenerator, PlayerAgent, PlayerHandle, RandomSlots},
};
use rand::{SeedableRng, rngs::StdRng};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep},
};
use tokio_util::sync::CancellationToken;

/// Countdown step while there is plenty of time left
const COARSE_TICK: Duration = Duration::from_secs(1);

/// Countdown step below the warning threshold
const FINE_TICK: Duration = Duration::from_millis(100);

/// Cloneable remote control for a running game
#[derive(Clone, Debug)]
pub struct GameRemote {
    cancel: CancellationToken,
    inputs: Vec<mpsc::Sender<Slot>>,
    human_players: usize,
}

impl GameRemote {
    /// Ask the dealer to stop the game. Safe to call any number of times.
    pub fn terminate(&self) {
        if !self.cancel.is_cancelled() {
            log::info!("Termination requested");
        }
        self.cancel.cancel();
    }

    /// Feed a key press of a human player. Returns `false` when the
    /// press was dropped because the player's queue is full or closed.
    pub fn key_pressed(&self, player: PlayerId, slot: Slot) -> GameResult<bool> {
        let input = self
            .inputs
            .get(player)
            .ok_or(GameError::UnknownPlayer(player))?;
        if player >= self.human_players {
            return Err(GameError::NotHuman(player));
        }
        Ok(input.try_send(slot).is_ok())
    }
}

/// Handle to a spawned dealer
#[derive(Debug)]
pub struct DealerHandle {
    remote: GameRemote,
    join: JoinHandle<GameResult<GameOutcome>>,
}

impl DealerHandle {
    pub fn remote(&self) -> GameRemote {
        self.remote.clone()
    }

    pub fn terminate(&self) {
        self.remote.terminate();
    }

    pub fn key_pressed(&self, player: PlayerId, slot: Slot) -> GameResult<bool> {
        self.remote.key_pressed(player, slot)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the game to end and collect the outcome
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerCrashed`] if a player task panicked, or
    /// [`GameError::DealerCrashed`] if the dealer itself did
    pub async fn join(self) -> GameResult<GameOutcome> {
        self.join.await?
    }
}

/// The coordinator.
///
/// Deals cards, runs the countdown, resolves claims, reshuffles on
/// timeout, and announces the winners. It is the only writer of table
/// cards and of the deck.
pub struct Dealer {
    config: Arc<GameConfig>,
    shared: Arc<SharedGame>,
    validator: Arc<dyn SetValidator>,
    ui: Arc<dyn Ui>,
    rng: StdRng,

    /// Player inboxes, handed to the agents at setup
    inboxes: Vec<mpsc::Receiver<Slot>>,

    /// Sending side of every inbox
    inputs: Vec<mpsc::Sender<Slot>>,

    /// Running players in startup order
    players: Vec<PlayerHandle>,

    /// Final scores, filled in as players are stopped
    scores: Vec<Score>,

    cancel: CancellationToken,

    /// Players stopped, loop must exit
    terminate: bool,

    /// First player crash seen while stopping the players
    failure: Option<GameError>,
}

impl Dealer {
    /// Create a dealer for one game run
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the configuration does not
    /// validate or disagrees with the validator's set size
    pub fn new(
        config: GameConfig,
        validator: Arc<dyn SetValidator>,
        ui: Arc<dyn Ui>,
    ) -> GameResult<Self> {
        config.validate().map_err(GameError::InvalidConfig)?;
        if validator.set_size() != config.set_size {
            return Err(GameError::InvalidConfig(format!(
                "Validator expects sets of {}, configuration says {}",
                validator.set_size(),
                config.set_size
            )));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (inputs, inboxes): (Vec<_>, Vec<_>) = (0..config.players)
            .map(|_| mpsc::channel(config.set_size))
            .unzip();

        Ok(Self {
            shared: Arc::new(SharedGame::new(&config, ui.clone())),
            scores: vec![0; config.players],
            players: Vec::with_capacity(config.players),
            config: Arc::new(config),
            validator,
            ui,
            rng,
            inboxes,
            inputs,
            cancel: CancellationToken::new(),
            terminate: false,
            failure: None,
        })
    }

    pub fn remote(&self) -> GameRemote {
        GameRemote {
            cancel: self.cancel.clone(),
            inputs: self.inputs.clone(),
            human_players: self.config.human_players,
        }
    }

    /// Run the dealer in its own task
    pub fn spawn(self) -> DealerHandle {
        let remote = self.remote();
        let join = tokio::spawn(self.run());
        DealerHandle { remote, join }
    }

    /// Run the whole game and return its outcome
    ///
    /// # Errors
    ///
    /// A crashed player aborts the run: the others are stopped and no
    /// winners are announced.
    pub async fn run(mut self) -> GameResult<GameOutcome> {
        log::info!("Dealer starting with {} players", self.config.players);
        self.start_players().await;

        loop {
            self.place_cards_on_table().await;
            if self.should_finish().await {
                break;
            }
            match self.timer_loop().await {
                RoundEnd::Timeout => {
                    self.update_timer_display(false).await;
                    self.remove_all_cards_from_table().await;
                }
                RoundEnd::Exhausted | RoundEnd::Terminated => break,
            }
        }

        self.terminate().await;
        if let Some(failure) = self.failure.take() {
            log::error!("Game aborted: {}", failure);
            return Err(failure);
        }
        self.remove_all_cards_from_table().await;
        let outcome = self.announce_winners();
        log::info!("Dealer terminated");
        Ok(outcome)
    }

    /// Spawn the players in seat order, each one up before the next starts.
    async fn start_players(&mut self) {
        let inboxes = std::mem::take(&mut self.inboxes);
        for (id, inbox) in inboxes.into_iter().enumerate() {
            // Not a child of the dealer's token: players are stopped one by one.
            let cancel = CancellationToken::new();
            let input = (!self.config.is_human(id)).then(|| {
                InputGenerator::new(
                    id,
                    RandomSlots::new(
                        self.config.table_size,
                        self.config.seed.map(|seed| seed.wrapping_add(id as u64 + 1)),
                    ),
                    self.inputs[id].clone(),
                    self.config.computer_think_time(),
                    cancel.child_token(),
                )
            });
            let agent = PlayerAgent::new(
                id,
                self.config.clone(),
                self.shared.clone(),
                self.validator.clone(),
                self.ui.clone(),
                inbox,
                input,
                cancel,
            );
            self.players.push(agent.spawn().await);
        }
    }

    /// Stop the players in reverse seat order, each one joined before the
    /// next is told to stop, then mark the loop for exit. Idempotent.
    pub async fn terminate(&mut self) {
        if self.terminate {
            return;
        }
        {
            let mut state = self.shared.lock().await;
            state.close();
            if let Some(claim) = state.take_claim() {
                self.resolve(&mut state, claim);
            }
        }
        while let Some(player) = self.players.pop() {
            let id = player.id();
            match player.stop().await {
                Ok(score) => self.scores[id] = score,
                Err(e) if self.failure.is_none() => self.failure = Some(e),
                Err(_) => {}
            }
        }
        self.terminate = true;
    }

    fn is_terminating(&self) -> bool {
        self.terminate || self.cancel.is_cancelled() || self.shared.is_faulted()
    }

    /// Terminated, or no set left among the cards still in play
    async fn should_finish(&self) -> bool {
        self.is_terminating() || self.is_exhausted().await
    }

    /// Looks at the undealt deck and the table together, not just the
    /// visible cards.
    async fn is_exhausted(&self) -> bool {
        let remaining = self.shared.lock().await.remaining_cards();
        !self.validator.exists_valid_set(&remaining)
    }

    async fn timer_loop(&mut self) -> RoundEnd {
        while !self.is_terminating() && !self.deadline_passed().await {
            self.sleep_until_woken_or_timeout().await;
            if self.is_terminating() {
                break;
            }
            self.update_timer_display(false).await;
            self.remove_cards_from_table().await;
            self.place_cards_on_table().await;
            if self.is_exhausted().await {
                return RoundEnd::Exhausted;
            }
        }
        if self.is_terminating() {
            RoundEnd::Terminated
        } else {
            RoundEnd::Timeout
        }
    }

    async fn deadline_passed(&self) -> bool {
        let state = self.shared.lock().await;
        state
            .reshuffle_at
            .is_none_or(|deadline| Instant::now() >= deadline)
    }

    /// Sleep in steps until a claim is pending or the deadline passes.
    ///
    /// Wake-ups are only hints: the claim marker and the clock are
    /// checked again after each one.
    async fn sleep_until_woken_or_timeout(&self) {
        loop {
            let remaining = {
                let state = self.shared.lock().await;
                if state.claimant().is_some() {
                    return;
                }
                match state.reshuffle_at {
                    Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                    None => return,
                }
            };
            if remaining.is_zero() || self.is_terminating() {
                return;
            }

            let step = if remaining > self.config.turn_timeout_warning() {
                COARSE_TICK
            } else {
                FINE_TICK
            };
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = self.shared.faulted() => return,
                _ = self.shared.claim_raised() => {}
                _ = sleep(step.min(remaining)) => {}
            }
            self.update_timer_display(false).await;
        }
    }

    async fn update_timer_display(&self, reset: bool) {
        let mut state = self.shared.lock().await;
        self.refresh_countdown(&mut state, reset);
    }

    fn refresh_countdown(&self, state: &mut GameState, reset: bool) {
        if reset {
            state.reshuffle_at = Some(Instant::now() + self.config.turn_timeout());
            self.ui.notify(UiEvent::Countdown {
                millis: self.config.turn_timeout_ms,
                warn: false,
            });
            return;
        }
        let Some(deadline) = state.reshuffle_at else {
            return;
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.ui.notify(UiEvent::Countdown {
            millis: remaining.as_millis() as u64,
            warn: remaining <= self.config.turn_timeout_warning(),
        });
    }

    /// Fill every empty slot from the deck.
    ///
    /// The table stays busy for the whole deal, including the pauses
    /// between cards, so no player sees it half dealt.
    async fn place_cards_on_table(&mut self) {
        let empty = {
            let mut state = self.shared.lock().await;
            let empty = state.table.empty_slots();
            if empty.is_empty() || state.deck.is_empty() {
                return;
            }
            state.set_busy(true);
            empty
        };

        let mut placed = 0;
        for slot in empty {
            {
                let mut state = self.shared.lock().await;
                let Some(card) = state.deck.draw(&mut self.rng) else {
                    break;
                };
                state.table.place_card(card, slot);
            }
            placed += 1;
            self.table_delay().await;
        }

        let mut state = self.shared.lock().await;
        if placed > 0 {
            log::debug!("Dealt {} cards, {} left in deck", placed, state.deck.len());
            self.refresh_countdown(&mut state, true);
            if self.config.hints {
                self.log_hints(&state);
            }
        }
        state.set_busy(false);
    }

    /// Take away the cards of a pending claim.
    async fn remove_cards_from_table(&mut self) {
        let mut state = self.shared.lock().await;
        if state.claimant().is_none() {
            return;
        }
        state.set_busy(true);
        if let Some(claim) = state.take_claim() {
            self.resolve(&mut state, claim);
        }
        state.set_busy(false);
    }

    /// Remove the claimed cards and everyone's tokens on them, then tell
    /// the claimant. The cards are not returned to the deck.
    fn resolve(&self, state: &mut GameState, claim: Claim) {
        for card in &claim.cards {
            let Some(slot) = state.table.slot_of(*card) else {
                log::warn!("Claimed card {} is not on the table", card);
                continue;
            };
            let stripped = state.strip_slot(slot);
            state.table.remove_card(slot);
            debug_assert!(!state.deck.contains(*card));
            log::debug!(
                "Removed {} from slot {} (tokens of {:?} discarded)",
                card,
                slot,
                stripped
            );
        }
        log::info!("Player {} found set {:?}", claim.player, claim.cards);
        claim.resolve();
    }

    /// Return every card on the table to the deck and clear all tokens.
    ///
    /// A claim that raced the deadline is resolved first; its cards were
    /// valid when it was raised.
    async fn remove_all_cards_from_table(&mut self) {
        let mut state = self.shared.lock().await;
        state.set_busy(true);
        if let Some(claim) = state.take_claim() {
            self.resolve(&mut state, claim);
        }

        self.ui.notify(UiEvent::Countdown {
            millis: 0,
            warn: false,
        });
        state.reset_tokens();
        for slot in 0..state.table.size() {
            if let Some(card) = state.table.remove_card(slot) {
                state.deck.put_back(card);
            }
        }
        state.reshuffle_at = None;
        log::debug!("Table cleared, {} cards in deck", state.deck.len());
        state.set_busy(false);
    }

    fn announce_winners(&self) -> GameOutcome {
        let outcome = GameOutcome::from_scores(self.scores.clone());
        log::info!(
            "Winners {:?} with scores {:?}",
            outcome.winners,
            outcome.scores
        );
        self.ui.notify(UiEvent::Winners(outcome.winners.clone()));
        outcome
    }

    fn log_hints(&self, state: &GameState) {
        for set in self.validator.find_sets(&state.table.cards(), usize::MAX) {
            let slots: Vec<Option<Slot>> = set.iter().map(|c| state.table.slot_of(*c)).collect();
            log::info!("Hint: cards {:?} on slots {:?}", set, slots);
        }
    }

    async fn table_delay(&self) {
        let delay = self.config.table_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
