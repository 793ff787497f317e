//! Values passed between the dealer and the players.

use crate::game::{Card, PlayerId, Score};
use serde::Serialize;
use tokio::sync::oneshot;

/// A player's assertion that its tokened cards form a set.
///
/// Lives in the claim marker of [`super::GameState`] until the dealer
/// resolves it. Resolving sends on `resolved`; dropping the claim without
/// resolving it closes the channel and the claimant gets no point.
#[derive(Debug)]
pub struct Claim {
    pub player: PlayerId,
    pub cards: Vec<Card>,
    resolved: oneshot::Sender<()>,
}

impl Claim {
    /// Claim plus the receiver the claimant waits on
    pub fn new(player: PlayerId, cards: Vec<Card>) -> (Self, oneshot::Receiver<()>) {
        let (resolved, receiver) = oneshot::channel();
        (
            Self {
                player,
                cards,
                resolved,
            },
            receiver,
        )
    }

    /// Tell the claimant its cards are off the table.
    pub fn resolve(self) {
        if self.resolved.send(()).is_err() {
            log::debug!("Player {} no longer waits for its claim", self.player);
        }
    }
}

/// Why a round of dealing ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEnd {
    /// The countdown ran out; reshuffle and deal again
    Timeout,
    /// No set is left among the remaining cards
    Exhausted,
    /// Someone asked the game to stop
    Terminated,
}

/// Final result of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameOutcome {
    /// Final score of every player, indexed by id
    pub scores: Vec<Score>,

    /// Every player holding the top score
    pub winners: Vec<PlayerId>,
}

impl GameOutcome {
    /// Collect everyone sharing the highest score.
    #[must_use]
    pub fn from_scores(scores: Vec<Score>) -> Self {
        let best = scores.iter().copied().max();
        let winners = scores
            .iter()
            .enumerate()
            .filter(|(_, score)| Some(**score) == best)
            .map(|(player, _)| player)
            .collect();
        Self { scores, winners }
    }
}
