//! Key presses for computer players.

use crate::game::{PlayerId, Slot};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Notify, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// Endless stream of uniformly random slots.
#[derive(Debug)]
pub struct RandomSlots {
    rng: StdRng,
    table_size: usize,
}

impl RandomSlots {
    pub fn new(table_size: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng, table_size }
    }
}

impl Iterator for RandomSlots {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        Some(self.rng.random_range(0..self.table_size))
    }
}

/// Feeds one player's inbox, one press at a time.
///
/// After every press the generator waits until the player releases it,
/// so nothing piles up while the player is frozen or waiting on the
/// dealer.
pub struct InputGenerator {
    player: PlayerId,
    slots: RandomSlots,
    inbox: mpsc::Sender<Slot>,
    ready: Arc<Notify>,
    think_time: Duration,
    cancel: CancellationToken,
}

/// Owner's side of a running generator
#[derive(Debug)]
pub struct GeneratorHandle {
    ready: Arc<Notify>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl GeneratorHandle {
    /// Let the generator produce its next press.
    pub fn release(&self) {
        self.ready.notify_one();
    }

    /// Stop the generator and wait for it to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            log::error!("Input generator failed: {}", e);
        }
    }
}

impl InputGenerator {
    pub fn new(
        player: PlayerId,
        slots: RandomSlots,
        inbox: mpsc::Sender<Slot>,
        think_time: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            player,
            slots,
            inbox,
            ready: Arc::new(Notify::new()),
            think_time,
            cancel,
        }
    }

    /// Spawn the generator and wait until it is running.
    pub async fn spawn(self) -> GeneratorHandle {
        let ready = self.ready.clone();
        let cancel = self.cancel.clone();
        let (started, is_started) = oneshot::channel();
        let join = tokio::spawn(self.run(started));
        if is_started.await.is_err() {
            log::warn!("Input generator exited before starting");
        }
        GeneratorHandle {
            ready,
            cancel,
            join,
        }
    }

    async fn run(mut self, started: oneshot::Sender<()>) {
        let _ = started.send(());
        log::info!("Computer {} starting", self.player);

        for slot in &mut self.slots {
            if !self.think_time.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.think_time) => {}
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                sent = self.inbox.send(slot) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = self.ready.notified() => {}
            }
        }

        log::info!("Computer {} terminated", self.player);
    }
}
