//! One-way display sink.
//!
//! The core only ever pushes [`UiEvent`]s into a [`Ui`]; it never reads
//! anything back. Rendering is somebody else's problem.

use super::entities::{Card, PlayerId, Score, Slot};
use serde::Serialize;
use std::{fmt, sync::Mutex};

/// Everything the game tells its display
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum UiEvent {
    /// Time left until the next reshuffle
    Countdown { millis: u64, warn: bool },
    CardPlaced { card: Card, slot: Slot },
    CardRemoved { slot: Slot },
    TokenPlaced { player: PlayerId, slot: Slot },
    TokenRemoved { player: PlayerId, slot: Slot },
    /// Every token on the table was cleared at once
    TokensReset,
    Score { player: PlayerId, score: Score },
    /// Remaining freeze for a player, 0 when the freeze is over
    Freeze { player: PlayerId, millis: u64 },
    Winners(Vec<PlayerId>),
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Countdown { millis, warn } => {
                let secs = *millis as f64 / 1000.0;
                if *warn {
                    write!(f, "countdown {secs:.1}s (hurry)")
                } else {
                    write!(f, "countdown {:.0}s", secs.ceil())
                }
            }
            Self::CardPlaced { card, slot } => write!(f, "{card} placed on slot {slot}"),
            Self::CardRemoved { slot } => write!(f, "slot {slot} cleared"),
            Self::TokenPlaced { player, slot } => write!(f, "player {player} token on slot {slot}"),
            Self::TokenRemoved { player, slot } => {
                write!(f, "player {player} token off slot {slot}")
            }
            Self::TokensReset => write!(f, "all tokens removed"),
            Self::Score { player, score } => write!(f, "player {player} scored, now {score}"),
            Self::Freeze { player, millis } => write!(f, "player {player} frozen for {millis}ms"),
            Self::Winners(winners) => {
                let names = winners
                    .iter()
                    .map(|p| format!("player {p}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "winner(s): {names}")
            }
        }
    }
}

/// Display collaborator
pub trait Ui: Send + Sync {
    fn notify(&self, event: UiEvent);
}

/// Renders events through the `log` facade.
#[derive(Debug, Default)]
pub struct LogUi;

impl Ui for LogUi {
    fn notify(&self, event: UiEvent) {
        match event {
            UiEvent::Score { .. } | UiEvent::Winners(_) => log::info!("{event}"),
            UiEvent::Countdown { warn: true, .. } | UiEvent::Freeze { .. } => {
                log::debug!("{event}")
            }
            _ => log::trace!("{event}"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events so far
    pub fn events(&self) -> Vec<UiEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Last score published for a player, if any
    pub fn score_of(&self, player: PlayerId) -> Option<Score> {
        self.events().into_iter().rev().find_map(|e| match e {
            UiEvent::Score { player: p, score } if p == player => Some(score),
            _ => None,
        })
    }

    /// Winner list, once announced
    pub fn winners(&self) -> Option<Vec<PlayerId>> {
        self.events().into_iter().find_map(|e| match e {
            UiEvent::Winners(w) => Some(w),
            _ => None,
        })
    }
}

impl Ui for RecordingUi {
    fn notify(&self, event: UiEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_ui_keeps_order() {
        let ui = RecordingUi::new();
        ui.notify(UiEvent::TokensReset);
        ui.notify(UiEvent::Score { player: 1, score: 1 });
        ui.notify(UiEvent::Score { player: 1, score: 2 });

        assert_eq!(ui.events().len(), 3);
        assert_eq!(ui.events()[0], UiEvent::TokensReset);
        assert_eq!(ui.score_of(1), Some(2));
        assert_eq!(ui.score_of(0), None);
        assert_eq!(ui.winners(), None);
    }

    #[test]
    fn test_event_display() {
        let event = UiEvent::Winners(vec![0, 2]);
        assert_eq!(event.to_string(), "winner(s): player 0, player 2");

        let event = UiEvent::Countdown {
            millis: 4200,
            warn: true,
        };
        assert_eq!(event.to_string(), "countdown 4.2s (hurry)");
    }
}
