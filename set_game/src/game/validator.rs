//! Set validity predicate.

use super::entities::Card;
use std::collections::HashSet;

/// Decides which groups of cards form a set.
pub trait SetValidator: Send + Sync {
    /// Number of cards in a set
    fn set_size(&self) -> usize;

    fn is_valid_set(&self, cards: &[Card]) -> bool;

    /// Up to `limit` sets found among `cards`, each in ascending input order.
    fn find_sets(&self, cards: &[Card], limit: usize) -> Vec<Vec<Card>> {
        let mut found = Vec::new();
        let mut picked = Vec::with_capacity(self.set_size());
        collect_sets(self, cards, 0, &mut picked, limit, &mut found);
        found
    }

    /// Whether any set exists among `cards`.
    fn exists_valid_set(&self, cards: &[Card]) -> bool {
        !self.find_sets(cards, 1).is_empty()
    }
}

fn collect_sets<V: SetValidator + ?Sized>(
    validator: &V,
    cards: &[Card],
    start: usize,
    picked: &mut Vec<Card>,
    limit: usize,
    found: &mut Vec<Vec<Card>>,
) {
    if found.len() >= limit {
        return;
    }
    if picked.len() == validator.set_size() {
        if validator.is_valid_set(picked) {
            found.push(picked.clone());
        }
        return;
    }
    let missing = validator.set_size() - picked.len();
    for idx in start..cards.len() {
        if cards.len() - idx < missing {
            break;
        }
        picked.push(cards[idx]);
        collect_sets(validator, cards, idx + 1, picked, limit, found);
        picked.pop();
    }
}

/// The classic rules: every card has `feature_count` features, each taking
/// one of `set_size` values, and a set is a group of `set_size` cards where
/// each feature is either the same on all cards or different on all cards.
///
/// A card's features are the base-`set_size` digits of its id, least
/// significant first.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FeatureValidator {
    set_size: usize,
    feature_count: usize,
}

impl Default for FeatureValidator {
    fn default() -> Self {
        Self::new(3, 4)
    }
}

impl FeatureValidator {
    #[must_use]
    pub const fn new(set_size: usize, feature_count: usize) -> Self {
        Self {
            set_size,
            feature_count,
        }
    }

    /// Size of the full deck these rules describe
    #[must_use]
    pub fn deck_size(&self) -> usize {
        self.set_size.pow(self.feature_count as u32)
    }

    #[must_use]
    pub fn features(&self, card: Card) -> Vec<usize> {
        let mut id = card.0 as usize;
        (0..self.feature_count)
            .map(|_| {
                let feature = id % self.set_size;
                id /= self.set_size;
                feature
            })
            .collect()
    }

    /// The only card completing a set with `partial`, which must hold
    /// `set_size - 1` cards. `None` if no card can complete it.
    #[must_use]
    pub fn completing_card(&self, partial: &[Card]) -> Option<Card> {
        if partial.len() + 1 != self.set_size {
            return None;
        }
        let features: Vec<Vec<usize>> = partial.iter().map(|c| self.features(*c)).collect();
        let mut id = 0;
        for feature in (0..self.feature_count).rev() {
            let values: HashSet<usize> = features.iter().map(|f| f[feature]).collect();
            let value = if values.len() == 1 {
                features[0][feature]
            } else if values.len() == partial.len() {
                (0..self.set_size).find(|v| !values.contains(v))?
            } else {
                return None;
            };
            id = id * self.set_size + value;
        }
        Some(Card::from(id))
    }
}

impl SetValidator for FeatureValidator {
    fn set_size(&self) -> usize {
        self.set_size
    }

    fn is_valid_set(&self, cards: &[Card]) -> bool {
        if cards.len() != self.set_size {
            return false;
        }
        let features: Vec<Vec<usize>> = cards.iter().map(|c| self.features(*c)).collect();
        (0..self.feature_count).all(|feature| {
            let values: HashSet<usize> = features.iter().map(|f| f[feature]).collect();
            values.len() == 1 || values.len() == self.set_size
        }) && cards.iter().collect::<HashSet<_>>().len() == cards.len()
    }

    fn exists_valid_set(&self, cards: &[Card]) -> bool {
        if self.set_size != 3 {
            return !self.find_sets(cards, 1).is_empty();
        }
        // Any two distinct cards determine the third.
        let present: HashSet<Card> = cards.iter().copied().collect();
        cards.iter().enumerate().any(|(i, a)| {
            cards[i + 1..].iter().any(|b| {
                self.completing_card(&[*a, *b])
                    .is_some_and(|c| c != *a && c != *b && present.contains(&c))
            })
        })
    }
}
