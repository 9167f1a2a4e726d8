//! Word/icon card deck for the matching game
//!
//! A `GameSession` owns its pairs. Every new game clears the display
//! container, shuffles the pairs in place and deals one face-down card
//! per pair in shuffled order.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One (word, icon) tuple a card is built from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordIconPair {
    pub word: String,
    pub icon: String,
}

impl WordIconPair {
    pub fn new(word: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            icon: icon.into(),
        }
    }
}

/// Built-in deck used when the config doesn't provide one
const DEFAULT_PAIRS: &[(&str, &str)] = &[
    ("Apple", "🍎"),
    ("Bread", "🍞"),
    ("Cheese", "🧀"),
    ("Carrot", "🥕"),
    ("Egg", "🥚"),
    ("Milk", "🥛"),
    ("Rice", "🍚"),
    ("Salt", "🧂"),
];

pub fn default_pairs() -> Vec<WordIconPair> {
    DEFAULT_PAIRS
        .iter()
        .map(|(word, icon)| WordIconPair::new(*word, *icon))
        .collect()
}

/// A rendered tile derived from a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub word: String,
    pub icon: String,
    pub face_up: bool,
}

impl From<&WordIconPair> for Card {
    fn from(pair: &WordIconPair) -> Self {
        Self {
            word: pair.word.clone(),
            icon: pair.icon.clone(),
            face_up: false,
        }
    }
}

/// Anything cards can be dealt into
pub trait CardContainer {
    /// Remove every card. Clearing an empty container is a no-op.
    fn clear(&mut self);
    fn append(&mut self, card: Card);
}

/// Vec-backed container the TUI draws from
#[derive(Debug, Clone, Default)]
pub struct CardGrid {
    cards: Vec<Card>,
}

impl CardGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Toggle a card face. Out-of-range indices are ignored.
    pub fn flip(&mut self, index: usize) -> Option<&Card> {
        let card = self.cards.get_mut(index)?;
        card.face_up = !card.face_up;
        Some(card)
    }
}

impl CardContainer for CardGrid {
    fn clear(&mut self) {
        self.cards.clear();
    }

    fn append(&mut self, card: Card) {
        self.cards.push(card);
    }
}

/// Uniform in-place shuffle.
///
/// Walks from the last index down to 1 and swaps each slot with one drawn
/// uniformly from `0..=i`, so every one of the n! orderings is equally likely.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// One game's worth of pairs plus the random source used to shuffle them
pub struct GameSession<R: Rng> {
    pairs: Vec<WordIconPair>,
    rng: R,
}

impl<R: Rng> GameSession<R> {
    pub fn new(pairs: Vec<WordIconPair>, rng: R) -> Self {
        Self { pairs, rng }
    }

    /// Pairs in their current (last shuffled) order
    pub fn pairs(&self) -> &[WordIconPair] {
        &self.pairs
    }

    /// Start a new game: clear, shuffle, deal.
    pub fn initialize_game<C: CardContainer + ?Sized>(&mut self, container: &mut C) {
        container.clear();
        shuffle(&mut self.pairs, &mut self.rng);
        for pair in &self.pairs {
            container.append(Card::from(pair));
        }
        tracing::debug!("Dealt {} cards", self.pairs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn sorted(mut pairs: Vec<WordIconPair>) -> Vec<WordIconPair> {
        pairs.sort_by(|a, b| a.word.cmp(&b.word));
        pairs
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 0..20 {
            let original: Vec<usize> = (0..n).collect();
            let mut shuffled = original.clone();
            shuffle(&mut shuffled, &mut rng);

            assert_eq!(shuffled.len(), original.len());
            let mut back = shuffled.clone();
            back.sort_unstable();
            assert_eq!(back, original, "n = {}", n);
        }
    }

    #[test]
    fn test_shuffle_keeps_duplicates() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut items = vec!['a', 'a', 'b', 'c', 'c', 'c'];
        shuffle(&mut items, &mut rng);
        items.sort_unstable();
        assert_eq!(items, vec!['a', 'a', 'b', 'c', 'c', 'c']);
    }

    #[test]
    fn test_shuffle_is_uniform() {
        const TRIALS: usize = 60_000;
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut counts: HashMap<[u8; 3], usize> = HashMap::new();

        for _ in 0..TRIALS {
            let mut items = [0u8, 1, 2];
            shuffle(&mut items, &mut rng);
            *counts.entry(items).or_default() += 1;
        }

        assert_eq!(counts.len(), 6, "every ordering should show up");

        let expected = TRIALS as f64 / 6.0;
        let chi_square: f64 = counts
            .values()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();

        // 5 degrees of freedom, p = 0.001
        assert!(chi_square < 20.52, "chi-square too large: {}", chi_square);
    }

    #[test]
    fn test_initialize_deals_every_pair_once() {
        let pairs = default_pairs();
        let mut session = GameSession::new(pairs.clone(), StdRng::seed_from_u64(3));
        let mut grid = CardGrid::new();

        session.initialize_game(&mut grid);

        assert_eq!(grid.len(), pairs.len());
        let dealt: Vec<WordIconPair> = grid
            .cards()
            .iter()
            .map(|c| WordIconPair::new(c.word.clone(), c.icon.clone()))
            .collect();
        assert_eq!(sorted(dealt.clone()), sorted(pairs));
        // Display order follows the session's shuffled order
        assert_eq!(dealt, session.pairs().to_vec());
        assert!(grid.cards().iter().all(|c| !c.face_up));
    }

    #[test]
    fn test_initialize_twice_replaces_cards() {
        let pairs = default_pairs();
        let n = pairs.len();
        let mut session = GameSession::new(pairs, StdRng::seed_from_u64(11));
        let mut grid = CardGrid::new();

        session.initialize_game(&mut grid);
        grid.flip(0);
        session.initialize_game(&mut grid);

        assert_eq!(grid.len(), n);
        assert!(grid.cards().iter().all(|c| !c.face_up));
    }

    #[test]
    fn test_initialize_empty_deck() {
        let mut session = GameSession::new(Vec::new(), StdRng::seed_from_u64(0));
        let mut grid = CardGrid::new();
        grid.append(Card::from(&WordIconPair::new("Stale", "?")));

        session.initialize_game(&mut grid);

        assert!(grid.is_empty());
    }

    #[test]
    fn test_flip_toggles_and_ignores_out_of_range() {
        let mut grid = CardGrid::new();
        grid.append(Card::from(&WordIconPair::new("Salt", "🧂")));

        assert!(grid.flip(0).map(|c| c.face_up).unwrap_or(false));
        assert!(!grid.flip(0).map(|c| c.face_up).unwrap_or(true));
        assert!(grid.flip(5).is_none());
    }
}
