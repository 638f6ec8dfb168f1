//! Adjacent pair frequency counting.

use indexmap::IndexMap;

use crate::types::{Token, TokenFreq, TokenPair};

/// Counts of adjacent token pairs across one or more sequences.
///
/// Entries keep the order in which each pair was first seen, so when
/// sequences are fed left to right and in chunk order the map doubles as
/// the first-occurrence order used to break frequency ties.
#[derive(Debug, Clone, Default)]
pub struct PairStats {
    counts: IndexMap<TokenPair, TokenFreq>,
}

impl PairStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the pairs of a single sequence.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let mut stats = Self::new();
        stats.update(tokens);
        stats
    }

    /// Adds the pairs of `tokens` to the running counts.
    ///
    /// Windows overlap: `[a, a, a]` contributes 2 to `(a, a)`. Pairs are never
    /// formed across calls, so each call is an independent chunk.
    pub fn update(&mut self, tokens: &[Token]) {
        for w in tokens.windows(2) {
            *self.counts.entry(TokenPair(w[0], w[1])).or_insert(0) += 1;
        }
    }

    /// Returns the count of `pair`, 0 if it never occurred.
    pub fn get(&self, pair: &TokenPair) -> TokenFreq {
        self.counts.get(pair).copied().unwrap_or(0)
    }

    /// Returns the pair with the highest count.
    ///
    /// Among pairs sharing the maximum count, the one seen first wins.
    pub fn most_frequent(&self) -> Option<(TokenPair, TokenFreq)> {
        let mut best: Option<(TokenPair, TokenFreq)> = None;
        for (&pair, &freq) in &self.counts {
            match best {
                Some((_, best_freq)) if freq <= best_freq => {}
                _ => best = Some((pair, freq)),
            }
        }
        best
    }

    /// Iterates `(pair, count)` in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenPair, TokenFreq)> + '_ {
        self.counts.iter().map(|(&pair, &freq)| (pair, freq))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
