//! Trained BPE state: the ordered merge table and the vocabulary.
//!
//! Encoding applies merges to byte-token sequences with a priority queue,
//! following the approach from:
//! "A Formal Perspective on Byte-Pair Encoding"
//! https://aclanthology.org/2023.findings-acl.38.pdf
//!
//! Merges are applied in the order they were learned during training, which
//! gives the same result as repeatedly merging the lowest-id pair present.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

use crate::{
    error::TokenizerInitError,
    types::{BYTE_VOCAB_SIZE, ByteSeq, MergeOrder, Token, TokenPair},
};

/// A mergeable pair queued during encoding.
///
/// The heap pops the lowest `merge_order` first, then the leftmost `position`.
#[derive(Debug, PartialEq, Eq)]
struct MergeCandidate {
    /// Index of the rule in the merge table.
    merge_order: MergeOrder,

    /// Pair as it stood when queued; a mismatch on pop marks it stale.
    pair: TokenPair,

    /// Index of the pair's left token in the working sequence.
    position: usize,
}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; comparing other to self pops the
        // smallest (merge_order, position) first.
        other
            .merge_order
            .cmp(&self.merge_order)
            .then_with(|| other.position.cmp(&self.position))
    }
}

/// Result of a training run: the merge table and the vocabulary built from it.
///
/// Immutable once built. Encoding and decoding only read it, so one state can
/// be shared across threads without locking.
///
/// # Example
///
/// ```
/// use bpe_core::{TokenPair, TrainedState};
///
/// let state = TrainedState::from_merges(vec![(TokenPair(97, 98), 256)])?;
/// assert_eq!(state.encode_tokens(vec![97, 98, 99]), vec![256, 99]);
/// assert_eq!(state.token_bytes(256), Some(&b"ab"[..]));
/// # Ok::<(), bpe_core::TokenizerInitError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TrainedState {
    /// Merge rules in the order they were learned.
    merges: Vec<(TokenPair, Token)>,

    /// Maps token pairs to (merged_token, merge_order).
    ranks: HashMap<TokenPair, (Token, MergeOrder)>,

    /// Maps token IDs to their byte sequences.
    ///
    /// - vocab[0..256]: Base vocabulary (single bytes)
    /// - vocab[256..]: Merged tokens (concatenated byte sequences)
    vocab: Vec<ByteSeq>,
}

impl Default for TrainedState {
    /// State with no merges: every byte is its own token.
    fn default() -> Self {
        Self {
            merges: Vec::new(),
            ranks: HashMap::new(),
            vocab: base_vocab(),
        }
    }
}

impl TrainedState {
    /// Rebuilds a state from an ordered merge history.
    ///
    /// The iteration order is the merge priority (earlier = higher priority).
    /// Merge `i` must mint id `256 + i` from ids that already exist.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerInitError::InvalidMerge`] for the first rule that
    /// breaks id contiguity or references an unknown id.
    pub fn from_merges(
        merge_history: impl IntoIterator<Item = (TokenPair, Token)>,
    ) -> Result<Self, TokenizerInitError> {
        let mut state = Self::default();
        for (order, (pair, tok)) in merge_history.into_iter().enumerate() {
            let next = state.vocab.len();
            if tok != next || pair.0 >= next || pair.1 >= next {
                return Err(TokenizerInitError::InvalidMerge {
                    order,
                    left: pair.0,
                    right: pair.1,
                    token: tok,
                });
            }
            state.push_merge(pair);
        }
        Ok(state)
    }

    /// Records `pair` as the next merge and returns its new id.
    ///
    /// Callers guarantee both halves of `pair` are known ids.
    pub(crate) fn push_merge(&mut self, pair: TokenPair) -> Token {
        let tok = self.vocab.len();
        let order = self.merges.len();

        let mut merged_bytes = self.vocab[pair.0].clone();
        merged_bytes.extend_from_slice(&self.vocab[pair.1]);
        self.vocab.push(merged_bytes);

        self.merges.push((pair, tok));
        self.ranks.insert(pair, (tok, order));
        tok
    }

    /// Merge rules in learned order.
    pub fn merges(&self) -> &[(TokenPair, Token)] {
        &self.merges
    }

    /// Merged id and merge order of `pair`, if it was learned.
    pub fn rank(&self, pair: TokenPair) -> Option<(Token, MergeOrder)> {
        self.ranks.get(&pair).copied()
    }

    pub fn num_merges(&self) -> usize {
        self.merges.len()
    }

    /// Vocabulary indexed by token id.
    pub fn vocab(&self) -> &[ByteSeq] {
        &self.vocab
    }

    /// Number of ids with a vocabulary entry (256 + merges).
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Byte string of `token`, `None` if it has no vocabulary entry.
    pub fn token_bytes(&self, token: Token) -> Option<&[u8]> {
        self.vocab.get(token).map(Vec::as_slice)
    }

    /// Encodes a token sequence by applying learned BPE merge rules.
    ///
    /// Merges are applied in the order they were learned during training,
    /// using a priority queue to efficiently find and apply the next merge.
    /// The output has the same or fewer tokens than the input.
    ///
    /// # Time Complexity
    ///
    /// O(N log N) where N is the input sequence length.
    pub fn encode_tokens(&self, tokens: Vec<Token>) -> Vec<Token> {
        if tokens.len() <= 1 || self.ranks.is_empty() {
            return tokens;
        }

        let mut heap = BinaryHeap::new();

        // results[pos] = None marks a position consumed by a merge
        // into its left neighbour
        let mut results: Vec<Option<Token>> = tokens.iter().map(|&t| Some(t)).collect();

        self.initialize_minheap(&tokens, &mut heap);

        // process merges in training order (lowest merge_order first)
        while let Some(candidate) = heap.pop() {
            let pos = candidate.position;

            let Some(left) = results.get(pos).copied().flatten() else {
                continue;
            };
            // the token at pos may itself be a merge result, so the next
            // live token can be further to the right
            let mut right_idx = pos + 1;
            while right_idx < results.len() && matches!(results.get(right_idx), Some(None)) {
                right_idx += 1;
            }
            let Some(right) = results.get(right_idx).copied().flatten() else {
                continue;
            };

            // stale candidate: the pair at pos changed since it was queued
            if candidate.pair != TokenPair(left, right) {
                continue;
            }

            let Some(&(merge_tok, _order)) = self.ranks.get(&candidate.pair) else {
                continue;
            };

            results[pos] = Some(merge_tok);
            results[right_idx] = None;

            self.track_new_merge_candidate(&mut heap, &results, pos, merge_tok, true);
            self.track_new_merge_candidate(&mut heap, &results, pos, merge_tok, false);
        }

        results.into_iter().flatten().collect()
    }

    /// Pushes the pairs the merged token at `pos` forms with its nearest live
    /// neighbour (left if `check_left`, otherwise right) when a rule exists.
    fn track_new_merge_candidate(
        &self,
        heap: &mut BinaryHeap<MergeCandidate>,
        results: &[Option<Token>],
        pos: usize,
        merged_tok: Token,
        check_left: bool,
    ) {
        let n = results.len();

        let idx = if check_left {
            if pos == 0 {
                return;
            }
            let mut idx = pos - 1;
            while idx > 0 && matches!(results.get(idx), Some(None)) {
                idx -= 1;
            }
            idx
        } else {
            if pos + 1 >= n {
                return;
            }
            let mut idx = pos + 1;
            while idx < n && matches!(results.get(idx), Some(None)) {
                idx += 1;
            }
            idx
        };

        let Some(&Some(tok)) = results.get(idx) else {
            return;
        };

        let pair = if check_left {
            TokenPair(tok, merged_tok)
        } else {
            TokenPair(merged_tok, tok)
        };

        if let Some(&(_merge_tok, merge_order)) = self.ranks.get(&pair) {
            let position = if check_left { idx } else { pos };
            heap.push(MergeCandidate {
                merge_order,
                pair,
                position,
            });
        }
    }

    /// Queues every adjacent pair of `tokens` that has a merge rule.
    fn initialize_minheap(&self, tokens: &[Token], heap: &mut BinaryHeap<MergeCandidate>) {
        for (i, w) in tokens.windows(2).enumerate() {
            let pair = TokenPair(w[0], w[1]);
            if let Some(&(_, merge_order)) = self.ranks.get(&pair) {
                heap.push(MergeCandidate {
                    merge_order,
                    pair,
                    position: i,
                });
            }
        }
    }
}

fn base_vocab() -> Vec<ByteSeq> {
    (0..BYTE_VOCAB_SIZE).map(|b| vec![b as u8]).collect()
}
