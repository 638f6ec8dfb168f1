//! BPE merge training.
//!
//! Every step recounts all adjacent pairs over the current sequences, merges
//! the most frequent one everywhere, and mints the next id. Ties between
//! equally frequent pairs go to the pair seen first when scanning chunks in
//! order, left to right.

use log::{debug, info};

use crate::{
    error::TrainError,
    merge::merge,
    model::TrainedState,
    progress::progress_bar,
    segmenter::Segmenter,
    stats::PairStats,
    tokenizer::Tokenizer,
    types::{BYTE_VOCAB_SIZE, Token},
};

/// Learns a merge table from a corpus.
///
/// Without a segmenter the whole corpus is one sequence; with one, every
/// chunk is trained independently and merges never cross chunk boundaries.
///
/// # Example
///
/// ```
/// use bpe_core::{TokenPair, Trainer};
///
/// let state = Trainer::basic().train("aaabdaaabac", 257, false)?;
/// assert_eq!(state.merges(), &[(TokenPair(97, 97), 256)]);
/// assert_eq!(state.token_bytes(256), Some(&b"aa"[..]));
/// # Ok::<(), bpe_core::TrainError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    segmenter: Option<Segmenter>,
}

impl Trainer {
    /// Trainer that treats the corpus as one byte sequence.
    pub fn basic() -> Self {
        Self { segmenter: None }
    }

    /// Trainer that splits the corpus with `segmenter` first.
    pub fn with_segmenter(segmenter: Segmenter) -> Self {
        Self {
            segmenter: Some(segmenter),
        }
    }

    pub fn segmenter(&self) -> Option<&Segmenter> {
        self.segmenter.as_ref()
    }

    /// Trains up to `vocab_size - 256` merges on `corpus`.
    ///
    /// Training stops early, returning the merges learned so far, once no
    /// pair occurs more than once. `verbose` draws a progress bar.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::VocabTooSmall`] if `vocab_size < 256`,
    /// [`TrainError::Split`] if segmentation fails, or
    /// [`TrainError::ProgressBarSetup`] if the progress bar cannot be built.
    pub fn train(
        &self,
        corpus: &str,
        vocab_size: usize,
        verbose: bool,
    ) -> Result<TrainedState, TrainError> {
        if vocab_size < BYTE_VOCAB_SIZE {
            return Err(TrainError::VocabTooSmall { vocab_size });
        }
        let num_merges = vocab_size - BYTE_VOCAB_SIZE;

        let mut chunks = self.initial_chunks(corpus)?;
        info!(
            "Starting BPE training: {} merges over {} chunks",
            num_merges,
            chunks.len()
        );

        let pb = progress_bar(num_merges as u64, "Training merges", verbose)
            .map_err(TrainError::ProgressBarSetup)?;

        let mut state = TrainedState::default();

        for i in 0..num_merges {
            let mut stats = PairStats::new();
            for chunk in &chunks {
                stats.update(chunk);
            }

            let Some((pair, freq)) = stats.most_frequent().filter(|&(_, freq)| freq > 1) else {
                info!("No pair repeats after {i} merges; stopping early");
                break;
            };

            let new_tok = state.push_merge(pair);
            for chunk in chunks.iter_mut() {
                if chunk.len() >= 2 {
                    *chunk = merge(chunk, pair, new_tok);
                }
            }

            debug!(
                "merge {}/{}: ({}, {}) -> {} ({:?}) had {} occurrences",
                i + 1,
                num_merges,
                pair.0,
                pair.1,
                new_tok,
                String::from_utf8_lossy(&state.vocab()[new_tok]),
                freq
            );
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            "Finished BPE training: {} merges, vocab size {}",
            state.num_merges(),
            state.vocab_size()
        );

        Ok(state)
    }

    /// Trains and bundles the result with this trainer's segmenter, so
    /// encoding chunks text the same way training did.
    ///
    /// # Errors
    ///
    /// Same as [`Trainer::train`].
    pub fn train_tokenizer(
        &self,
        corpus: &str,
        vocab_size: usize,
        verbose: bool,
    ) -> Result<Tokenizer, TrainError> {
        let state = self.train(corpus, vocab_size, verbose)?;
        Ok(Tokenizer::new(state, self.segmenter.clone()))
    }

    /// Byte-token sequences the merge loop starts from.
    fn initial_chunks(&self, corpus: &str) -> Result<Vec<Vec<Token>>, TrainError> {
        let to_tokens = |s: &str| s.bytes().map(Token::from).collect::<Vec<Token>>();

        match &self.segmenter {
            Some(segmenter) => Ok(segmenter
                .split(corpus)
                .map_err(TrainError::Split)?
                .into_iter()
                .map(to_tokens)
                .collect()),
            None => Ok(vec![to_tokens(corpus)]),
        }
    }
}
