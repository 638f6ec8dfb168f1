//! Type aliases and shared types for BPE training and encoding.
//!
//! These type aliases provide semantic clarity throughout the codebase.

/// Represents a token identifier.
///
/// Ids 0-255 are raw bytes, ids from 256 upward are minted by training in
/// the order merges were learned. Special tokens carry caller-assigned ids.
pub type Token = usize;

/// Frequency count for token pairs during training.
pub type TokenFreq = usize;

/// Merge order indicates when a merge rule was learned during training.
///
/// Lower values represent earlier merges (e.g., 0 = first merge, 1 = second merge).
pub type MergeOrder = usize;

/// A sequence of raw bytes.
///
/// Used for vocabulary entries and for decoded output before UTF-8 conversion.
pub type ByteSeq = Vec<u8>;

/// Number of single-byte tokens; the first merged token id.
pub const BYTE_VOCAB_SIZE: usize = 256;

/// A pair of adjacent tokens.
///
/// Used as a key for looking up merge rules during encoding and for
/// tracking pair frequencies during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenPair(pub Token, pub Token);

impl From<(Token, Token)> for TokenPair {
    fn from((left, right): (Token, Token)) -> Self {
        TokenPair(left, right)
    }
}
