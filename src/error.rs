//! Error types for BPE tokenizer and trainer operations.

use std::str::FromStr;

use indicatif::style::TemplateError;
use thiserror::Error;

use crate::types::Token;

/// Controls how UTF-8 decoding errors are handled.
///
/// Unknown token IDs always produce errors regardless of mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Fail on invalid UTF-8.
    Strict,
    /// Replace each malformed byte subsequence with U+FFFD.
    #[default]
    Replace,
}

impl FromStr for ErrorMode {
    type Err = String;

    /// Parses an error mode string ("strict" or "replace").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "replace" => Ok(Self::Replace),
            _ => Err(format!(
                "invalid error mode: {s:?} (expected \"strict\" or \"replace\")"
            )),
        }
    }
}

/// Errors that can occur during training.
#[derive(Debug, Error)]
pub enum TrainError {
    /// Requested vocabulary cannot hold the 256 byte tokens.
    #[error("vocab size must be at least 256, got {vocab_size}")]
    VocabTooSmall { vocab_size: usize },
    /// Splitting the corpus into chunks failed.
    #[error("failed to split training corpus: {0}")]
    Split(#[source] EncodeError),
    /// Progress bar template string was invalid.
    #[error("template parsing failed: {0}")]
    ProgressBarSetup(#[source] TemplateError),
}

/// Errors that can occur during text encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Regex engine failed during text splitting (e.g. backtracking limit exceeded).
    #[error("regex match failed: {0}")]
    RegexMatch(String),
    /// A registered special token appeared in text encoded with `NoneRaise`.
    #[error("disallowed special token found in text: {0:?}")]
    DisallowedSpecial(String),
    /// The allowed-special policy string is not one of "all", "none", "none_raise".
    #[error("allowed_special={0:?} not understood")]
    UnknownPolicy(String),
    /// Progress bar template string was invalid.
    #[error("template parsing failed: {0}")]
    ProgressBarSetup(#[source] TemplateError),
}

/// Errors that can occur during token decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Token ID not found in vocabulary or special-token table.
    #[error("unknown token id: {0}")]
    UnknownToken(Token),
    /// Decoded bytes are not valid UTF-8 (strict mode only).
    #[error("invalid UTF-8 in decoded bytes: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Progress bar template string was invalid.
    #[error("template parsing failed: {0}")]
    ProgressBarSetup(#[source] TemplateError),
}

/// Errors that can occur when building a segmenter or a trained state.
#[derive(Debug, Error)]
pub enum TokenizerInitError {
    /// The regex pattern failed to compile.
    #[error("invalid split pattern: {0}")]
    InvalidPattern(#[from] fancy_regex::Error),
    /// A merge rule does not fit the contiguous id scheme or references an unknown id.
    #[error("invalid merge #{order}: ({left}, {right}) -> {token}")]
    InvalidMerge {
        order: usize,
        left: Token,
        right: Token,
        token: Token,
    },
}
