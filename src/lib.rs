//! Byte-pair encoding (BPE) tokenizer core.
//!
//! Learns an ordered table of byte-pair merges from a corpus and uses it to
//! turn text into token ids and back:
//!
//! - [`Trainer`] learns merges, optionally inside [`Segmenter`] chunks.
//! - [`TrainedState`] holds the merge table and vocabulary.
//! - [`Tokenizer`] encodes and decodes, handling special tokens per
//!   [`AllowedSpecial`].
//!
//! ```
//! use bpe_core::{AllowedSpecial, Segmenter, Trainer};
//!
//! let trainer = Trainer::with_segmenter(Segmenter::gpt4()?);
//! let tokenizer = trainer.train_tokenizer("the cat sat on the mat", 260, false)?;
//!
//! let ids = tokenizer.encode("the mat", &AllowedSpecial::None)?;
//! assert_eq!(tokenizer.decode(&ids)?, "the mat");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unused_must_use)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod error;
mod merge;
mod model;
mod progress;
mod segmenter;
mod special;
mod stats;
mod tokenizer;
mod trainer;
mod types;

pub use error::{DecodeError, EncodeError, ErrorMode, TokenizerInitError, TrainError};
pub use merge::merge;
pub use model::TrainedState;
pub use segmenter::{GPT4_SPLIT_PATTERN, Segmenter};
pub use special::{AllowedSpecial, Piece, SpecialTokens};
pub use stats::PairStats;
pub use tokenizer::Tokenizer;
pub use trainer::Trainer;
pub use types::{BYTE_VOCAB_SIZE, ByteSeq, MergeOrder, Token, TokenFreq, TokenPair};
