//! This module provides the complete encoding pipeline:
//! 1. Special-token splitting according to the allowed-special policy.
//! 2. Pattern-based segmentation of each ordinary piece into chunks.
//! 3. UTF-8 byte conversion for each chunk.
//! 4. BPE merge application on byte sequences.
//!
//! Decoding maps ids back through the vocabulary (or the special-token
//! table) and converts the bytes to text. Batch variants of both run in
//! parallel via Rayon over the same read-only state.

use std::collections::HashMap;

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::{
    error::{DecodeError, EncodeError, ErrorMode},
    model::TrainedState,
    progress::progress_bar,
    segmenter::Segmenter,
    special::{AllowedSpecial, SpecialTokens},
    types::{ByteSeq, Token},
};

/// BPE tokenizer combining a trained state, an optional segmenter and a
/// special-token table.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use bpe_core::{AllowedSpecial, Segmenter, Trainer};
///
/// let trainer = Trainer::with_segmenter(Segmenter::gpt4()?);
/// let mut tokenizer = trainer.train_tokenizer("hello world, hello there", 270, false)?;
/// tokenizer.register_special_tokens(HashMap::from([("<|end|>".to_string(), 1000)]));
///
/// let ids = tokenizer.encode("hello<|end|>", &AllowedSpecial::All)?;
/// assert_eq!(ids.last(), Some(&1000));
/// assert_eq!(tokenizer.decode(&ids)?, "hello<|end|>");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    state: TrainedState,
    segmenter: Option<Segmenter>,
    special: SpecialTokens,
}

impl Tokenizer {
    /// Creates a tokenizer from a trained state.
    ///
    /// `segmenter` must match the one used in training for encodings to
    /// reproduce the training chunking; `None` encodes text as one chunk.
    pub fn new(state: TrainedState, segmenter: Option<Segmenter>) -> Self {
        Self {
            state,
            segmenter,
            special: SpecialTokens::default(),
        }
    }

    /// Returns this tokenizer with `tokens` as its special-token table.
    pub fn with_special_tokens(mut self, tokens: HashMap<String, Token>) -> Self {
        self.register_special_tokens(tokens);
        self
    }

    /// Replaces the special-token table wholesale.
    ///
    /// Ids are caller-assigned and should not collide with vocabulary ids;
    /// on collision the vocabulary entry wins when decoding.
    pub fn register_special_tokens(&mut self, tokens: HashMap<String, Token>) {
        self.special = SpecialTokens::new(tokens);
    }

    pub fn state(&self) -> &TrainedState {
        &self.state
    }

    pub fn segmenter(&self) -> Option<&Segmenter> {
        self.segmenter.as_ref()
    }

    pub fn special_tokens(&self) -> &SpecialTokens {
        &self.special
    }

    /// Returns the vocabulary size (number of merged and byte tokens).
    pub fn vocab_size(&self) -> usize {
        self.state.vocab_size()
    }

    /// Encode text, handling special tokens according to `allowed_special`.
    ///
    /// Allowed special tokens are matched literally and emitted as their
    /// ids; the text around them goes through segmentation → bytes → BPE.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::DisallowedSpecial`] if `allowed_special` is
    /// [`AllowedSpecial::NoneRaise`] and a registered special string occurs
    /// in `text`, or [`EncodeError::RegexMatch`] if splitting fails.
    pub fn encode(
        &self,
        text: &str,
        allowed_special: &AllowedSpecial,
    ) -> Result<Vec<Token>, EncodeError> {
        let pieces = self.special.split(text, allowed_special)?;

        // pre-allocate: on average, BPE compresses text by 30-40%
        let mut all_tokens = Vec::with_capacity(text.len() / 3);
        for piece in pieces {
            match piece.special {
                Some(id) => all_tokens.push(id),
                None => all_tokens.extend(self.encode_ordinary(piece.text)?),
            }
        }

        Ok(all_tokens)
    }

    /// Encode text ignoring special tokens entirely.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::RegexMatch`] if the regex engine fails during
    /// text splitting (e.g. backtracking limit exceeded).
    pub fn encode_ordinary(&self, text: &str) -> Result<Vec<Token>, EncodeError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let Some(segmenter) = &self.segmenter else {
            return Ok(self.encode_chunk(text));
        };

        let mut all_tokens = Vec::with_capacity(text.len() / 3);
        for chunk in segmenter.split(text)? {
            all_tokens.extend_from_slice(&self.encode_chunk(chunk));
        }

        Ok(all_tokens)
    }

    /// Encode many texts in parallel using Rayon.
    ///
    /// Results keep the order of `texts`.
    ///
    /// # Errors
    ///
    /// Returns the first error any text produces, or
    /// [`EncodeError::ProgressBarSetup`] if the progress bar template fails
    /// to compile.
    pub fn encode_batch(
        &self,
        texts: &[&str],
        allowed_special: &AllowedSpecial,
        show_progress: bool,
    ) -> Result<Vec<Vec<Token>>, EncodeError> {
        let pb = progress_bar(texts.len() as u64, "Encoding texts", show_progress)
            .map_err(EncodeError::ProgressBarSetup)?;

        texts
            .par_iter()
            .progress_with(pb)
            .map(|text| self.encode(text, allowed_special))
            .collect()
    }

    /// Decodes a token sequence into text, replacing malformed UTF-8 with
    /// U+FFFD.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownToken`] if an id is neither in the
    /// vocabulary nor a registered special token.
    pub fn decode(&self, tokens: &[Token]) -> Result<String, DecodeError> {
        self.decode_with(tokens, ErrorMode::Replace)
    }

    /// Decodes a token sequence into text using the given UTF-8 error mode.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownToken`] if a token ID is not found, or
    /// [`DecodeError::InvalidUtf8`] if the decoded bytes are not valid
    /// UTF-8 (only in `Strict` mode).
    pub fn decode_with(&self, tokens: &[Token], errors: ErrorMode) -> Result<String, DecodeError> {
        let bytes = self.decode_bytes(tokens)?;

        match errors {
            ErrorMode::Strict => String::from_utf8(bytes).map_err(DecodeError::InvalidUtf8),
            ErrorMode::Replace => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    /// Decodes a token sequence into its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownToken`] for the first unknown id.
    pub fn decode_bytes(&self, tokens: &[Token]) -> Result<ByteSeq, DecodeError> {
        let mut result = Vec::with_capacity(tokens.len() * 2);
        for &token in tokens {
            if let Some(bytes) = self.state.token_bytes(token) {
                result.extend_from_slice(bytes);
                continue;
            }

            if let Some(special) = self.special.token(token) {
                result.extend_from_slice(special.as_bytes());
                continue;
            }

            return Err(DecodeError::UnknownToken(token));
        }
        Ok(result)
    }

    /// Decodes multiple token sequences in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first error any sequence produces, or
    /// [`DecodeError::ProgressBarSetup`] if the progress bar template fails
    /// to compile.
    pub fn decode_batch(
        &self,
        token_seqs: &[&[Token]],
        show_progress: bool,
    ) -> Result<Vec<String>, DecodeError> {
        let pb = progress_bar(token_seqs.len() as u64, "Decoding tokens", show_progress)
            .map_err(DecodeError::ProgressBarSetup)?;

        token_seqs
            .par_iter()
            .progress_with(pb)
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Encode one segmented chunk: UTF-8 bytes → BPE merges.
    #[inline]
    fn encode_chunk(&self, chunk: &str) -> Vec<Token> {
        let byte_tokens: Vec<Token> = chunk.bytes().map(Token::from).collect();
        self.state.encode_tokens(byte_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::TokenizerInitError, types::TokenPair};

    fn make_tokenizer(
        merges: Vec<(TokenPair, Token)>,
        pattern: Option<&str>,
    ) -> Result<Tokenizer, TokenizerInitError> {
        let state = TrainedState::from_merges(merges)?;
        let segmenter = pattern.map(Segmenter::new).transpose()?;
        Ok(Tokenizer::new(state, segmenter))
    }

    fn tokenizer(merges: Vec<(TokenPair, Token)>, pattern: Option<&str>) -> Tokenizer {
        match make_tokenizer(merges, pattern) {
            Ok(tok) => tok,
            Err(e) => panic!("tokenizer setup failed: {e}"),
        }
    }

    fn special(entries: &[(&str, Token)]) -> HashMap<String, Token> {
        entries.iter().map(|&(s, id)| (s.to_string(), id)).collect()
    }

    #[test]
    fn test_encode_no_merges() {
        let tok = tokenizer(vec![], Some(r"\S+"));
        let result = tok.encode_ordinary("ab cd").expect("text should be encodable");
        // pattern drops the space
        assert_eq!(result, vec![97, 98, 99, 100]);
    }

    #[test]
    fn test_encode_with_merges() {
        let tok = tokenizer(vec![(TokenPair(97, 98), 256)], Some(r"\S+"));
        let result = tok.encode_ordinary("ab cd").expect("text should be encodable");
        assert_eq!(result, vec![256, 99, 100]);
    }

    #[test]
    fn test_without_segmenter_whole_text_is_one_chunk() {
        let tok = tokenizer(vec![(TokenPair(98, 32), 256)], None);
        assert_eq!(
            tok.encode_ordinary("ab c").expect("text should be encodable"),
            vec![97, 256, 99]
        );

        // With the GPT-4 pattern the space starts a new chunk, so (b, ' ') never forms.
        let tok = tokenizer(vec![(TokenPair(98, 32), 256)], Some(crate::GPT4_SPLIT_PATTERN));
        assert_eq!(
            tok.encode_ordinary("ab c").expect("text should be encodable"),
            vec![97, 98, 32, 99]
        );
    }

    #[test]
    fn test_single_byte_chunk() {
        let tok = tokenizer(vec![(TokenPair(97, 98), 256)], Some(r"."));
        // Each character is its own chunk; no pairs to merge within a chunk
        let result = tok.encode_ordinary("ab").expect("text should be encodable");
        assert_eq!(result, vec![97, 98]);
    }

    #[test]
    fn test_unicode_bytes() {
        // 'é' is U+00E9, encoded as [0xC3, 0xA9] in UTF-8
        let tok = tokenizer(vec![(TokenPair(0xC3, 0xA9), 256)], Some(r"\S+"));
        let result = tok.encode_ordinary("é").expect("text should be encodable");
        assert_eq!(result, vec![256]);
    }

    #[test]
    fn test_empty_text() {
        let tok = tokenizer(vec![], None);
        assert_eq!(
            tok.encode("", &AllowedSpecial::All).expect("text should be encodable"),
            Vec::<Token>::new()
        );
    }

    #[test]
    fn test_special_tokens_all() {
        let tok = tokenizer(vec![(TokenPair(97, 98), 256)], None)
            .with_special_tokens(special(&[("<|special|>", 1000)]));
        let ids = tok
            .encode("ab<|special|>b", &AllowedSpecial::All)
            .expect("text should be encodable");
        assert_eq!(ids, vec![256, 1000, 98]);
    }

    #[test]
    fn test_special_tokens_none_encodes_bytes() {
        let tok = tokenizer(vec![], None).with_special_tokens(special(&[("<|s|>", 1000)]));
        let ids = tok
            .encode("<|s|>", &AllowedSpecial::None)
            .expect("text should be encodable");
        assert_eq!(ids, vec![60, 124, 115, 124, 62]);
    }

    #[test]
    fn test_special_tokens_raise() {
        let tok = tokenizer(vec![], None).with_special_tokens(special(&[("<|s|>", 1000)]));
        let result = tok.encode("x<|s|>", &AllowedSpecial::default());
        assert!(matches!(result, Err(EncodeError::DisallowedSpecial(s)) if s == "<|s|>"));
    }

    #[test]
    fn test_register_replaces_table() {
        let mut tok = tokenizer(vec![], None).with_special_tokens(special(&[("<|a|>", 1000)]));
        tok.register_special_tokens(special(&[("<|b|>", 2000)]));
        assert_eq!(tok.special_tokens().len(), 1);
        assert_eq!(tok.special_tokens().id("<|a|>"), None);
        assert!(matches!(tok.decode(&[1000]), Err(DecodeError::UnknownToken(1000))));
        assert_eq!(tok.decode(&[2000]).expect("token should decode"), "<|b|>");
    }

    #[test]
    fn test_decode_merged_and_special() {
        let tok = tokenizer(vec![(TokenPair(97, 98), 256)], None)
            .with_special_tokens(special(&[("<|eot|>", 1000)]));
        let decoded = tok.decode(&[256, 1000, 99]).expect("tokens should decode");
        assert_eq!(decoded, "ab<|eot|>c");
    }

    #[test]
    fn test_decode_prefers_vocab_over_special() {
        // 256 is both a merged token and a special id; the merge wins.
        let tok = tokenizer(vec![(TokenPair(97, 98), 256)], None)
            .with_special_tokens(special(&[("<|x|>", 256), ("<|y|>", 300)]));
        assert_eq!(tok.decode_bytes(&[256, 300]).expect("tokens should decode"), b"ab<|y|>");
        assert!(matches!(tok.decode_bytes(&[97, 257]), Err(DecodeError::UnknownToken(257))));
    }

    #[test]
    fn test_decode_unknown_token_errors() {
        let tok = tokenizer(vec![(TokenPair(97, 98), 256)], None);
        let result = tok.decode(&[97, 9999]);
        assert!(matches!(result, Err(DecodeError::UnknownToken(9999))));
    }

    #[test]
    fn test_decode_malformed_utf8_is_replaced() {
        let tok = tokenizer(vec![], None);
        assert_eq!(tok.decode(&[0xFF]).expect("bytes should decode"), "\u{FFFD}");
        // truncated 3-byte sequence becomes one marker
        assert_eq!(
            tok.decode(&[104, 0xE2, 0x82, 105]).expect("bytes should decode"),
            "h\u{FFFD}i"
        );
    }

    #[test]
    fn test_decode_strict_rejects_malformed_utf8() {
        let tok = tokenizer(vec![], None);
        let result = tok.decode_with(&[0xFF], ErrorMode::Strict);
        assert!(matches!(result, Err(DecodeError::InvalidUtf8(_))));
        assert_eq!(
            tok.decode_with(&[104, 105], ErrorMode::Strict).expect("bytes should decode"),
            "hi"
        );
    }

    #[test]
    fn test_encode_batch_parallel() {
        let tok = tokenizer(vec![(TokenPair(97, 98), 256)], Some(r"\S+"));
        let results = tok
            .encode_batch(&["ab", "cd", "ab"], &AllowedSpecial::None, false)
            .expect("texts should be batch-encodable");
        assert_eq!(results, vec![vec![256], vec![99, 100], vec![256]]);
    }

    #[test]
    fn test_encode_batch_propagates_errors() {
        let tok = tokenizer(vec![], None).with_special_tokens(special(&[("<|s|>", 1000)]));
        let texts = ["fine", "not <|s|> fine"];
        let result = tok.encode_batch(&texts, &AllowedSpecial::NoneRaise, false);
        assert!(matches!(result, Err(EncodeError::DisallowedSpecial(_))));
    }

    #[test]
    fn test_decode_batch_parallel() {
        let tok = tokenizer(vec![(TokenPair(97, 98), 256)], None);
        let seq1 = vec![256];
        let seq2 = vec![99, 100];
        let token_seqs: Vec<&[Token]> = vec![&seq1, &seq2];
        let decoded = tok
            .decode_batch(&token_seqs, false)
            .expect("token sequences should be batch-decodable");
        assert_eq!(decoded, vec!["ab", "cd"]);
    }

    #[test]
    fn test_vocab_size() {
        let tok = tokenizer(vec![(TokenPair(97, 98), 256), (TokenPair(256, 99), 257)], None);
        assert_eq!(tok.vocab_size(), 258);
    }
}
