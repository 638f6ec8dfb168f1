//! Merge application over a single token sequence.

use crate::types::{Token, TokenPair};

/// Replaces every non-overlapping occurrence of `pair` in `tokens` with `new_tok`.
///
/// Scans left to right: a match consumes both positions, so `[a, a, a]`
/// merged on `(a, a)` yields `[new_tok, a]`. The input is left untouched.
pub fn merge(tokens: &[Token], pair: TokenPair, new_tok: Token) -> Vec<Token> {
    let n = tokens.len();
    let mut out = Vec::with_capacity(n);

    let mut i = 0;
    while i < n {
        if i + 1 < n && tokens[i] == pair.0 && tokens[i + 1] == pair.1 {
            out.push(new_tok);
            // skip both halves of the pair
            i += 2;
        } else {
            out.push(tokens[i]);
            i += 1;
        }
    }

    out
}
