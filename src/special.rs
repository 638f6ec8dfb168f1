//! Special-token table and the allowed-special policy.
//!
//! Special tokens are literal strings with caller-assigned ids. Before
//! ordinary encoding, text is cut around the allowed special strings and
//! each match is emitted as its id without going through merge logic.

use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
};

use fancy_regex::Regex;

use crate::{error::EncodeError, types::Token};

/// Which registered special tokens may appear in encoded text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowedSpecial {
    /// Every registered special token is recognized.
    All,
    /// Special strings are encoded as ordinary text.
    None,
    /// Like [`AllowedSpecial::None`], but fail if any registered special
    /// string occurs in the text.
    #[default]
    NoneRaise,
    /// Only the listed strings are recognized; unregistered names are ignored.
    Custom(HashSet<String>),
}

impl FromStr for AllowedSpecial {
    type Err = EncodeError;

    /// Parses "all", "none" or "none_raise".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "none" => Ok(Self::None),
            "none_raise" => Ok(Self::NoneRaise),
            _ => Err(EncodeError::UnknownPolicy(s.to_string())),
        }
    }
}

/// One piece of text after special-token splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece<'t> {
    pub text: &'t str,
    /// Id of the special token, `None` for ordinary text.
    pub special: Option<Token>,
}

impl<'t> Piece<'t> {
    pub(crate) fn ordinary(text: &'t str) -> Self {
        Self {
            text,
            special: None,
        }
    }

    pub fn is_special(&self) -> bool {
        self.special.is_some()
    }
}

/// Bidirectional mapping between special strings and their ids.
#[derive(Debug, Clone, Default)]
pub struct SpecialTokens {
    encoder: HashMap<String, Token>,
    decoder: HashMap<Token, String>,
}

impl SpecialTokens {
    pub fn new(tokens: HashMap<String, Token>) -> Self {
        let decoder = tokens.iter().map(|(s, &id)| (id, s.clone())).collect();
        Self {
            encoder: tokens,
            decoder,
        }
    }

    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Id registered for `token`.
    pub fn id(&self, token: &str) -> Option<Token> {
        self.encoder.get(token).copied()
    }

    /// Literal string registered for `id`.
    pub fn token(&self, id: Token) -> Option<&str> {
        self.decoder.get(&id).map(String::as_str)
    }

    /// Iterates `(string, id)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Token)> {
        self.encoder.iter().map(|(s, &id)| (s.as_str(), id))
    }

    /// Splits `text` into ordinary and special pieces according to `allowed`.
    ///
    /// The pieces concatenate back to `text`. Non-special pieces are never
    /// empty unless `text` itself is empty and no special token is active,
    /// in which case the single piece is the whole (empty) text.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::DisallowedSpecial`] under
    /// [`AllowedSpecial::NoneRaise`] when a registered special string occurs
    /// anywhere in `text`, or [`EncodeError::RegexMatch`] if matching fails.
    pub fn split<'t>(
        &self,
        text: &'t str,
        allowed: &AllowedSpecial,
    ) -> Result<Vec<Piece<'t>>, EncodeError> {
        let active: HashMap<&str, Token> = match allowed {
            AllowedSpecial::None => HashMap::new(),
            AllowedSpecial::NoneRaise => {
                if let Some(found) = self.find_any(text) {
                    return Err(EncodeError::DisallowedSpecial(found.to_string()));
                }
                HashMap::new()
            }
            AllowedSpecial::All => self.iter().collect(),
            AllowedSpecial::Custom(subset) => self
                .iter()
                .filter(|(s, _)| subset.contains(*s))
                .collect(),
        };

        if active.is_empty() {
            return Ok(vec![Piece::ordinary(text)]);
        }

        Self::split_on(text, &active)
    }

    /// First registered special string (longest first, then lexicographic)
    /// that occurs in `text`.
    fn find_any(&self, text: &str) -> Option<&str> {
        let mut tokens: Vec<&str> = self.encoder.keys().map(String::as_str).collect();
        sort_longest_first(&mut tokens);
        tokens.into_iter().find(|t| text.contains(t))
    }

    fn split_on<'t>(
        text: &'t str,
        active: &HashMap<&str, Token>,
    ) -> Result<Vec<Piece<'t>>, EncodeError> {
        // escape regex metachars in special tokens to avoid
        // undesired pattern match behavior. longer literals go first so
        // that the longest candidate wins at a given position.
        let mut literals: Vec<&str> = active.keys().copied().collect();
        sort_longest_first(&mut literals);
        let pattern = literals
            .iter()
            .map(|s| fancy_regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");

        let re = Regex::new(&pattern).map_err(|e| EncodeError::RegexMatch(e.to_string()))?;

        let mut pieces = Vec::new();
        let mut piece_start = 0;

        for mat in re.find_iter(text) {
            let mat = mat.map_err(|e| EncodeError::RegexMatch(e.to_string()))?;

            // no empty ordinary pieces between adjacent special tokens
            if mat.start() > piece_start {
                pieces.push(Piece::ordinary(&text[piece_start..mat.start()]));
            }
            let special = mat.as_str();
            pieces.push(Piece {
                text: special,
                special: active.get(special).copied(),
            });
            piece_start = mat.end();
        }
        if piece_start < text.len() {
            pieces.push(Piece::ordinary(&text[piece_start..]));
        }

        Ok(pieces)
    }
}

fn sort_longest_first(tokens: &mut [&str]) {
    tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
}
