//! Pattern-based pre-segmentation of text into merge-isolated chunks.

use fancy_regex::Regex;

use crate::error::{EncodeError, TokenizerInitError};

/// GPT-4 style split pattern.
///
/// Alternatives in priority order: contractions, letter runs with one optional
/// leading non-letter/non-digit, digit runs of at most 3, punctuation runs with
/// trailing newlines, whitespace ending in a newline, trailing whitespace, and
/// any remaining whitespace run.
pub const GPT4_SPLIT_PATTERN: &str = r"'(?i:[sdmt]|ll|ve|re)|[^\r\n\p{L}\p{N}]?+\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]++[\r\n]*|\s*[\r\n]|\s+(?!\S)|\s+";

/// Splits text into chunks that merges never cross.
#[derive(Debug, Clone)]
pub struct Segmenter {
    pattern: Regex,
}

impl Segmenter {
    /// Compiles an alternate rule set.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerInitError::InvalidPattern`] if `pattern` fails to compile.
    pub fn new(pattern: &str) -> Result<Self, TokenizerInitError> {
        let pattern = Regex::new(pattern)?;
        Ok(Self { pattern })
    }

    /// Segmenter using [`GPT4_SPLIT_PATTERN`].
    pub fn gpt4() -> Result<Self, TokenizerInitError> {
        Self::new(GPT4_SPLIT_PATTERN)
    }

    /// Returns the source of the compiled pattern.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Splits `text` into chunks in order of appearance.
    ///
    /// With [`GPT4_SPLIT_PATTERN`] the chunks concatenate back to `text`.
    /// Empty matches are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::RegexMatch`] if the regex engine fails during
    /// matching (e.g. backtracking limit exceeded).
    pub fn split<'t>(&self, text: &'t str) -> Result<Vec<&'t str>, EncodeError> {
        let mut chunks = Vec::new();

        for mat in self.pattern.find_iter(text) {
            let m = mat.map_err(|e| EncodeError::RegexMatch(e.to_string()))?;
            if m.as_str().is_empty() {
                continue;
            }
            chunks.push(m.as_str());
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpt4() -> Segmenter {
        match Segmenter::gpt4() {
            Ok(s) => s,
            Err(e) => panic!("pattern failed to compile: {e}"),
        }
    }

    fn split(text: &str) -> Vec<&str> {
        gpt4().split(text).expect("text should be splittable")
    }

    #[test]
    fn test_words_take_leading_space() {
        assert_eq!(split("Hello world"), vec!["Hello", " world"]);
    }

    #[test]
    fn test_contractions() {
        assert_eq!(split("it'sok"), vec!["it", "'s", "ok"]);
        assert_eq!(split("they'LL"), vec!["they", "'LL"]);
        assert_eq!(split("we've"), vec!["we", "'ve"]);
    }

    #[test]
    fn test_letter_run_takes_one_leading_symbol() {
        assert_eq!(split("(hello"), vec!["(hello"]);
        assert_eq!(split("#tag!x"), vec!["#tag", "!x"]);
        assert_eq!(split("¿Qué"), vec!["¿Qué"]);
        // The space is consumed as the prefix and never given back, so the
        // punctuation rule takes " $" instead.
        assert_eq!(split("say $x"), vec!["say", " $", "x"]);
        // Line breaks never prefix a word.
        assert_eq!(split("a\nhello"), vec!["a", "\n", "hello"]);
        assert_eq!(split("a\r\nhello"), vec!["a", "\r\n", "hello"]);
    }

    #[test]
    fn test_digit_groups_of_three() {
        assert_eq!(split("12345"), vec!["123", "45"]);
        assert_eq!(split("1234567"), vec!["123", "456", "7"]);
        assert_eq!(split("ab12"), vec!["ab", "12"]);
    }

    #[test]
    fn test_punctuation_keeps_trailing_newlines() {
        assert_eq!(split("hi!!!\n\n"), vec!["hi", "!!!\n\n"]);
        assert_eq!(split("a ,b"), vec!["a", " ,", "b"]);
    }

    #[test]
    fn test_whitespace_rules() {
        // Last space stays with the following word.
        assert_eq!(split("a   b"), vec!["a", "  ", " b"]);
        // Whitespace ending in a newline.
        assert_eq!(split("hello\n\nworld"), vec!["hello", "\n\n", "world"]);
        // Trailing whitespace.
        assert_eq!(split("a  "), vec!["a", "  "]);
    }

    #[test]
    fn test_covers_entire_input() {
        let text = "Hello, world! It's 2024...\n\n  Numbers: 1234567 ok?\t\r\n end  ";
        assert_eq!(split(text).concat(), text);

        let text = "héllo wörld 你好 🙂🙂 \u{00a0}x";
        assert_eq!(split(text).concat(), text);
    }

    #[test]
    fn test_empty_text() {
        assert!(split("").is_empty());
    }

    #[test]
    fn test_custom_pattern() {
        let seg = Segmenter::new(r"\S+").expect("pattern should compile");
        assert_eq!(seg.pattern(), r"\S+");
        assert_eq!(
            seg.split("ab cd").expect("text should be splittable"),
            vec!["ab", "cd"]
        );
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            Segmenter::new("(unclosed"),
            Err(TokenizerInitError::InvalidPattern(_))
        ));
    }
}
