//! Tokenizer implementation for intent parsing.
//!
//! Splits a sentence into lowercase significant units. Alphabetic runs,
//! the hyphen, and the brace characters `{`/`}` extend the current token,
//! so brace-delimited placeholders like `{place}` survive as single
//! tokens. Whitespace and the sentence punctuation `.`, `!`, `?` act as
//! separators and are discarded; any other character is emitted as its
//! own single-character token.
//!
//! # Examples
//!
//! ```
//! use parlance::analysis::tokenize;
//!
//! assert_eq!(tokenize("one two three"), vec!["one", "two", "three"]);
//! assert_eq!(tokenize("word {ent}"), vec!["word", "{ent}"]);
//! assert_eq!(tokenize("test:"), vec!["test", ":"]);
//! ```

/// Returns true for characters that extend the current token.
fn extends_token(c: char) -> bool {
    c.is_alphabetic() || c == '-' || c == '{' || c == '}'
}

/// Convert a sentence into a list of individual significant units.
///
/// Deterministic: identical input always yields identical output.
pub fn tokenize(sentence: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in sentence.char_indices() {
        if extends_token(c) {
            if start.is_none() {
                start = Some(i);
            }
        } else {
            if let Some(s) = start.take() {
                tokens.push(sentence[s..i].to_lowercase());
            }
            if !c.is_whitespace() && !matches!(c, '.' | '!' | '?') {
                tokens.push(c.to_lowercase().to_string());
            }
        }
    }
    if let Some(s) = start {
        tokens.push(sentence[s..].to_lowercase());
    }

    tokens
}

/// Join a token sequence back into a displayable sentence.
///
/// For sentences without ambiguous punctuation, `tokenize(detokenize(t))`
/// reproduces the original token sequence.
pub fn detokenize(tokens: &[String]) -> String {
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_tokenize_words() {
        assert_eq!(tokenize("one two three"), toks(&["one", "two", "three"]));
    }

    #[test]
    fn test_tokenize_placeholder() {
        assert_eq!(tokenize("word {ent}"), toks(&["word", "{ent}"]));
    }

    #[test]
    fn test_tokenize_punctuation() {
        assert_eq!(tokenize("test:"), toks(&["test", ":"]));
        // Sentence punctuation is discarded entirely.
        assert_eq!(tokenize("hello!"), toks(&["hello"]));
        assert_eq!(tokenize("is this it?"), toks(&["is", "this", "it"]));
    }

    #[test]
    fn test_tokenize_lowercases() {
        assert_eq!(tokenize("Drive To THE Lake"), toks(&["drive", "to", "the", "lake"]));
    }

    #[test]
    fn test_tokenize_hyphen_extends() {
        assert_eq!(tokenize("ice-cream {nav-place}"), toks(&["ice-cream", "{nav-place}"]));
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("...").is_empty());
    }

    #[test]
    fn test_detokenize_round_trip() {
        let original = tokenize("drive me to the lake");
        let rebuilt = tokenize(&detokenize(&original));
        assert_eq!(original, rebuilt);

        let with_symbol = tokenize("meet at 5 : 30");
        assert_eq!(tokenize(&detokenize(&with_symbol)), with_symbol);
    }
}
