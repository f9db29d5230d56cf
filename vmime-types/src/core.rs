//! Core value types: byte charsets and the word/text model (spec §4.C, §4.D).

use std::borrow::Cow;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An IANA charset name. Equality and hashing are case-insensitive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Charset(String);

impl Charset {
    pub const US_ASCII: &'static str = "us-ascii";
    pub const UTF_8: &'static str = "utf-8";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_ascii(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::US_ASCII) || self.0.eq_ignore_ascii_case("ascii")
    }

    pub fn is_utf8(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::UTF_8)
    }

    /// Whether a non-identity transfer encoding should always be applied for
    /// this charset and, if so, which one ("Q" or "B").
    pub fn recommended_encoding(&self) -> Option<RecommendedEncoding> {
        if self.is_ascii() {
            None
        } else if self.is_utf8() {
            Some(RecommendedEncoding::QuotedPrintable)
        } else {
            Some(RecommendedEncoding::Base64)
        }
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::new(Self::US_ASCII)
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}
impl Eq for Charset {}

impl std::hash::Hash for Charset {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Charset {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Charset {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedEncoding {
    QuotedPrintable,
    Base64,
}

/// An atom of `(bytes, charset, language?)` (spec §3 Word).
///
/// `bytes` are to be interpreted in `charset`. `language` is only ever set by
/// RFC-2231 parameter parsing. An empty word is allowed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Word {
    pub bytes: Vec<u8>,
    pub charset: Charset,
    pub language: Option<String>,
}

impl Word {
    pub fn new(bytes: impl Into<Vec<u8>>, charset: impl Into<Charset>) -> Self {
        Self {
            bytes: bytes.into(),
            charset: charset.into(),
            language: None,
        }
    }

    pub fn ascii(text: impl Into<Vec<u8>>) -> Self {
        Self::new(text, Charset::new(Charset::US_ASCII))
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Best-effort decode into a Rust `String` assuming the `bytes` are
    /// already known to be valid UTF-8 or ASCII. Charset transcoding of
    /// arbitrary charsets is the `CharsetConverter` collaborator's job
    /// (see `vmime_codec::charset`).
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// An ordered sequence of [`Word`]s (spec §3 Text). Adjacency is preserved so
/// that the generator can reproduce correct whitespace when emitting multiple
/// encoded-words in a row. An empty text is permitted.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Text {
    pub words: Vec<Word>,
}

impl Text {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    pub fn from_ascii(text: impl Into<String>) -> Self {
        Self::new(vec![Word::ascii(text.into().into_bytes())])
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() || self.words.iter().all(|w| w.bytes.is_empty())
    }

    /// Concatenates all words' decoded bytes, joining adjacent words with no
    /// inserted whitespace (the parser is responsible for folding any
    /// whitespace between words into a `Word` of its own).
    pub fn to_string_lossy(&self) -> String {
        self.words
            .iter()
            .map(|w| w.to_string_lossy())
            .collect::<Vec<_>>()
            .join("")
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Self::from_ascii(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_equality_is_case_insensitive() {
        assert_eq!(Charset::new("UTF-8"), Charset::new("utf-8"));
        assert_ne!(Charset::new("UTF-8"), Charset::new("iso-8859-1"));
    }

    #[test]
    fn recommended_encoding_matches_spec_table() {
        assert_eq!(Charset::new("us-ascii").recommended_encoding(), None);
        assert_eq!(
            Charset::new("utf-8").recommended_encoding(),
            Some(RecommendedEncoding::QuotedPrintable)
        );
        assert_eq!(
            Charset::new("iso-2022-jp").recommended_encoding(),
            Some(RecommendedEncoding::Base64)
        );
    }

    #[test]
    fn empty_word_and_text_are_allowed() {
        let w = Word::default();
        assert!(w.bytes.is_empty());
        let t = Text::default();
        assert!(t.is_empty());
    }
}
