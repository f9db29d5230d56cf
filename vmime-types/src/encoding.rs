//! The `Encoding` value type (spec §4.C): a content-transfer-encoding name
//! plus optional parameters. The transcoders themselves (the actual
//! encode/decode byte pumps) live in `vmime_codec::charset`, since this
//! crate holds data, not algorithms.

use std::collections::BTreeMap;
use std::fmt;

/// One of the well-known content-transfer-encodings, or an unrecognized
/// token carried verbatim for round-tripping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EncodingName {
    SevenBit,
    EightBit,
    Binary,
    Base64,
    QuotedPrintable,
    UuEncode,
    Other(String),
}

impl EncodingName {
    pub const SEVEN_BIT: &'static str = "7bit";
    pub const EIGHT_BIT: &'static str = "8bit";
    pub const BINARY: &'static str = "binary";
    pub const BASE64: &'static str = "base64";
    pub const QUOTED_PRINTABLE: &'static str = "quoted-printable";
    pub const UUENCODE: &'static str = "x-uuencode";

    pub fn as_str(&self) -> &str {
        match self {
            Self::SevenBit => Self::SEVEN_BIT,
            Self::EightBit => Self::EIGHT_BIT,
            Self::Binary => Self::BINARY,
            Self::Base64 => Self::BASE64,
            Self::QuotedPrintable => Self::QUOTED_PRINTABLE,
            Self::UuEncode => Self::UUENCODE,
            Self::Other(s) => s,
        }
    }

    /// Whether this encoding is the identity transform over the whole
    /// stream (7bit/8bit/binary never transform bytes, only assert a
    /// property the sender claims is already true).
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit | Self::Binary)
    }
}

impl From<&str> for EncodingName {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case(Self::SEVEN_BIT) {
            Self::SevenBit
        } else if value.eq_ignore_ascii_case(Self::EIGHT_BIT) {
            Self::EightBit
        } else if value.eq_ignore_ascii_case(Self::BINARY) {
            Self::Binary
        } else if value.eq_ignore_ascii_case(Self::BASE64) {
            Self::Base64
        } else if value.eq_ignore_ascii_case(Self::QUOTED_PRINTABLE) {
            Self::QuotedPrintable
        } else if value.eq_ignore_ascii_case(Self::UUENCODE)
            || value.eq_ignore_ascii_case("uuencode")
        {
            Self::UuEncode
        } else {
            Self::Other(value.to_string())
        }
    }
}

impl fmt::Display for EncodingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `(name, params?)` (spec §4.C Encoding value).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Encoding {
    pub name: Option<EncodingName>,
    pub params: BTreeMap<String, String>,
}

impl Encoding {
    pub fn new(name: EncodingName) -> Self {
        Self {
            name: Some(name),
            params: BTreeMap::new(),
        }
    }
}

impl From<EncodingName> for Encoding {
    fn from(value: EncodingName) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_str() {
        for n in ["7bit", "BASE64", "Quoted-Printable", "x-custom"] {
            let parsed = EncodingName::from(n);
            if let EncodingName::Other(s) = &parsed {
                assert_eq!(s, n);
            } else {
                assert!(parsed.as_str().eq_ignore_ascii_case(n));
            }
        }
    }

    #[test]
    fn identity_encodings_are_recognized() {
        assert!(EncodingName::SevenBit.is_identity());
        assert!(!EncodingName::Base64.is_identity());
    }
}
