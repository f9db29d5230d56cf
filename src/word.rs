//! RFC-2047 encoded words and the `Text` generator/parser (spec §4.D).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_while1},
    combinator::{map, map_res, opt},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use vmime_types::core::{Charset, RecommendedEncoding, Text, Word};

use crate::charset::{Base64Encoder, ContentTransferEncoder, QuotedPrintableEncoder};
use crate::lexical::non_printable_ratio;

/// Threshold at which the generator prefers B- over Q-encoding (spec §4.D,
/// §9: "not specified by an RFC ... one reasonable policy").
const B_ENCODING_THRESHOLD: f64 = 0.4;

fn is_b64_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'+' || c == b'/' || c == b'='
}

/// Decodes RFC-2047 `Q` encoding: `_` is a literal space, `=XX` is a hex
/// escape, everything else passes through.
fn decode_q(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < input.len() => {
                if let Ok(s) = std::str::from_utf8(&input[i + 1..i + 3]) {
                    if let Ok(byte) = u8::from_str_radix(s, 16) {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                }
                out.push(input[i]);
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn encode_q(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for &b in input {
        match b {
            b' ' => out.push(b'_'),
            b'=' | b'?' | b'_' => {
                out.extend_from_slice(format!("={:02X}", b).as_bytes());
            }
            b if (0x21..=0x7e).contains(&b) => out.push(b),
            b => out.extend_from_slice(format!("={:02X}", b).as_bytes()),
        }
    }
    out
}

/// Parses one `=?charset?Q|B?text?=` encoded-word into a [`Word`] (spec
/// §4.D Word.parse). The RFC-2231 `*language` extension is accepted after
/// the charset even though RFC-2047 itself does not define it, matching
/// widely-seen real-world traffic.
pub fn encoded_word(input: &[u8]) -> IResult<&[u8], Word> {
    map_res(
        delimited(
            tag("=?"),
            tuple((
                take_while1(|c: u8| c != b'?' && c != b'*'),
                opt(preceded(tag("*"), take_while1(|c: u8| c != b'?'))),
                preceded(tag("?"), alt((tag("Q"), tag("q"), tag("B"), tag("b")))),
                preceded(tag("?"), take_till1(|c: u8| c == b'?')),
            )),
            tag("?="),
        ),
        |(charset, language, kind, encoded): (&[u8], Option<&[u8]>, &[u8], &[u8])| {
            let charset_name = std::str::from_utf8(charset)
                .map_err(|_| ())?
                .to_string();
            let bytes = match kind {
                b"Q" | b"q" => decode_q(encoded),
                b"B" | b"b" => {
                    if !encoded.iter().all(|&c| is_b64_char(c)) {
                        return Err(());
                    }
                    let enc = Base64Encoder;
                    enc.decode(encoded).map_err(|_| ())?
                }
                _ => return Err(()),
            };
            let mut word = Word::new(bytes, Charset::new(charset_name));
            if let Some(lang) = language {
                word = word.with_language(String::from_utf8_lossy(lang).into_owned());
            }
            Ok::<_, ()>(word)
        },
    )(input)
}

/// Generator state threaded across successive words so encoded/unencoded
/// transitions produce correct whitespace (spec §4.D Text.encodeAndFold).
#[derive(Debug, Default, Clone, Copy)]
struct FoldState {
    is_first_word: bool,
    prev_word_is_encoded: bool,
}

impl FoldState {
    fn new() -> Self {
        Self {
            is_first_word: true,
            prev_word_is_encoded: false,
        }
    }
}

/// Whether `bytes` can be emitted as bare, unencoded ASCII.
fn is_plain_ascii(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| (0x20..=0x7e).contains(&b))
}

/// Chooses Q or B for a word that needs RFC-2047 wrapping (spec §4.D:
/// "B if the payload is >= 40% non-printable or non-ASCII, else Q").
fn choose_encoding(bytes: &[u8], charset: &Charset) -> bool {
    if let Some(RecommendedEncoding::Base64) = charset.recommended_encoding() {
        return true;
    }
    non_printable_ratio(bytes) >= B_ENCODING_THRESHOLD
}

/// Encodes a single [`Word`] for generation, choosing bare ASCII or an
/// RFC-2047 encoded-word.
fn generate_word(word: &Word) -> Vec<u8> {
    if word.charset.is_ascii() && is_plain_ascii(&word.bytes) {
        return word.bytes.clone();
    }

    let use_b64 = choose_encoding(&word.bytes, &word.charset);
    let (kind, payload): (&[u8], Vec<u8>) = if use_b64 {
        (b"B", Base64Encoder.encode(&word.bytes).into_iter().filter(|&b| b != b'\r' && b != b'\n').collect())
    } else {
        (b"Q", encode_q(&word.bytes))
    };

    let mut out = Vec::new();
    out.extend_from_slice(b"=?");
    out.extend_from_slice(word.charset.name().as_bytes());
    if let Some(lang) = &word.language {
        out.push(b'*');
        out.extend_from_slice(lang.as_bytes());
    }
    out.push(b'?');
    out.extend_from_slice(kind);
    out.push(b'?');
    out.extend_from_slice(&payload);
    out.extend_from_slice(b"?=");
    out
}

/// Generates a [`Text`] into `out`, folding between words that would
/// otherwise run the line past `max_line_length` (spec §4.D
/// `Text.encodeAndFold`). Returns the column position after the last byte
/// written.
pub fn encode_and_fold(text: &Text, out: &mut Vec<u8>, max_line_length: usize, mut cur_line_pos: usize) -> usize {
    let mut state = FoldState::new();

    for word in &text.words {
        let needs_encoding = !(word.charset.is_ascii() && is_plain_ascii(&word.bytes));
        let rendered = generate_word(word);

        if !state.is_first_word {
            // RFC-2047 §6.2: adjacent encoded-words must be separated by
            // linear whitespace that decoders discard; if both this word
            // and the previous one are encoded we must still emit that
            // separating space.
            if needs_encoding || state.prev_word_is_encoded {
                out.push(b' ');
                cur_line_pos += 1;
            }
        }

        if cur_line_pos + rendered.len() > max_line_length && !state.is_first_word {
            out.extend_from_slice(b"\r\n ");
            cur_line_pos = 1;
        }

        out.extend_from_slice(&rendered);
        cur_line_pos += rendered.len();

        state.is_first_word = false;
        state.prev_word_is_encoded = needs_encoding;
    }

    cur_line_pos
}

/// Decodes an unstructured header value into a [`Text`], honoring RFC-2047
/// encoded-words wherever they appear and collapsing the mandatory
/// whitespace between two adjacent encoded-words (spec §4.D, §4.G: the
/// factory's fallback parser for any field name).
pub fn decode_unstructured_text(input: &[u8]) -> Text {
    let mut words = Vec::new();
    let mut rest = input;
    let mut prev_encoded = false;

    while !rest.is_empty() {
        if let Ok((after, word)) = encoded_word(rest) {
            words.push(word);
            rest = after;
            prev_encoded = true;
            continue;
        }

        let marker = rest.windows(2).position(|w| w == b"=?").unwrap_or(rest.len());
        let take = marker.max(1).min(rest.len());
        let (chunk, remainder) = rest.split_at(take);

        if prev_encoded
            && !chunk.is_empty()
            && chunk.iter().all(|&b| b == b' ' || b == b'\t')
            && encoded_word(remainder).is_ok()
        {
            rest = remainder;
            continue;
        }

        words.push(Word::ascii(chunk.to_vec()));
        rest = remainder;
        prev_encoded = false;
    }

    Text::new(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_b_encoded_word() {
        let (rest, word) = encoded_word(b"=?UTF-8?B?w6k=?=").unwrap();
        assert!(rest.is_empty());
        assert_eq!(word.to_string_lossy(), "é");
    }

    #[test]
    fn parses_q_encoded_word_with_underscore_space() {
        let (rest, word) = encoded_word(b"=?US-ASCII?Q?Hello_World?=").unwrap();
        assert!(rest.is_empty());
        assert_eq!(word.to_string_lossy(), "Hello World");
    }

    #[test]
    fn adjacent_encoded_words_decode_with_no_intervening_space() {
        // Scenario from spec §8.2.
        let input = b"=?UTF-8?B?w6k=?= =?UTF-8?B?w6A=?=";
        let (mid, first) = encoded_word(input).unwrap();
        let (rest, second) = encoded_word(&mid[1..]).unwrap();
        assert!(rest.is_empty());
        let combined = format!("{}{}", first.to_string_lossy(), second.to_string_lossy());
        assert_eq!(combined, "éà");
    }

    #[test]
    fn generate_word_emits_plain_ascii_unencoded() {
        let w = Word::ascii(b"hello".to_vec());
        assert_eq!(generate_word(&w), b"hello".to_vec());
    }

    #[test]
    fn generate_word_wraps_non_ascii_in_encoded_word() {
        let w = Word::new("é".as_bytes().to_vec(), Charset::new("utf-8"));
        let rendered = generate_word(&w);
        assert!(rendered.starts_with(b"=?utf-8?"));
    }

    #[test]
    fn decode_unstructured_text_mixes_plain_and_encoded_runs() {
        let text = decode_unstructured_text(b"Re: =?UTF-8?B?w6k=?= price list");
        assert_eq!(text.to_string_lossy(), "Re: é price list");
    }

    #[test]
    fn decode_unstructured_text_collapses_space_between_encoded_words() {
        let text = decode_unstructured_text(b"=?UTF-8?B?w6k=?= =?UTF-8?B?w6A=?=");
        assert_eq!(text.to_string_lossy(), "éà");
    }
}
