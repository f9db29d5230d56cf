//! Charset conversion and content-transfer-encoding transcoders (spec §4.C).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use vmime_types::core::Charset;
use vmime_types::encoding::EncodingName;
use vmime_types::error::VmimeError;

/// External collaborator converting bytes between charsets (spec §6
/// "Charset library"). The crate ships [`IdentityConverter`] for
/// ASCII/UTF-8 and, under `full_encoding`, an `encoding_rs`-backed
/// converter; callers may plug in anything else.
pub trait CharsetConverter {
    fn convert(&self, input: &[u8], from: &Charset, to: &Charset) -> Result<Vec<u8>, VmimeError>;
}

/// Handles only the no-op ASCII/UTF-8 ⟷ UTF-8 cases; anything else is
/// rejected. Always available, with no optional dependency.
#[derive(Debug, Default)]
pub struct IdentityConverter;

impl CharsetConverter for IdentityConverter {
    fn convert(&self, input: &[u8], from: &Charset, to: &Charset) -> Result<Vec<u8>, VmimeError> {
        if (from.is_ascii() || from.is_utf8()) && to.is_utf8() {
            return Ok(input.to_vec());
        }
        Err(VmimeError::EncodingNotSupported(format!(
            "cannot convert {from} to {to} without the full_encoding feature"
        )))
    }
}

#[cfg(feature = "full_encoding")]
#[derive(Debug, Default)]
pub struct EncodingRsConverter;

#[cfg(feature = "full_encoding")]
impl CharsetConverter for EncodingRsConverter {
    fn convert(&self, input: &[u8], from: &Charset, to: &Charset) -> Result<Vec<u8>, VmimeError> {
        let from_enc = encoding_rs::Encoding::for_label(from.name().as_bytes())
            .ok_or_else(|| VmimeError::EncodingNotSupported(from.name().to_string()))?;
        let to_enc = encoding_rs::Encoding::for_label(to.name().as_bytes())
            .ok_or_else(|| VmimeError::EncodingNotSupported(to.name().to_string()))?;

        let (decoded, _, had_errors) = from_enc.decode(input);
        if had_errors {
            log::debug!("lossy decode from {from}, some bytes replaced");
        }
        let (encoded, _, had_errors) = to_enc.encode(&decoded);
        if had_errors {
            log::debug!("lossy encode to {to}, some bytes replaced");
        }
        Ok(encoded.into_owned())
    }
}

/// Content-transfer-encoding byte pumps (spec §4.C Encoder).
pub trait ContentTransferEncoder {
    fn encode(&self, input: &[u8]) -> Vec<u8>;
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, VmimeError>;
}

/// 7bit/8bit/binary: identity copy.
#[derive(Debug, Default)]
pub struct IdentityEncoder;

impl ContentTransferEncoder for IdentityEncoder {
    fn encode(&self, input: &[u8]) -> Vec<u8> {
        input.to_vec()
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, VmimeError> {
        Ok(input.to_vec())
    }
}

const BASE64_LINE_LENGTH: usize = 76;

/// RFC-2045 §6.8: base64, wrapped at 76 characters with CRLF between lines.
#[derive(Debug, Default)]
pub struct Base64Encoder;

impl ContentTransferEncoder for Base64Encoder {
    fn encode(&self, input: &[u8]) -> Vec<u8> {
        let encoded = STANDARD.encode(input);
        let mut out = Vec::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2);
        for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
            out.extend_from_slice(chunk);
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, VmimeError> {
        let stripped: Vec<u8> = input
            .iter()
            .copied()
            .filter(|b| !matches!(b, b'\r' | b'\n'))
            .collect();
        STANDARD
            .decode(stripped)
            .map_err(|e| VmimeError::DecodingFailed(e.to_string()))
    }
}

const QP_LINE_LENGTH: usize = 76;

/// RFC-2045 §6.7: quoted-printable.
#[derive(Debug, Default)]
pub struct QuotedPrintableEncoder;

impl ContentTransferEncoder for QuotedPrintableEncoder {
    fn encode(&self, input: &[u8]) -> Vec<u8> {
        fn push_soft_break(out: &mut Vec<u8>, line_len: &mut usize) {
            out.extend_from_slice(b"=\r\n");
            *line_len = 0;
        }

        // RFC-2045 §6.7: a space/tab immediately before a line break (or at
        // end of input) must be `=XX`-escaped, since it would otherwise be
        // invisible or stripped in transit.
        fn emit(out: &mut Vec<u8>, line_len: &mut usize, b: u8, force_escape: bool) {
            let needs_escape = force_escape || b == b'=' || (!(0x20..=0x7e).contains(&b) && b != b'\t');
            let encoded_len = if needs_escape { 3 } else { 1 };

            if *line_len + encoded_len > QP_LINE_LENGTH - 1 {
                push_soft_break(out, line_len);
            }

            if needs_escape {
                out.extend_from_slice(format!("={:02X}", b).as_bytes());
                *line_len += 3;
            } else {
                out.push(b);
                *line_len += 1;
            }
        }

        let mut out = Vec::with_capacity(input.len());
        let mut line_len = 0usize;
        let mut pending_ws: Option<u8> = None;

        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            if b == b'\r' && input.get(i + 1) == Some(&b'\n') {
                if let Some(ws) = pending_ws.take() {
                    emit(&mut out, &mut line_len, ws, true);
                }
                out.extend_from_slice(b"\r\n");
                line_len = 0;
                i += 2;
                continue;
            }
            if b == b'\n' {
                if let Some(ws) = pending_ws.take() {
                    emit(&mut out, &mut line_len, ws, true);
                }
                out.extend_from_slice(b"\r\n");
                line_len = 0;
                i += 1;
                continue;
            }

            if b == b' ' || b == b'\t' {
                if let Some(ws) = pending_ws.take() {
                    emit(&mut out, &mut line_len, ws, false);
                }
                pending_ws = Some(b);
                i += 1;
                continue;
            }

            if let Some(ws) = pending_ws.take() {
                emit(&mut out, &mut line_len, ws, false);
            }
            emit(&mut out, &mut line_len, b, false);
            i += 1;
        }
        if let Some(ws) = pending_ws.take() {
            emit(&mut out, &mut line_len, ws, true);
        }
        out
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, VmimeError> {
        let mut out = Vec::with_capacity(input.len());
        let mut i = 0;
        while i < input.len() {
            match input[i] {
                b'=' if input.get(i + 1) == Some(&b'\r') && input.get(i + 2) == Some(&b'\n') => {
                    // Soft line break: drop it.
                    i += 3;
                }
                b'=' if input.get(i + 1) == Some(&b'\n') => {
                    i += 2;
                }
                b'=' => {
                    let hex = input
                        .get(i + 1..i + 3)
                        .ok_or_else(|| VmimeError::DecodingFailed("truncated =XX escape".into()))?;
                    let hex_str = std::str::from_utf8(hex)
                        .map_err(|_| VmimeError::DecodingFailed("non-ASCII =XX escape".into()))?;
                    let byte = u8::from_str_radix(hex_str, 16)
                        .map_err(|_| VmimeError::DecodingFailed("bad =XX escape".into()))?;
                    out.push(byte);
                    i += 3;
                }
                b => {
                    out.push(b);
                    i += 1;
                }
            }
        }
        Ok(out)
    }
}

const UUENCODE_LINE_LENGTH: usize = 45;

fn uu_char(b: u8) -> u8 {
    if b == 0 {
        b'`'
    } else {
        (b & 0x3f) + 0x20
    }
}

fn uu_value(c: u8) -> u8 {
    (c.wrapping_sub(0x20)) & 0x3f
}

/// Legacy uuencode, 45-byte lines.
#[derive(Debug, Default)]
pub struct UuEncoder;

impl ContentTransferEncoder for UuEncoder {
    fn encode(&self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in input.chunks(UUENCODE_LINE_LENGTH) {
            out.push(uu_char(chunk.len() as u8));
            for group in chunk.chunks(3) {
                let b0 = group[0];
                let b1 = *group.get(1).unwrap_or(&0);
                let b2 = *group.get(2).unwrap_or(&0);
                out.push(uu_char(b0 >> 2));
                out.push(uu_char(((b0 << 4) | (b1 >> 4)) & 0x3f));
                out.push(uu_char(((b1 << 2) | (b2 >> 6)) & 0x3f));
                out.push(uu_char(b2 & 0x3f));
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"`\r\n");
        out
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, VmimeError> {
        let mut out = Vec::new();
        for line in input.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            let count = uu_value(line[0]) as usize;
            if count == 0 {
                break;
            }
            let body = &line[1..];
            let mut produced = 0;
            for group in body.chunks(4) {
                if group.len() < 4 || produced >= count {
                    break;
                }
                let (c0, c1, c2, c3) = (
                    uu_value(group[0]),
                    uu_value(group[1]),
                    uu_value(group[2]),
                    uu_value(group[3]),
                );
                let bytes = [
                    (c0 << 2) | (c1 >> 4),
                    (c1 << 4) | (c2 >> 2),
                    (c2 << 6) | c3,
                ];
                for &b in bytes.iter().take(count - produced) {
                    out.push(b);
                    produced += 1;
                }
            }
        }
        Ok(out)
    }
}

/// Resolves an [`EncodingName`] to its transcoder.
pub fn encoder_for(name: &EncodingName) -> Box<dyn ContentTransferEncoder> {
    match name {
        EncodingName::SevenBit | EncodingName::EightBit | EncodingName::Binary => {
            Box::new(IdentityEncoder)
        }
        EncodingName::Base64 => Box::new(Base64Encoder),
        EncodingName::QuotedPrintable => Box::new(QuotedPrintableEncoder),
        EncodingName::UuEncode => Box::new(UuEncoder),
        EncodingName::Other(_) => Box::new(IdentityEncoder),
    }
}

/// Picks the preferred content-transfer-encoding for `data`, optionally
/// informed by a declared `charset` (spec §4.C Encoding::decide): binary
/// for raw 8-bit payloads with no declared charset, quoted-printable for
/// mostly-ASCII text, base64 otherwise.
pub fn decide_encoding(data: &[u8], charset: Option<&Charset>) -> EncodingName {
    let has_high_bytes = data.iter().any(|&b| b >= 0x80);
    if !has_high_bytes {
        return EncodingName::SevenBit;
    }
    if charset.is_none() {
        return EncodingName::Binary;
    }
    let ratio = crate::lexical::non_printable_ratio(data);
    if ratio < 0.3 {
        EncodingName::QuotedPrintable
    } else {
        EncodingName::Base64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trips() {
        let enc = Base64Encoder;
        let data = b"the quick brown fox jumps over the lazy dog, repeated to force line wrapping";
        let encoded = enc.encode(data);
        assert!(encoded.windows(2).any(|w| w == b"\r\n"));
        let decoded = enc.decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn quoted_printable_round_trips_and_escapes_equals() {
        let enc = QuotedPrintableEncoder;
        let data = b"100% = ok\xe9";
        let encoded = enc.encode(data);
        assert!(encoded.windows(2).any(|w| w == b"=3"));
        let decoded = enc.decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn quoted_printable_escapes_trailing_whitespace_before_a_line_break() {
        let enc = QuotedPrintableEncoder;
        let data = b"trailing space \r\nand a tab\t\r\n";
        let encoded = enc.encode(data);
        assert!(encoded.windows(3).any(|w| w == b"=20"));
        assert!(encoded.windows(3).any(|w| w == b"=09"));
        let decoded = enc.decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn quoted_printable_escapes_trailing_whitespace_at_end_of_input() {
        let enc = QuotedPrintableEncoder;
        let data = b"no trailing break ";
        let encoded = enc.encode(data);
        assert!(encoded.ends_with(b"=20"));
        let decoded = enc.decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn uuencode_round_trips() {
        let enc = UuEncoder;
        let data = b"Hello, uuencoded world!";
        let encoded = enc.encode(data);
        let decoded = enc.decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn decide_encoding_picks_sevenbit_for_plain_ascii() {
        assert_eq!(decide_encoding(b"hello", None), EncodingName::SevenBit);
    }

    #[test]
    fn decide_encoding_picks_binary_for_undeclared_high_bytes() {
        assert_eq!(decide_encoding(&[0xff, 0xfe], None), EncodingName::Binary);
    }
}
