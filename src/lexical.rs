//! ASCII class predicates and folding-whitespace/quoting rules shared by
//! every parser and generator in this crate (spec §4.A).
//!
//! Every function here is pure and operates byte-at-a-time; none of them
//! allocate or look beyond the single byte/slice given.

/// SP or HTAB.
pub fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Folding whitespace per RFC-5322 §3.2.2: SP, HTAB, CR or LF.
pub fn is_whitespace_crlf(b: u8) -> bool {
    is_space(b) || b == b'\r' || b == b'\n'
}

pub fn is_ascii(b: u8) -> bool {
    b < 128
}

/// Printable, non-control ASCII (0x20..=0x7e).
pub fn is_print(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}

pub fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

pub fn is_alpha(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

/// MIME `tspecials` (RFC-2045 §5.1): `()<>@,;:\"/[]?=`.
pub fn is_tspecial(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')'
            | b'<'
            | b'>'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'\\'
            | b'"'
            | b'/'
            | b'['
            | b']'
            | b'?'
            | b'='
    )
}

/// A MIME `token` byte: printable ASCII, not a tspecial, not a space.
pub fn is_token_char(b: u8) -> bool {
    is_print(b) && !is_tspecial(b) && !is_space(b)
}

/// ASCII-only case-fold to lower; non-ASCII bytes pass through unchanged.
pub fn ascii_to_lower(b: u8) -> u8 {
    b.to_ascii_lowercase()
}

/// The fraction (0.0..=1.0) of `bytes` that are non-printable or non-ASCII,
/// used by the RFC-2047 Q-vs-B heuristic (spec §4.D).
pub fn non_printable_ratio(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let bad = bytes.iter().filter(|&&b| !is_ascii(b) || !is_print(b) && b != b'\t').count();
    bad as f64 / bytes.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tspecials_match_rfc2045() {
        for b in b"()<>@,;:\\\"/[]?=" {
            assert!(is_tspecial(*b), "{} should be tspecial", *b as char);
        }
        assert!(!is_tspecial(b'a'));
    }

    #[test]
    fn non_printable_ratio_is_zero_for_plain_ascii() {
        assert_eq!(non_printable_ratio(b"hello world"), 0.0);
    }

    #[test]
    fn non_printable_ratio_counts_high_bytes() {
        let bytes = [0xe9, 0xe9, b'a', b'b'];
        assert_eq!(non_printable_ratio(&bytes), 0.5);
    }
}
