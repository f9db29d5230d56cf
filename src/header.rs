//! Header-block parsing and generation (spec §4.I): an ordered field list,
//! CRLF-separated, terminated by a blank line.

use vmime_types::context::{GenerationContext, ParsingContext};
use vmime_types::header::{Header, HeaderField};

use crate::header_field::{generate_field, parse_next, NextField};

/// Parses every field in `input[begin..end]`, stopping at the blank line
/// that ends the header block (or at `end`, if the block is truncated).
/// Returns the header and the offset just past the blank line.
pub fn parse_header(ctx: &ParsingContext, input: &[u8], begin: usize, end: usize) -> (Header, usize) {
    let mut header = Header::new();
    let mut pos = begin;

    while pos < end {
        match parse_next(ctx, input, pos, end) {
            Some(NextField::Field { field, consumed }) => {
                header.append(field);
                pos += consumed.max(1);
            }
            Some(NextField::EndOfHeaders { consumed }) => {
                pos += consumed;
                break;
            }
            None => break,
        }
    }

    (header, pos)
}

/// Generates `field: value\r\n` for every field in `header`, in order, with
/// no terminating blank line (the body generator owns that separator so
/// that a header-less body is representable).
pub fn generate_header(ctx: &GenerationContext, header: &Header) -> Vec<u8> {
    let mut out = Vec::new();
    for field in header.fields() {
        generate_field(ctx, field, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmime_types::header::FieldBody;

    #[test]
    fn parses_a_small_header_block() {
        let input = b"From: joe@example.com\r\nSubject: hi\r\n\r\nbody";
        let (header, pos) = parse_header(&ParsingContext::default(), input, 0, input.len());
        assert_eq!(header.len(), 2);
        assert_eq!(&input[pos..], b"body");
    }

    #[test]
    fn generates_fields_in_insertion_order() {
        let mut header = Header::new();
        header.append(HeaderField::new(
            "Subject",
            vmime_types::core::Text::from_ascii("hi"),
        ));
        let out = generate_header(&GenerationContext::default(), &header);
        assert_eq!(String::from_utf8(out).unwrap(), "Subject: hi\r\n");
    }

    #[test]
    fn round_trips_a_header_block_through_parse_and_generate() {
        let input = b"Subject: hi there\r\nX-Custom: value\r\n\r\n";
        let (header, pos) = parse_header(&ParsingContext::default(), input, 0, input.len());
        assert_eq!(pos, input.len());
        let out = generate_header(&GenerationContext::default(), &header);
        let (header2, _) = parse_header(&ParsingContext::default(), &out, 0, out.len());
        match &header2.find("Subject").unwrap().value.body {
            FieldBody::Unstructured(t) => assert_eq!(t.to_string_lossy(), "hi there"),
            _ => panic!("wrong variant"),
        }
    }
}
