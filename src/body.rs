//! MIME body parsing and generation: boundary detection, prolog/epilog
//! extraction, recursive sub-part parsing and multipart/leaf generation
//! (spec §4.J).

use vmime_types::body::{Body, BodyPart, ContentHandler, Message, PartId};
use vmime_types::context::{GenerationContext, ParsingContext};
use vmime_types::core::Charset;
use vmime_types::encoding::{Encoding, EncodingName};
use vmime_types::header::{FieldBody, Header, MediaType};

use crate::charset::{encoder_for, ContentTransferEncoder};
use crate::header::{generate_header, parse_header};

fn content_type_of(header: &Header) -> MediaType {
    match header.find("Content-Type").map(|f| &f.value.body) {
        Some(FieldBody::ContentType(mt)) => mt.clone(),
        _ => MediaType::new("text", "plain"),
    }
}

fn boundary_of(header: &Header) -> Option<String> {
    header
        .find("Content-Type")
        .and_then(|f| f.value.params.find("boundary"))
        .map(|p| p.value.to_string_lossy().into_owned())
}

fn charset_of(header: &Header) -> Option<Charset> {
    header
        .find("Content-Type")
        .and_then(|f| f.value.params.find("charset"))
        .map(|p| Charset::new(p.value.to_string_lossy().into_owned()))
}

fn encoding_of(header: &Header) -> Encoding {
    match header.find("Content-Transfer-Encoding").map(|f| &f.value.body) {
        Some(FieldBody::ContentTransferEncoding(e)) => e.clone(),
        _ => Encoding::new(EncodingName::SevenBit),
    }
}

/// Splits a multipart body region into `(prolog, part byte-ranges, epilog)`,
/// all ranges absolute into the original buffer (spec §4.J: dash-boundary
/// detection, transport-padding, the close-delimiter edge case when it is
/// absent).
fn split_multipart(input: &[u8], begin: usize, end: usize, boundary: &str) -> (Vec<u8>, Vec<(usize, usize)>, Vec<u8>) {
    let region = &input[begin..end];
    let delim = format!("--{}", boundary);
    let delim_bytes = delim.as_bytes();

    // (line_start, line_end, is_close), all relative to `region`.
    let mut markers: Vec<(usize, usize, bool)> = Vec::new();
    let mut i = 0;
    while i < region.len() {
        let at_line_start = i == 0 || region[i - 1] == b'\n';
        if at_line_start && region[i..].starts_with(delim_bytes) {
            let after = i + delim_bytes.len();
            let is_close = region[after..].starts_with(b"--");
            let mut j = if is_close { after + 2 } else { after };
            while j < region.len() && (region[j] == b' ' || region[j] == b'\t') {
                j += 1;
            }
            let line_end = if region[j..].starts_with(b"\r\n") {
                j + 2
            } else if region.get(j) == Some(&b'\n') {
                j + 1
            } else {
                j
            };
            markers.push((i, line_end, is_close));
            i = line_end;
        } else {
            i += 1;
        }
    }

    if markers.is_empty() {
        return (region.to_vec(), Vec::new(), Vec::new());
    }

    let prolog_end = markers[0].0;
    let mut prolog = region[..prolog_end].to_vec();
    if prolog.ends_with(b"\r\n") {
        prolog.truncate(prolog.len() - 2);
    } else if prolog.ends_with(b"\n") {
        prolog.truncate(prolog.len() - 1);
    }

    let mut parts = Vec::new();
    let mut epilog = Vec::new();
    for idx in 0..markers.len() {
        let (_, line_end, is_close) = markers[idx];
        if is_close {
            epilog = region[line_end..].to_vec();
            return (prolog, parts, epilog);
        }
        let next_start = markers.get(idx + 1).map(|m| m.0).unwrap_or(region.len());
        let mut part_end = next_start;
        if part_end >= 2 && &region[part_end - 2..part_end] == b"\r\n" {
            part_end -= 2;
        } else if part_end >= 1 && region[part_end - 1] == b'\n' {
            part_end -= 1;
        }
        parts.push((begin + line_end, begin + part_end));
    }

    // Missing close-delimiter (spec §9 edge case): the last part runs to
    // `end`, with no epilog.
    log::debug!("body recovery: multipart has no close-delimiter, last part runs to end of input");
    (prolog, parts, epilog)
}

/// Builds one [`BodyPart`] (parent unset, children unattached) from
/// `input[begin..end]`, along with the byte ranges of any MIME sub-parts
/// that still need parsing (spec §4.J).
fn build_body_part(ctx: &ParsingContext, input: &[u8], begin: usize, end: usize) -> (BodyPart, Vec<(usize, usize)>) {
    let (header, body_start) = parse_header(ctx, input, begin, end);
    let content_type = content_type_of(&header);
    let charset = charset_of(&header);

    if content_type.is_multipart() {
        if let Some(boundary) = boundary_of(&header) {
            let (prolog, child_ranges, epilog) = split_multipart(input, body_start, end, &boundary);
            let body = Body {
                contents: ContentHandler::default(),
                prolog: String::from_utf8_lossy(&prolog).into_owned(),
                epilog: String::from_utf8_lossy(&epilog).into_owned(),
                boundary: Some(boundary),
                content_type,
                charset,
                parts: Vec::new(),
            };
            return (BodyPart { header, body, parent: None }, child_ranges);
        }
    }

    let raw = &input[body_start..end];
    let encoding = encoding_of(&header);
    let body = Body {
        contents: ContentHandler::Encoded { encoding, data: raw.to_vec() },
        prolog: String::new(),
        epilog: String::new(),
        boundary: None,
        content_type,
        charset,
        parts: Vec::new(),
    };
    (BodyPart { header, body, parent: None }, Vec::new())
}

fn attach_children(ctx: &ParsingContext, input: &[u8], ranges: &[(usize, usize)], message: &mut Message, parent_id: PartId) {
    for &(b, e) in ranges {
        let (part, grandchildren) = build_body_part(ctx, input, b, e);
        let id = message.append_part(parent_id, part);
        attach_children(ctx, input, &grandchildren, message, id);
    }
}

/// Parses a complete RFC-5322/MIME message into an arena-based [`Message`]
/// (spec §4.J, §4.K).
pub fn parse_message(ctx: &ParsingContext, input: &[u8]) -> Message {
    let (root, child_ranges) = build_body_part(ctx, input, 0, input.len());
    let mut message = Message::new(root);
    let root_id = message.root_id();
    attach_children(ctx, input, &child_ranges, &mut message, root_id);
    message
}

/// Re-encodes `content` so its bytes are in `declared`'s wire form,
/// transcoding through the decoded form first if it was already encoded
/// differently (spec §4.J: "leaf-body inline transcoding when declared CTE
/// differs from the handler's stored form").
fn encoded_bytes(content: &ContentHandler, declared: &EncodingName) -> Vec<u8> {
    match content {
        ContentHandler::Decoded(bytes) => encoder_for(declared).encode(bytes),
        ContentHandler::Encoded { encoding, data } => {
            let already_declared = encoding.name.as_ref() == Some(declared);
            if already_declared {
                return data.clone();
            }
            let raw = match &encoding.name {
                Some(name) => encoder_for(name).decode(data).unwrap_or_else(|_| {
                    log::debug!("body recovery: {name:?} decode failed, passing data through undecoded");
                    data.clone()
                }),
                None => data.clone(),
            };
            encoder_for(declared).encode(&raw)
        }
    }
}

fn generate_part(ctx: &GenerationContext, message: &Message, id: PartId, out: &mut Vec<u8>) {
    let part = message.part(id).expect("valid part id within its own message");
    out.extend_from_slice(&generate_header(ctx, &part.header));
    out.extend_from_slice(b"\r\n");

    if part.body.is_multipart() {
        let boundary = part.body.boundary.clone().unwrap_or_else(|| {
            log::debug!("body recovery: multipart part has no boundary, synthesizing one");
            "_=_boundary_=_".to_string()
        });
        let prolog: &str = if !part.body.prolog.is_empty() {
            &part.body.prolog
        } else {
            &ctx.prolog_text
        };
        if !prolog.is_empty() {
            out.extend_from_slice(prolog.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        for &child in &part.body.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            generate_part(ctx, message, child, out);
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
        let epilog: &str = if !part.body.epilog.is_empty() {
            &part.body.epilog
        } else {
            &ctx.epilog_text
        };
        if !epilog.is_empty() {
            out.extend_from_slice(epilog.as_bytes());
        }
    } else {
        let declared = encoding_of(&part.header).name.unwrap_or(EncodingName::SevenBit);
        out.extend_from_slice(&encoded_bytes(&part.body.contents, &declared));
    }
}

/// Generates a complete message from its parsed tree (spec §4.J, §4.K).
pub fn generate_message(ctx: &GenerationContext, message: &Message) -> Vec<u8> {
    let mut out = Vec::new();
    generate_part(ctx, message, message.root_id(), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multipart_boundary_scenario_into_two_parts() {
        // Scenario from spec §8.4.
        let input = b"Content-Type: multipart/mixed; boundary=X\r\n\r\n--X\r\nA: 1\r\n\r\np1\r\n--X\r\nA: 2\r\n\r\np2\r\n--X--\r\n";
        let message = parse_message(&ParsingContext::default(), input);
        let children = message.children_of(message.root_id()).to_vec();
        assert_eq!(children.len(), 2);

        let first = message.part(children[0]).unwrap();
        match &first.body.contents {
            ContentHandler::Encoded { data, .. } => assert_eq!(data, b"p1"),
            _ => panic!("expected encoded leaf content"),
        }
        assert_eq!(
            first.header.find("A").unwrap().value.body,
            FieldBody::Unstructured(vmime_types::core::Text::from_ascii("1"))
        );

        let second = message.part(children[1]).unwrap();
        match &second.body.contents {
            ContentHandler::Encoded { data, .. } => assert_eq!(data, b"p2"),
            _ => panic!("expected encoded leaf content"),
        }
    }

    #[test]
    fn leaf_message_has_no_children() {
        let input = b"Content-Type: text/plain\r\n\r\nhello world";
        let message = parse_message(&ParsingContext::default(), input);
        assert!(message.children_of(message.root_id()).is_empty());
        match &message.root().body.contents {
            ContentHandler::Encoded { data, .. } => assert_eq!(data, b"hello world"),
            _ => panic!("expected encoded leaf content"),
        }
    }

    #[test]
    fn round_trips_a_multipart_message_through_generation() {
        let input = b"Content-Type: multipart/mixed; boundary=X\r\n\r\n--X\r\nA: 1\r\n\r\np1\r\n--X\r\nA: 2\r\n\r\np2\r\n--X--\r\n";
        let message = parse_message(&ParsingContext::default(), input);
        let out = generate_message(&GenerationContext::default(), &message);
        let reparsed = parse_message(&ParsingContext::default(), &out);
        let children = reparsed.children_of(reparsed.root_id()).to_vec();
        assert_eq!(children.len(), 2);
        match &reparsed.part(children[0]).unwrap().body.contents {
            ContentHandler::Encoded { data, .. } => assert_eq!(data, b"p1"),
            _ => panic!("expected encoded leaf content"),
        }
    }

    #[test]
    fn missing_close_delimiter_still_yields_the_last_part() {
        let input = b"Content-Type: multipart/mixed; boundary=X\r\n\r\n--X\r\nA: 1\r\n\r\np1\r\n--X\r\nA: 2\r\n\r\np2";
        let message = parse_message(&ParsingContext::default(), input);
        let children = message.children_of(message.root_id()).to_vec();
        assert_eq!(children.len(), 2);
        match &message.part(children[1]).unwrap().body.contents {
            ContentHandler::Encoded { data, .. } => assert_eq!(data, b"p2"),
            _ => panic!("expected encoded leaf content"),
        }
    }
}
