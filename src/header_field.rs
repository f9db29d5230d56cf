//! The header-field factory and the line-oriented `parseNext` state
//! machine that drives it (spec §4.G).

use vmime_types::address::Address;
use vmime_types::context::{GenerationContext, HeaderRecovery, ParsingContext};
use vmime_types::header::{FieldBody, HeaderField, HeaderFieldValue};

use crate::content_field::{
    content_disposition_type, content_transfer_encoding, disposition, generate_disposition, media_type,
};
use crate::datetime_field::{date_time_lenient, generate_date_time};
use crate::mailbox_field::{address, address_list, generate_mailbox, mailbox, mailbox_list};
use crate::message_id_field::{generate_message_id, message_id, message_id_sequence};
use crate::param_field::{generate_parameter, parameters, ParamGenState};
use crate::relay_field::{generate_relay, relay};
use crate::word::decode_unstructured_text;

/// Maps a field name to the delegate grammar that parses its main value
/// (spec §4.G "name -> constructor"), falling back to
/// [`FieldBody::Unstructured`] for anything unrecognized.
fn parse_body(name: &str, value: &[u8]) -> FieldBody {
    match name.to_ascii_lowercase().as_str() {
        "from" | "sender" | "resent-sender" => mailbox(value)
            .map(|(_, m)| FieldBody::Mailbox(m))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "to" | "cc" | "bcc" | "resent-to" | "resent-cc" | "resent-bcc" | "reply-to" => {
            address_list(value)
                .map(|(_, list)| FieldBody::AddressList(list))
                .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value)))
        }
        "mail-from" | "return-path" | "errors-to" => address(value)
            .map(|(_, a)| FieldBody::Address(a))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "date" | "resent-date" => {
            FieldBody::DateTime(date_time_lenient(value))
        }
        "message-id" | "resent-message-id" | "content-id" => message_id(value)
            .map(|(_, id)| FieldBody::MessageId(id))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "references" | "in-reply-to" => message_id_sequence(value)
            .map(|(_, ids)| FieldBody::MessageIdSequence(ids))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "received" => relay(value)
            .map(|(_, r)| FieldBody::Relay(r))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "disposition-notification-to" => mailbox_list(value)
            .map(|(_, list)| {
                FieldBody::AddressList(list.into_iter().map(Address::Mailbox).collect())
            })
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "disposition" => disposition(value)
            .map(|(_, d)| FieldBody::Disposition(d))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "content-type" => media_type(value)
            .map(|(_, mt)| FieldBody::ContentType(mt))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "content-disposition" => content_disposition_type(value)
            .map(|(_, d)| FieldBody::ContentDisposition(d))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        "content-transfer-encoding" => content_transfer_encoding(value)
            .map(|(_, e)| FieldBody::ContentTransferEncoding(e))
            .unwrap_or_else(|_| FieldBody::Unstructured(decode_unstructured_text(value))),
        _ => FieldBody::Unstructured(decode_unstructured_text(value)),
    }
}

/// Splits a field's raw value into `main-value; params...` and parses the
/// parameter tail when the field kind supports one (Content-Type,
/// Content-Disposition currently carry RFC-2045/2231 parameters).
fn split_main_value_and_params(name: &str, raw: &[u8]) -> (&[u8], &[u8]) {
    let has_params = matches!(
        name.to_ascii_lowercase().as_str(),
        "content-type" | "content-disposition"
    );
    if !has_params {
        return (raw, &raw[0..0]);
    }
    match raw.iter().position(|&b| b == b';') {
        Some(idx) => (&raw[..idx], &raw[idx..]),
        None => (raw, &raw[0..0]),
    }
}

/// Builds a [`HeaderField`] from its name and raw (unfolded) value bytes
/// (spec §4.G step 6: "Construct the field by name and invoke its value
/// parser").
pub fn build_field(name: &str, raw_value: &[u8]) -> HeaderField {
    let (main_value, param_tail) = split_main_value_and_params(name, raw_value);
    let body = parse_body(name, main_value);
    let params = if param_tail.is_empty() {
        Default::default()
    } else {
        parameters(param_tail).map(|(_, p)| p).unwrap_or_default()
    };
    HeaderField::new(name, HeaderFieldValue::new(body).with_params(params))
}

/// Outcome of one [`parse_next`] call.
pub enum NextField {
    /// A field was parsed; `consumed` is the number of bytes (including
    /// its trailing CRLF) read from `input[begin..]`.
    Field { field: HeaderField, consumed: usize },
    /// `CRLF` at `begin`: the header block has ended. `consumed` is 2.
    EndOfHeaders { consumed: usize },
}

fn unfold(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\r' && raw.get(i + 1) == Some(&b'\n') && matches!(raw.get(i + 2), Some(b' ') | Some(b'\t')) {
            out.push(b' ');
            i += 3;
        } else if raw[i] == b'\n' && matches!(raw.get(i + 1), Some(b' ') | Some(b'\t')) {
            out.push(b' ');
            i += 2;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

/// Reads one header field starting at `input[begin..end]`, applying the
/// recovery policy in `ctx` when a line has no `:` separator (spec §4.G).
///
/// Returns `None` only when `begin >= end` with nothing left to read.
pub fn parse_next(ctx: &ParsingContext, input: &[u8], begin: usize, end: usize) -> Option<NextField> {
    let slice = &input[begin..end];
    if slice.is_empty() {
        return None;
    }

    // Step 1: a line starting with CRLF (or bare LF) ends the header block.
    if slice.starts_with(b"\r\n") {
        return Some(NextField::EndOfHeaders { consumed: 2 });
    }
    if slice.starts_with(b"\n") {
        return Some(NextField::EndOfHeaders { consumed: 1 });
    }

    // Step 2: read the field name up to `:`.
    let name_end = slice.iter().position(|&b| b == b':' || b == b'\n');
    let colon_pos = match name_end {
        Some(pos) if slice[pos] == b':' => pos,
        _ => {
            // Step 3: no `:` on this logical line -> recovery.
            return match ctx.header_recovery {
                HeaderRecovery::AssumeEndOfHeaders => {
                    log::debug!("header recovery: no ':' found, assuming end of headers at byte {begin}");
                    Some(NextField::EndOfHeaders { consumed: 0 })
                }
                HeaderRecovery::SkipLine => {
                    let line_end = slice.iter().position(|&b| b == b'\n').map(|p| p + 1).unwrap_or(slice.len());
                    log::debug!("header recovery: skipping colonless line at byte {begin}");
                    parse_next(ctx, input, begin + line_end, end)
                        .map(|next| match next {
                            NextField::Field { field, consumed } => NextField::Field {
                                field,
                                consumed: consumed + line_end,
                            },
                            NextField::EndOfHeaders { consumed } => NextField::EndOfHeaders {
                                consumed: consumed + line_end,
                            },
                        })
                }
            };
        }
    };
    let name = String::from_utf8_lossy(&slice[..colon_pos]).trim().to_string();

    // Step 4: skip optional whitespace right after `:`.
    let mut body_start = colon_pos + 1;
    while matches!(slice.get(body_start), Some(b' ') | Some(b'\t')) {
        body_start += 1;
    }

    // Step 5: read the field body until an unfolded line end: the first
    // CRLF (or LF) not immediately followed by horizontal whitespace.
    let mut i = body_start;
    let body_end;
    loop {
        match slice[i..].iter().position(|&b| b == b'\n') {
            None => {
                body_end = slice.len();
                break;
            }
            Some(rel) => {
                let nl = i + rel;
                let after = if nl > 0 && slice[nl - 1] == b'\r' { nl + 1 } else { nl + 1 };
                if matches!(slice.get(after), Some(b' ') | Some(b'\t')) {
                    i = after;
                    continue;
                }
                body_end = if nl > 0 && slice[nl - 1] == b'\r' { nl - 1 } else { nl };
                i = after;
                break;
            }
        }
    }
    let consumed = i;
    let raw_value = unfold(&slice[body_start..body_end]);

    // Step 6: construct the field by name.
    let field = build_field(&name, &raw_value);
    Some(NextField::Field { field, consumed })
}

fn generate_address(address: &Address) -> String {
    match address {
        Address::Mailbox(m) => generate_mailbox(m),
        Address::Group(g) => {
            let members = g
                .members
                .iter()
                .map(generate_mailbox)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}: {};", g.name.to_string_lossy(), members)
        }
    }
}

/// Renders one field's main value, returning the column position after
/// the last byte written (spec §4.F `*.generate` per typed body).
fn generate_body_value(
    ctx: &GenerationContext,
    body: &FieldBody,
    out: &mut Vec<u8>,
    cur_line_pos: usize,
) -> usize {
    match body {
        FieldBody::Unstructured(text) => {
            crate::word::encode_and_fold(text, out, ctx.max_line_length, cur_line_pos)
        }
        FieldBody::Mailbox(m) => fold_str(out, cur_line_pos, ctx.max_line_length, &generate_mailbox(m)),
        FieldBody::MailboxList(list) => fold_str(
            out,
            cur_line_pos,
            ctx.max_line_length,
            &list.iter().map(generate_mailbox).collect::<Vec<_>>().join(", "),
        ),
        FieldBody::Address(a) => fold_str(out, cur_line_pos, ctx.max_line_length, &generate_address(a)),
        FieldBody::AddressList(list) => fold_str(
            out,
            cur_line_pos,
            ctx.max_line_length,
            &list.iter().map(generate_address).collect::<Vec<_>>().join(", "),
        ),
        FieldBody::DateTime(dt) => fold_str(out, cur_line_pos, ctx.max_line_length, &generate_date_time(dt)),
        FieldBody::MessageId(id) => fold_str(out, cur_line_pos, ctx.max_line_length, &generate_message_id(id)),
        FieldBody::MessageIdSequence(ids) => fold_str(
            out,
            cur_line_pos,
            ctx.max_line_length,
            &ids.iter().map(generate_message_id).collect::<Vec<_>>().join(" "),
        ),
        FieldBody::Relay(r) => fold_str(out, cur_line_pos, ctx.max_line_length, &generate_relay(r)),
        FieldBody::Disposition(d) => fold_str(out, cur_line_pos, ctx.max_line_length, &generate_disposition(d)),
        FieldBody::ContentType(mt) => fold_str(out, cur_line_pos, ctx.max_line_length, &mt.to_string()),
        FieldBody::ContentDisposition(d) => fold_str(out, cur_line_pos, ctx.max_line_length, d),
        FieldBody::ContentTransferEncoding(enc) => fold_str(
            out,
            cur_line_pos,
            ctx.max_line_length,
            enc.name.as_ref().map(|n| n.as_str()).unwrap_or(""),
        ),
    }
}

/// Folds an already-rendered field value at whitespace boundaries so no
/// output line exceeds `max_line_length`, mirroring
/// [`crate::word::encode_and_fold`]'s strategy (fold between tokens, never
/// mid-token) for field kinds that render straight to a `String` rather
/// than a `Text` of `Word`s (spec §4.F: "every typed field's generator
/// honors the line budget").
fn fold_str(out: &mut Vec<u8>, mut cur_line_pos: usize, max_line_length: usize, s: &str) -> usize {
    let mut first_token = true;
    for token in s.split(' ').filter(|t| !t.is_empty()) {
        if !first_token {
            if cur_line_pos + 1 + token.len() > max_line_length {
                out.extend_from_slice(b"\r\n ");
                cur_line_pos = 1;
            } else {
                out.push(b' ');
                cur_line_pos += 1;
            }
        }
        out.extend_from_slice(token.as_bytes());
        cur_line_pos += token.len();
        first_token = false;
    }
    cur_line_pos
}

/// Generates `Name: value[; params...]\r\n` for one field (spec §4.I).
pub fn generate_field(ctx: &GenerationContext, field: &HeaderField, out: &mut Vec<u8>) {
    out.extend_from_slice(field.name.as_bytes());
    out.extend_from_slice(b": ");
    let cur_line_pos = field.name.len() + 2;

    let cur_line_pos = generate_body_value(ctx, &field.value.body, out, cur_line_pos);

    let mut state = ParamGenState { cur_line_pos };
    for param in field.value.params.iter() {
        generate_parameter(param, ctx.param_value_mode, ctx.max_line_length, &mut state, out);
    }

    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_unstructured_field() {
        let input = b"Subject: hello world\r\nNext: x";
        match parse_next(&ParsingContext::default(), input, 0, input.len()).unwrap() {
            NextField::Field { field, consumed } => {
                assert_eq!(field.name, "Subject");
                match field.value.body {
                    FieldBody::Unstructured(t) => assert_eq!(t.to_string_lossy(), "hello world"),
                    _ => panic!("wrong variant"),
                }
                assert_eq!(&input[consumed..], b"Next: x");
            }
            _ => panic!("expected a field"),
        }
    }

    #[test]
    fn unfolds_a_continuation_line() {
        let input = b"Subject: hello\r\n world\r\n\r\n";
        match parse_next(&ParsingContext::default(), input, 0, input.len()).unwrap() {
            NextField::Field { field, .. } => match field.value.body {
                FieldBody::Unstructured(t) => assert_eq!(t.to_string_lossy(), "hello world"),
                _ => panic!("wrong variant"),
            },
            _ => panic!("expected a field"),
        }
    }

    #[test]
    fn blank_line_ends_the_header_block() {
        let input = b"\r\nbody text";
        match parse_next(&ParsingContext::default(), input, 0, input.len()).unwrap() {
            NextField::EndOfHeaders { consumed } => assert_eq!(consumed, 2),
            _ => panic!("expected end of headers"),
        }
    }

    #[test]
    fn skip_line_recovery_ignores_a_colonless_line() {
        let input = b"not a header line\r\nSubject: ok\r\n\r\n";
        let ctx = ParsingContext {
            header_recovery: HeaderRecovery::SkipLine,
            ..Default::default()
        };
        match parse_next(&ctx, input, 0, input.len()).unwrap() {
            NextField::Field { field, .. } => assert_eq!(field.name, "Subject"),
            _ => panic!("expected the recovered field"),
        }
    }

    #[test]
    fn assume_end_of_headers_recovery_stops_immediately() {
        let input = b"not a header line\r\nSubject: ok\r\n\r\n";
        let ctx = ParsingContext {
            header_recovery: HeaderRecovery::AssumeEndOfHeaders,
            ..Default::default()
        };
        match parse_next(&ctx, input, 0, input.len()).unwrap() {
            NextField::EndOfHeaders { consumed } => assert_eq!(consumed, 0),
            _ => panic!("expected end of headers"),
        }
    }

    #[test]
    fn a_long_address_list_folds_onto_continuation_lines() {
        let mut out = Vec::new();
        let body = FieldBody::AddressList(
            (0..6)
                .map(|i| {
                    Address::Mailbox(vmime_types::address::Mailbox::new(vmime_types::address::AddrSpec::new(
                        format!("recipient-number-{i}"),
                        "example.com".to_string(),
                    )))
                })
                .collect(),
        );
        let field = HeaderField::new("To", HeaderFieldValue::new(body));
        generate_field(&GenerationContext::default(), &field, &mut out);

        let rendered = String::from_utf8(out).unwrap();
        for line in rendered.trim_end_matches("\r\n").split("\r\n") {
            assert!(line.len() <= GenerationContext::default().max_line_length);
        }
        assert!(rendered.contains("\r\n "));
    }

    #[test]
    fn recognizes_content_type_with_parameters() {
        let input = b"Content-Type: text/plain; charset=utf-8\r\n\r\n";
        match parse_next(&ParsingContext::default(), input, 0, input.len()).unwrap() {
            NextField::Field { field, .. } => {
                match field.value.body {
                    FieldBody::ContentType(mt) => assert_eq!(mt.to_string(), "text/plain"),
                    _ => panic!("wrong variant"),
                }
                assert_eq!(
                    field.value.params.find("charset").unwrap().value.to_string_lossy(),
                    "utf-8"
                );
            }
            _ => panic!("expected a field"),
        }
    }
}
