//! Message-id parsing and generation (spec §4.F message-id.parse/generate).

use nom::{
    bytes::complete::{is_not, tag, take_while},
    character::complete::char,
    combinator::opt,
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};

use vmime_types::message_id::{MessageId, MessageIdSequence};

/// Comments `(...)` with `\` escaping, passed through while scanning for
/// the opening `<` (spec §4.F message-id.parse).
fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = char('(')(input)?;
    let mut rest = input;
    loop {
        match rest.first() {
            Some(b')') => {
                rest = &rest[1..];
                break;
            }
            Some(b'\\') if rest.len() > 1 => rest = &rest[2..],
            Some(b'(') => {
                let (r, _) = comment(rest)?;
                rest = r;
            }
            Some(_) => rest = &rest[1..],
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Tag,
                )))
            }
        }
    }
    Ok((rest, ()))
}

fn skip_comments_and_space(mut input: &[u8]) -> &[u8] {
    loop {
        if let Some(&b) = input.first() {
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                input = &input[1..];
                continue;
            }
            if b == b'(' {
                if let Ok((rest, _)) = comment(input) {
                    input = rest;
                    continue;
                }
            }
        }
        break;
    }
    input
}

/// `<left@right>` or, lacking a `<`, the whole remaining token as `left`
/// with an empty `right` (spec §4.F message-id.parse).
pub fn message_id(input: &[u8]) -> IResult<&[u8], MessageId> {
    let input = skip_comments_and_space(input);
    if input.first() != Some(&b'<') {
        let (rest, token) = take_while(|b: u8| b != b' ' && b != b'\t' && b != b'\r' && b != b'\n')(input)?;
        return Ok((rest, MessageId::left_only(String::from_utf8_lossy(token))));
    }

    let (rest, inner) = delimited(char('<'), is_not(">"), char('>'))(input)?;
    let (left, right) = match inner.iter().position(|&b| b == b'@') {
        Some(idx) => (&inner[..idx], &inner[idx + 1..]),
        None => (inner, &inner[0..0]),
    };
    Ok((
        rest,
        MessageId::new(
            String::from_utf8_lossy(left),
            String::from_utf8_lossy(right),
        ),
    ))
}

/// A whitespace/comment-separated sequence of message-ids, as found in
/// `References:`/`In-Reply-To:`.
pub fn message_id_sequence(input: &[u8]) -> IResult<&[u8], MessageIdSequence> {
    many0(preceded(opt(tag(" ")), message_id))(input)
}

/// `<left@right>` (or `<left>`) (spec §4.F message-id.generate). Folding
/// onto a new line when this would overflow `max_line_length` is the
/// header-field generator's responsibility, not this function's.
pub fn generate_message_id(id: &MessageId) -> String {
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_angle_bracketed_id() {
        let (rest, id) = message_id(b"<1234@example.com>").unwrap();
        assert!(rest.is_empty());
        assert_eq!(id, MessageId::new("1234", "example.com"));
    }

    #[test]
    fn parses_bare_token_with_no_angle_brackets() {
        let (rest, id) = message_id(b"bareword").unwrap();
        assert!(rest.is_empty());
        assert_eq!(id, MessageId::left_only("bareword"));
    }

    #[test]
    fn sequence_parses_multiple_ids() {
        let (rest, ids) = message_id_sequence(b"<a@b> <c@d>").unwrap();
        assert!(rest.is_empty());
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn generate_round_trips() {
        let id = MessageId::new("a", "b.com");
        assert_eq!(generate_message_id(&id), "<a@b.com>");
    }
}
