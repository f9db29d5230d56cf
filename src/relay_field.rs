//! `Received:` trace parsing (spec §4.F relay.parse).

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::char,
    combinator::opt,
    sequence::preceded,
    IResult,
};

use vmime_types::relay::Relay;

use crate::datetime_field::date_time_lenient;

fn ws(input: &[u8]) -> IResult<&[u8], ()> {
    let (rest, _) = nom::character::complete::multispace0(input)?;
    Ok((rest, ()))
}

fn word(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|b: u8| !b.is_ascii_whitespace() && b != b';')(input)
}

/// Reads space-separated words as the value for one trace keyword, until
/// the next recognized keyword, a `;`, or end of input (spec §4.F:
/// "Tokens inside balanced `(` … `)` comments are passed through
/// verbatim" — comments are just ordinary words here since whitespace
/// inside them is not itself split on).
fn value_until_next_keyword(input: &[u8]) -> IResult<&[u8], String> {
    let mut words = Vec::new();
    let mut rest = input;
    loop {
        let (r, _) = ws(rest)?;
        if r.is_empty() || r.first() == Some(&b';') || keyword(r).is_ok() {
            rest = r;
            break;
        }
        let (r, w) = word(r)?;
        words.push(String::from_utf8_lossy(w).into_owned());
        rest = r;
    }
    Ok((rest, words.join(" ")))
}

#[derive(Debug)]
enum Keyword {
    From,
    By,
    Via,
    With,
    Id,
    For,
}

fn keyword(input: &[u8]) -> IResult<&[u8], Keyword> {
    alt((
        nom::combinator::value(Keyword::From, tag_no_case("from")),
        nom::combinator::value(Keyword::By, tag_no_case("by")),
        nom::combinator::value(Keyword::Via, tag_no_case("via")),
        nom::combinator::value(Keyword::With, tag_no_case("with")),
        nom::combinator::value(Keyword::Id, tag_no_case("id")),
        nom::combinator::value(Keyword::For, tag_no_case("for")),
    ))(input)
}

/// Finds the final `;` splitting trace tokens from the trailing date (spec
/// §4.F relay.parse); trace tokens are keyword-directed, with `with`
/// accumulating multiple values.
pub fn relay(input: &[u8]) -> IResult<&[u8], Relay> {
    let mut relay = Relay::new();
    let mut rest = input;

    loop {
        let (r, _) = ws(rest)?;
        rest = r;
        if rest.is_empty() || rest.first() == Some(&b';') {
            break;
        }
        let Ok((r, kw)) = keyword(rest) else {
            // Unrecognized token: stop trace-token scanning here, matching
            // the source's keyword-directed design rather than failing
            // the whole field.
            break;
        };
        let (r, value) = value_until_next_keyword(r)?;
        rest = r;

        match kw {
            Keyword::From => relay.from = Some(value),
            Keyword::By => relay.by = Some(value),
            Keyword::Via => relay.via = Some(value),
            Keyword::Id => relay.id = Some(value),
            Keyword::For => relay.for_ = Some(value),
            Keyword::With => relay.with.push(value),
        }
    }

    let (rest, _) = opt(preceded(char(';'), ws))(rest)?;
    if !rest.is_empty() {
        relay.date = Some(date_time_lenient(rest));
    }

    Ok((&[], relay))
}

/// Renders a [`Relay`] back into `from ... by ... with ... id ...; date`
/// form (spec §4.F relay.generate).
pub fn generate_relay(relay: &Relay) -> String {
    let mut parts = Vec::new();
    if let Some(v) = &relay.from {
        parts.push(format!("from {}", v));
    }
    if let Some(v) = &relay.by {
        parts.push(format!("by {}", v));
    }
    if let Some(v) = &relay.via {
        parts.push(format!("via {}", v));
    }
    for v in &relay.with {
        parts.push(format!("with {}", v));
    }
    if let Some(v) = &relay.id {
        parts.push(format!("id {}", v));
    }
    if let Some(v) = &relay.for_ {
        parts.push(format!("for {}", v));
    }
    let mut out = parts.join(" ");
    if let Some(date) = &relay.date {
        if !out.is_empty() {
            out.push_str("; ");
        }
        out.push_str(&crate::datetime_field::generate_date_time(date));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_round_trips_through_parse() {
        let input = b"from mail.example.com by mx.example.org with ESMTP id abc123; Fri, 21 Nov 1997 09:55:06 -0600";
        let (_, relay) = relay(input).unwrap();
        let generated = generate_relay(&relay);
        let (rest, reparsed) = relay(generated.as_bytes()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(reparsed.from, relay.from);
        assert_eq!(reparsed.with, relay.with);
    }

    #[test]
    fn parses_from_by_with_id_and_date() {
        let input = b"from mail.example.com by mx.example.org with ESMTP id abc123; Fri, 21 Nov 1997 09:55:06 -0600";
        let (rest, relay) = relay(input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(relay.from.as_deref(), Some("mail.example.com"));
        assert_eq!(relay.by.as_deref(), Some("mx.example.org"));
        assert_eq!(relay.with, vec!["ESMTP".to_string()]);
        assert_eq!(relay.id.as_deref(), Some("abc123"));
        assert!(relay.date.is_some());
    }
}
