//! Mailbox, mailbox-list, address, address-list and group grammars (spec
//! §3 "Mailbox / mailbox-list / address / address-list / group", §4.F).
//!
//! Grounded in the `AddrSpec`/`MailboxRef`/`Domain` model of RFC-5322
//! mailbox parsers: dot-atom/quoted-string local parts, dot-atom/
//! domain-literal domains, and angle-addr vs. bare addr-spec forms.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::char,
    combinator::{map, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, tuple},
    IResult,
};

use vmime_types::address::{AddrSpec, Address, AddressList, Group, Mailbox, MailboxList};
use vmime_types::core::Text;

use crate::word::encoded_word;

fn is_atext(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'/'
                | b'='
                | b'?'
                | b'^'
                | b'_'
                | b'`'
                | b'{'
                | b'|'
                | b'}'
                | b'~'
        )
}

fn cfws(mut input: &[u8]) -> &[u8] {
    loop {
        match input.first() {
            Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => input = &input[1..],
            Some(b'(') => {
                // Balanced comment, `\` escapes, possibly nested.
                let mut depth = 0usize;
                let mut i = 0usize;
                loop {
                    match input.get(i) {
                        Some(b'(') => {
                            depth += 1;
                            i += 1;
                        }
                        Some(b')') => {
                            depth -= 1;
                            i += 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        Some(b'\\') if input.get(i + 1).is_some() => i += 2,
                        Some(_) => i += 1,
                        None => break,
                    }
                }
                input = &input[i..];
            }
            _ => break,
        }
    }
    input
}

fn ows(input: &[u8]) -> IResult<&[u8], ()> {
    Ok((cfws(input), ()))
}

fn dot_atom_text(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(separated_list1(char('.'), take_while1(is_atext)))(input)
}

fn quoted_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, _) = char('"')(input)?;
    let mut out = Vec::new();
    let mut rest = input;
    loop {
        match rest.first() {
            Some(b'"') => {
                rest = &rest[1..];
                break;
            }
            Some(b'\\') if rest.len() > 1 => {
                out.push(rest[1]);
                rest = &rest[2..];
            }
            Some(&b) => {
                out.push(b);
                rest = &rest[1..];
            }
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Tag,
                )))
            }
        }
    }
    Ok((rest, out))
}

fn local_part(input: &[u8]) -> IResult<&[u8], String> {
    let (input, _) = ows(input)?;
    let (input, part) = alt((
        map(quoted_string, |v| String::from_utf8_lossy(&v).into_owned()),
        map(dot_atom_text, |v| String::from_utf8_lossy(v).into_owned()),
    ))(input)?;
    let (input, _) = ows(input)?;
    Ok((input, part))
}

fn domain_literal(input: &[u8]) -> IResult<&[u8], String> {
    let (input, _) = ows(input)?;
    let (input, inner) = delimited(
        char('['),
        take_while(|b: u8| b != b']'),
        char(']'),
    )(input)?;
    let (input, _) = ows(input)?;
    Ok((input, format!("[{}]", String::from_utf8_lossy(inner))))
}

fn domain(input: &[u8]) -> IResult<&[u8], String> {
    let (input, _) = ows(input)?;
    let (input, d) = alt((
        map(dot_atom_text, |v| String::from_utf8_lossy(v).into_owned()),
        domain_literal,
    ))(input)?;
    let (input, _) = ows(input)?;
    Ok((input, d))
}

/// `local-part@domain` (spec §4.F, no route-addr/obs- forms).
pub fn addr_spec(input: &[u8]) -> IResult<&[u8], AddrSpec> {
    let (input, local) = local_part(input)?;
    let (input, _) = char('@')(input)?;
    let (input, dom) = domain(input)?;
    Ok((input, AddrSpec::new(local, dom)))
}

/// A single atom or RFC-2047 encoded-word inside a display name (spec §3
/// Word/Text; a bare phrase is a sequence of such atoms), paired with
/// whether CFWS followed it (so `display_name` knows whether to insert a
/// separating space `Word` before the next one).
fn phrase_word(input: &[u8]) -> IResult<&[u8], (vmime_types::core::Word, bool)> {
    let (input, _) = ows(input)?;
    let result = alt((
        encoded_word,
        map(
            alt((map(quoted_string, |v| v), map(take_while1(is_atext), |v: &[u8]| v.to_vec()))),
            vmime_types::core::Word::ascii,
        ),
    ))(input);
    let (input, word) = result?;
    let before_trailing_ws = input.len();
    let (input, _) = ows(input)?;
    let had_trailing_ws = input.len() < before_trailing_ws;
    Ok((input, (word, had_trailing_ws)))
}

/// A sequence of `phrase_word`s, with a plain-space `Word` inserted
/// wherever CFWS separated two of them, so a multi-word display name
/// round-trips through [`Text::to_string_lossy`] with its whitespace
/// intact (spec §3 Text's own contract: the parser supplies the
/// whitespace as a `Word`).
fn display_name(input: &[u8]) -> IResult<&[u8], Text> {
    let mut words = Vec::new();
    let mut rest = input;
    let mut pending_space = false;
    loop {
        match phrase_word(rest) {
            Ok((next, (word, had_trailing_ws))) => {
                if pending_space {
                    words.push(vmime_types::core::Word::ascii(b" ".to_vec()));
                }
                words.push(word);
                pending_space = had_trailing_ws;
                rest = next;
            }
            Err(_) => break,
        }
    }
    Ok((rest, Text::new(words)))
}

fn angle_addr(input: &[u8]) -> IResult<&[u8], AddrSpec> {
    let (input, _) = ows(input)?;
    delimited(char('<'), addr_spec, char('>'))(input)
}

/// `[display-name] angle-addr` or a bare `addr-spec` (spec §4.F
/// address-list/mailbox-list).
pub fn mailbox(input: &[u8]) -> IResult<&[u8], Mailbox> {
    alt((
        map(tuple((display_name, angle_addr)), |(name, spec)| {
            let mailbox = Mailbox::new(spec);
            if name.is_empty() {
                mailbox
            } else {
                mailbox.with_name(name)
            }
        }),
        map(addr_spec, Mailbox::new),
    ))(input)
}

pub fn mailbox_list(input: &[u8]) -> IResult<&[u8], MailboxList> {
    separated_list1(char(','), mailbox)(input)
}

/// `phrase : mailbox-list ;` (spec §3 Group).
fn group(input: &[u8]) -> IResult<&[u8], Group> {
    let (input, name) = display_name(input)?;
    let (input, _) = char(':')(input)?;
    let (input, members) = opt(mailbox_list)(input)?;
    let (input, _) = char(';')(input)?;
    Ok((
        input,
        Group {
            name,
            members: members.unwrap_or_default(),
        },
    ))
}

pub fn address(input: &[u8]) -> IResult<&[u8], Address> {
    alt((map(group, Address::Group), map(mailbox, Address::Mailbox)))(input)
}

pub fn address_list(input: &[u8]) -> IResult<&[u8], AddressList> {
    separated_list1(char(','), address)(input)
}

/// Generates a mailbox as `name <addr-spec>` or bare `addr-spec` (spec
/// §4.F generation, reusing the same shape for the generator as
/// `message-id.generate`: delegate RFC-2047 encoding to [`crate::word`]).
pub fn generate_mailbox(mailbox: &Mailbox) -> String {
    match &mailbox.name {
        Some(name) if !name.is_empty() => {
            let mut buf = Vec::new();
            crate::word::encode_and_fold(name, &mut buf, usize::MAX, 0);
            format!("{} <{}>", String::from_utf8_lossy(&buf), mailbox.addr_spec)
        }
        _ => mailbox.addr_spec.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_addr_spec() {
        let (rest, mbox) = mailbox(b"joe@example.com").unwrap();
        assert!(rest.is_empty());
        assert_eq!(mbox.addr_spec.to_string(), "joe@example.com");
        assert!(mbox.name.is_none());
    }

    #[test]
    fn parses_name_addr_with_display_name() {
        let (rest, mbox) = mailbox(b"John Doe <john@example.com>").unwrap();
        assert!(rest.is_empty());
        assert_eq!(mbox.addr_spec.to_string(), "john@example.com");
        assert_eq!(mbox.name.unwrap().to_string_lossy(), "John Doe");
    }

    #[test]
    fn preserves_whitespace_between_three_display_name_words() {
        let (rest, mbox) = mailbox(b"John Q Doe <john@example.com>").unwrap();
        assert!(rest.is_empty());
        assert_eq!(mbox.name.unwrap().to_string_lossy(), "John Q Doe");
    }

    #[test]
    fn parses_quoted_display_name() {
        let (rest, mbox) = mailbox(br#""Doe, John" <john@example.com>"#).unwrap();
        assert!(rest.is_empty());
        assert_eq!(mbox.name.unwrap().to_string_lossy(), "Doe, John");
    }

    #[test]
    fn mailbox_list_splits_on_commas() {
        let (rest, list) = mailbox_list(b"a@b.com,c@d.com").unwrap();
        assert!(rest.is_empty());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn group_parses_named_container() {
        let (rest, addr) = address(b"undisclosed-recipients:;").unwrap();
        assert!(rest.is_empty());
        match addr {
            Address::Group(g) => assert!(g.members.is_empty()),
            _ => panic!("expected a group"),
        }
    }

    #[test]
    fn domain_literal_is_kept_verbatim() {
        let (rest, mbox) = mailbox(b"joe@[192.168.0.1]").unwrap();
        assert!(rest.is_empty());
        assert_eq!(mbox.addr_spec.domain, "[192.168.0.1]");
    }
}
