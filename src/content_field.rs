//! Main-value grammars for `Content-Type`, `Content-Disposition`,
//! `Content-Transfer-Encoding` and `Disposition-Notification` (spec §4.F
//! content-type/content-disposition, RFC-3798 disposition).

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    multi::many0,
    sequence::separated_pair,
    IResult,
};

use vmime_types::disposition::Disposition;
use vmime_types::encoding::{Encoding, EncodingName};
use vmime_types::header::MediaType;

use crate::lexical::is_token_char;

fn token(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_token_char)(input)
}

fn ows(input: &[u8]) -> IResult<&[u8], ()> {
    let (r, _) = nom::character::complete::multispace0(input)?;
    Ok((r, ()))
}

/// `type/subtype` (spec §4.F content-type). Parameters are handled by the
/// parameterized-field machinery in [`crate::param_field`].
pub fn media_type(input: &[u8]) -> IResult<&[u8], MediaType> {
    let (input, (type_, subtype)) =
        separated_pair(token, char('/'), token)(input)?;
    Ok((
        input,
        MediaType::new(
            String::from_utf8_lossy(type_).to_lowercase(),
            String::from_utf8_lossy(subtype).to_lowercase(),
        ),
    ))
}

/// The `attachment`/`inline`/... disposition-type token of
/// `Content-Disposition:`.
pub fn content_disposition_type(input: &[u8]) -> IResult<&[u8], String> {
    let (input, t) = token(input)?;
    Ok((input, String::from_utf8_lossy(t).to_lowercase()))
}

pub fn content_transfer_encoding(input: &[u8]) -> IResult<&[u8], Encoding> {
    let (input, t) = token(input)?;
    Ok((
        input,
        Encoding::new(EncodingName::from(std::str::from_utf8(t).unwrap_or(""))),
    ))
}

fn dotted_modifier(input: &[u8]) -> IResult<&[u8], String> {
    let (input, _) = ows(input)?;
    let (input, _) = char('/')(input)?;
    let (input, _) = ows(input)?;
    let (input, m) = token(input)?;
    Ok((input, String::from_utf8_lossy(m).to_lowercase()))
}

/// `action-mode/sending-mode; type[/modifier...]` (RFC-3798, spec §4.F
/// disposition).
pub fn disposition(input: &[u8]) -> IResult<&[u8], Disposition> {
    let (input, _) = ows(input)?;
    let (input, action_mode) = token(input)?;
    let (input, _) = ows(input)?;
    let (input, _) = char('/')(input)?;
    let (input, _) = ows(input)?;
    let (input, sending_mode) = token(input)?;
    let (input, _) = ows(input)?;
    let (input, _) = char(';')(input)?;
    let (input, _) = ows(input)?;
    let (input, disposition_type) = token(input)?;
    let (input, modifiers) = many0(dotted_modifier)(input)?;

    let mut d = Disposition::new(
        String::from_utf8_lossy(action_mode).to_lowercase(),
        String::from_utf8_lossy(sending_mode).to_lowercase(),
        String::from_utf8_lossy(disposition_type).to_lowercase(),
    );
    for m in modifiers {
        d = d.with_modifier(m);
    }
    Ok((input, d))
}

/// Renders a [`Disposition`] back into
/// `action-mode/sending-mode; type[/modifier...]` (RFC-3798).
pub fn generate_disposition(d: &Disposition) -> String {
    let mut out = format!(
        "{}/{}; {}",
        d.action_mode.action_mode, d.action_mode.sending_mode, d.disposition_type.disposition_type
    );
    for m in &d.disposition_type.modifiers {
        out.push('/');
        out.push_str(m);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_media_type_lowercasing_both_halves() {
        let (rest, mt) = media_type(b"Multipart/Mixed").unwrap();
        assert!(rest.is_empty());
        assert_eq!(mt.type_, "multipart");
        assert_eq!(mt.subtype, "mixed");
    }

    #[test]
    fn parses_content_transfer_encoding_token() {
        let (rest, enc) = content_transfer_encoding(b"base64").unwrap();
        assert!(rest.is_empty());
        assert_eq!(enc.name, Some(EncodingName::Base64));
    }

    #[test]
    fn parses_rfc3798_disposition_with_modifier() {
        let (rest, d) = disposition(b"manual-action/MDN-sent-manually; displayed/error").unwrap();
        assert!(rest.is_empty());
        assert_eq!(d.action_mode.action_mode, "manual-action");
        assert_eq!(d.disposition_type.disposition_type, "displayed");
        assert_eq!(d.disposition_type.modifiers, vec!["error".to_string()]);
    }

    #[test]
    fn generate_disposition_round_trips() {
        let (_, d) = disposition(b"manual-action/MDN-sent-manually; displayed/error").unwrap();
        let generated = generate_disposition(&d);
        let (rest, d2) = disposition(generated.as_bytes()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(d, d2);
    }
}
