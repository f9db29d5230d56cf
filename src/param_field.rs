//! RFC-2045 parameters with RFC-2047/2231 encoding (spec §4.H).

use std::collections::HashMap;

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{map, opt},
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};

use vmime_types::core::{Charset, Word};
use vmime_types::param::{Parameter, ParamValueMode, ParameterSet};

use crate::lexical::is_token_char;
use crate::word::encoded_word;

fn ows(input: &[u8]) -> IResult<&[u8], ()> {
    let (r, _) = nom::character::complete::multispace0(input)?;
    Ok((r, ()))
}

fn token(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(take_while1(is_token_char), |t: &[u8]| t.to_vec())(input)
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

fn attribute_name(input: &[u8]) -> IResult<&[u8], String> {
    map(take_while1(|b: u8| is_token_char(b) && b != b'*'), |t: &[u8]| {
        String::from_utf8_lossy(t).to_lowercase()
    })(input)
}

struct ParsedAttr {
    name: String,
    section_encoded: bool,
    value: Vec<u8>,
}

/// `name[*section][*]=value`, the per-parameter attribute/value pair
/// (spec §4.H step 2-3).
fn one_parameter(input: &[u8]) -> IResult<&[u8], ParsedAttr> {
    let (input, name) = attribute_name(input)?;
    let (input, _section) = opt(preceded(char('*'), digit1))(input)?;
    let (input, star) = opt(char('*'))(input)?;
    let (input, _) = ows(input)?;
    let (input, _) = char('=')(input)?;
    let (input, _) = ows(input)?;
    let (input, value) = alt((quoted_string, token))(input)?;

    Ok((
        input,
        ParsedAttr {
            name,
            section_encoded: star.is_some(),
            value,
        },
    ))
}

fn percent_decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' && i + 2 < input.len() {
            if let Ok(s) = std::str::from_utf8(&input[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(s, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}

fn percent_encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Splits the leading `charset'language'` prefix off the first RFC-2231
/// section of an encoded parameter (spec §4.H step 4).
fn split_charset_language(input: &[u8]) -> (Charset, Option<String>, &[u8]) {
    let parts: Vec<&[u8]> = input.splitn(3, |&b| b == b'\'').collect();
    if parts.len() == 3 {
        let charset = Charset::new(String::from_utf8_lossy(parts[0]).into_owned());
        let language = if parts[1].is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(parts[1]).into_owned())
        };
        (charset, language, parts[2])
    } else {
        (Charset::default(), None, input)
    }
}

/// Parses the `; name=value; ...` parameter tail of a parameterized field
/// (spec §4.H). Sections for the same name are gathered in encounter
/// order (spec §9: "section number ignored beyond detection").
pub fn parameters(input: &[u8]) -> IResult<&[u8], ParameterSet> {
    let (input, attrs) = many0(preceded(
        tuple((ows, char(';'), ows)),
        one_parameter,
    ))(input)?;

    let mut order: Vec<String> = Vec::new();
    let mut sections: HashMap<String, Vec<ParsedAttr>> = HashMap::new();
    for attr in attrs {
        if !sections.contains_key(&attr.name) {
            order.push(attr.name.clone());
        }
        sections.entry(attr.name.clone()).or_default().push(attr);
    }

    let mut set = ParameterSet::new();
    for name in order {
        let segs = sections.remove(&name).unwrap();
        let any_encoded = segs.iter().any(|s| s.section_encoded);

        if any_encoded {
            let mut charset = Charset::default();
            let mut language = None;
            let mut bytes = Vec::new();
            for (i, seg) in segs.iter().enumerate() {
                let raw = if seg.section_encoded {
                    if i == 0 {
                        let (c, l, rest) = split_charset_language(&seg.value);
                        charset = c;
                        language = l;
                        percent_decode(rest)
                    } else {
                        percent_decode(&seg.value)
                    }
                } else {
                    seg.value.clone()
                };
                bytes.extend_from_slice(&raw);
            }
            let mut word = Word::new(bytes, charset);
            if let Some(lang) = language {
                word = word.with_language(lang);
            }
            set.set(Parameter::new(name, word));
        } else {
            let mut bytes = Vec::new();
            for seg in &segs {
                // Mozilla workaround (spec §4.H step 4): a fragment that is
                // itself an RFC-2047 encoded-word gets decoded, even though
                // RFC-2231 forbids mixing the two schemes.
                if let Ok((rest, word)) = encoded_word(&seg.value) {
                    if rest.is_empty() {
                        bytes.extend_from_slice(&word.bytes);
                        continue;
                    }
                }
                bytes.extend_from_slice(&seg.value);
            }
            set.set(Parameter::new(name, Word::ascii(bytes)));
        }
    }

    Ok((input, set))
}

/// Line-budgeting state the generator tracks across parameter sections
/// (spec §4.H "Line budgeting").
pub struct ParamGenState {
    pub cur_line_pos: usize,
}

/// Emits `; name=value` or the RFC-2231 split form for one parameter,
/// according to `mode` (spec §4.H parameter generation).
pub fn generate_parameter(
    param: &Parameter,
    mode: ParamValueMode,
    max_line_length: usize,
    state: &mut ParamGenState,
    out: &mut Vec<u8>,
) {
    let is_ascii = param.value.charset.is_ascii()
        && param.value.bytes.iter().all(|&b| (0x20..=0x7e).contains(&b));

    match mode {
        ParamValueMode::NoEncoding => {
            let rendered = format!("; {}={}", param.name, render_token_or_quoted(&param.value.bytes));
            push_with_fold(out, state, max_line_length, &rendered);
        }
        ParamValueMode::Rfc2047Only => {
            if is_ascii {
                let rendered = format!("; {}={}", param.name, render_token_or_quoted(&param.value.bytes));
                push_with_fold(out, state, max_line_length, &rendered);
            } else {
                let mut encoded = Vec::new();
                let text = vmime_types::core::Text::new(vec![param.value.clone()]);
                crate::word::encode_and_fold(&text, &mut encoded, max_line_length, state.cur_line_pos);
                let rendered = format!("; {}=\"{}\"", param.name, String::from_utf8_lossy(&encoded));
                push_with_fold(out, state, max_line_length, &rendered);
            }
        }
        ParamValueMode::Rfc2231Only => {
            if is_ascii && fits_single_section(param, max_line_length, state.cur_line_pos) {
                let rendered = format!(
                    "; {}*={}''{}",
                    param.name,
                    param.value.charset.name(),
                    percent_encode(&param.value.bytes)
                );
                push_with_fold(out, state, max_line_length, &rendered);
            } else {
                generate_rfc2231_sections(param, max_line_length, state, out);
            }
        }
        ParamValueMode::Both => {
            generate_parameter(param, ParamValueMode::NoEncoding, max_line_length, state, out);
            generate_rfc2231_sections(param, max_line_length, state, out);
        }
    }
}

fn fits_single_section(param: &Parameter, max_line_length: usize, cur_line_pos: usize) -> bool {
    let encoded_len = param.name.len() + 2 + param.value.charset.name().len() + 2
        + percent_encode(&param.value.bytes).len();
    cur_line_pos + 2 + encoded_len <= max_line_length
}

fn generate_rfc2231_sections(
    param: &Parameter,
    max_line_length: usize,
    state: &mut ParamGenState,
    out: &mut Vec<u8>,
) {
    let encoded = percent_encode(&param.value.bytes);
    let prefix_len = format!("; {}*0*={}''", param.name, param.value.charset.name()).len();
    let chunk_size = max_line_length.saturating_sub(prefix_len).max(5);

    let mut section = 0usize;
    let mut rest = encoded.as_str();
    let mut first = true;
    while !rest.is_empty() || first {
        let take = rest.len().min(chunk_size);
        let (chunk, remainder) = rest.split_at(take);
        rest = remainder;

        let rendered = if first {
            format!(
                "; {}*{}*={}''{}",
                param.name,
                section,
                param.value.charset.name(),
                chunk
            )
        } else {
            format!("; {}*{}*={}", param.name, section, chunk)
        };
        push_with_fold(out, state, max_line_length, &rendered);

        section += 1;
        first = false;
        if rest.is_empty() {
            break;
        }
    }
}

fn render_token_or_quoted(bytes: &[u8]) -> String {
    let needs_quoting = bytes.iter().any(|&b| !is_token_char(b));
    if needs_quoting {
        let mut s = String::from("\"");
        for &b in bytes {
            if b == b'"' || b == b'\\' {
                s.push('\\');
            }
            s.push(b as char);
        }
        s.push('"');
        s
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn push_with_fold(out: &mut Vec<u8>, state: &mut ParamGenState, max_line_length: usize, piece: &str) {
    if state.cur_line_pos + piece.len() > max_line_length && state.cur_line_pos > 0 {
        out.extend_from_slice(b"\r\n ");
        state.cur_line_pos = 1;
    }
    out.extend_from_slice(piece.as_bytes());
    state.cur_line_pos += piece.len();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc2231_segmented_parameter() {
        // Scenario from spec §8.3.
        let input = b"; filename*0*=UTF-8''%E2%82%AC; filename*1*=uro.txt";
        let (rest, set) = parameters(input).unwrap();
        assert!(rest.is_empty());
        let filename = set.find("filename").unwrap();
        assert_eq!(filename.value.to_string_lossy(), "€uro.txt");
        assert_eq!(filename.value.charset, Charset::new("UTF-8"));
    }

    #[test]
    fn parses_simple_token_parameter() {
        let (rest, set) = parameters(b"; charset=us-ascii").unwrap();
        assert!(rest.is_empty());
        assert_eq!(set.find("charset").unwrap().value.to_string_lossy(), "us-ascii");
    }

    #[test]
    fn parses_quoted_parameter_with_escaped_quote() {
        let (rest, set) = parameters(br#"; name="a \"quoted\" value""#).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            set.find("name").unwrap().value.to_string_lossy(),
            "a \"quoted\" value"
        );
    }

    #[test]
    fn round_trips_through_rfc2231_generation() {
        let mut set = ParameterSet::new();
        set.set(Parameter::new(
            "filename",
            Word::new("€uro.txt".as_bytes().to_vec(), Charset::new("UTF-8")),
        ));
        let mut out = Vec::new();
        let mut state = ParamGenState { cur_line_pos: 0 };
        generate_parameter(
            set.find("filename").unwrap(),
            ParamValueMode::Rfc2231Only,
            78,
            &mut state,
            &mut out,
        );
        let generated = String::from_utf8(out).unwrap();
        let (rest, reparsed) = parameters(generated.as_bytes()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            reparsed.find("filename").unwrap().value.to_string_lossy(),
            "€uro.txt"
        );
    }
}
