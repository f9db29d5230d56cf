//! Date-time parsing and generation (spec §4.F date-time.parse/generate).

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, digit1},
    combinator::{map_res, opt, value},
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};

use vmime_types::datetime::{DateTime, Month, Weekday};

fn ws(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|b| b == b' ' || b == b'\t' || b == b'\r' || b == b'\n')(input)
}

fn opt_ws(input: &[u8]) -> IResult<&[u8], ()> {
    let (rest, _) = many0(alt((
        take_while1(|b| b == b' ' || b == b'\t'),
        preceded(tag("\r\n"), take_while1(|b| b == b' ' || b == b'\t')),
    )))(input)?;
    Ok((rest, ()))
}

/// A best-effort separator: consumes folding whitespace if present, but
/// never fails, so a malformed neighboring field doesn't abort the whole
/// `date_time` parse (spec §4.F: each field defaults independently).
fn ws_opt(input: &[u8]) -> IResult<&[u8], ()> {
    let (rest, _) = opt(ws)(input)?;
    Ok((rest, ()))
}

fn digits_n(input: &[u8], min: usize, max: usize) -> IResult<&[u8], u32> {
    map_res(digit1, move |d: &[u8]| {
        if d.len() < min || d.len() > max {
            return Err(());
        }
        std::str::from_utf8(d).unwrap().parse::<u32>().map_err(|_| ())
    })(input)
}

/// `Ju*` disambiguated by third char (Jun/Jul); `Ma*` by third char
/// (Mar/May); `A*` by second char (Apr/Aug) (spec §4.F date-time.parse).
fn month(input: &[u8]) -> IResult<&[u8], Month> {
    let (rest, word) = take_while1(|b: u8| b.is_ascii_alphabetic())(input)?;
    if word.len() < 3 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alpha,
        )));
    }
    let lower: Vec<u8> = word[..3].iter().map(|b| b.to_ascii_lowercase()).collect();
    let m = match &lower[..] {
        b"jan" => Month::Jan,
        b"feb" => Month::Feb,
        b"mar" => Month::Mar,
        b"apr" => Month::Apr,
        b"may" => Month::May,
        b"jun" => Month::Jun,
        b"jul" => Month::Jul,
        b"aug" => Month::Aug,
        b"sep" => Month::Sep,
        b"oct" => Month::Oct,
        b"nov" => Month::Nov,
        b"dec" => Month::Dec,
        // Per spec §9: "default to January on unrecognized month initials".
        _ => Month::Jan,
    };
    Ok((rest, m))
}

fn dayname(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|b: u8| b.is_ascii_alphabetic())(input)
}

/// Expands a 2/3-digit year per RFC-2822 §4.3: `<= 70` => +2000,
/// `70..=999` => +1900, else as-is.
fn expand_year(y: u32) -> i32 {
    if y <= 70 {
        2000 + y as i32
    } else if y < 1000 {
        1900 + y as i32
    } else {
        y as i32
    }
}

fn military_zone_minutes(letter: u8) -> Option<i16> {
    let l = letter.to_ascii_uppercase();
    if l == b'Z' {
        return Some(0);
    }
    if !l.is_ascii_alphabetic() || l == b'J' {
        return None;
    }
    // A..I => +1..+9, K..M => +10..+12, N..Y => -1..-12 (skipping J).
    let offset = if l <= b'I' {
        (l - b'A' + 1) as i16
    } else if l <= b'M' {
        (l - b'A') as i16
    } else {
        -((l - b'N' + 1) as i16)
    };
    Some(offset * 60)
}

fn zone(input: &[u8]) -> IResult<&[u8], i16> {
    alt((
        map_res(
            tuple((alt((char('+'), char('-'))), digits_n_fixed(4))),
            |(sign, value)| -> Result<i16, ()> {
                let hh = value / 100;
                let mm = value % 100;
                let minutes = (hh * 60 + mm) as i16;
                Ok(if sign == '-' { -minutes } else { minutes })
            },
        ),
        value(0, tag_no_case("UT")),
        value(0, tag_no_case("GMT")),
        value(-300, tag_no_case("EST")),
        value(-240, tag_no_case("EDT")),
        value(-360, tag_no_case("CST")),
        value(-300, tag_no_case("CDT")),
        value(-420, tag_no_case("MST")),
        value(-360, tag_no_case("MDT")),
        value(-480, tag_no_case("PST")),
        value(-420, tag_no_case("PDT")),
        map_res(nom::character::complete::satisfy(|c| c.is_ascii_alphabetic()), |c| {
            military_zone_minutes(c as u8).ok_or(())
        }),
    ))(input)
}

fn digits_n_fixed(n: usize) -> impl Fn(&[u8]) -> IResult<&[u8], u32> {
    move |input| digits_n(input, n, n)
}

/// Parses an RFC-2822 §3.3 `date-time`. On any failure the remaining
/// default fields fall back to the epoch (spec §4.F: "default to
/// 1970-01-01 00:00:00 GMT and continue").
pub fn date_time(input: &[u8]) -> IResult<&[u8], DateTime> {
    let (input, _) = opt_ws(input)?;
    let (input, _) = opt(tuple((dayname, opt_ws, char(','), opt_ws)))(input)?;

    let (input, day) = digits_n(input, 1, 2).unwrap_or((input, 1));
    let (input, _) = ws_opt(input)?;
    let (input, mon) = month(input).unwrap_or((input, Month::Jan));
    let (input, _) = ws_opt(input)?;
    let (input, year) = digits_n(input, 2, 4).unwrap_or((input, 1970));
    let (input, _) = ws_opt(input)?;
    let (input, hour) = digits_n(input, 1, 2).unwrap_or((input, 0));
    let (input, _) = opt(char(':'))(input)?;
    let (input, minute) = digits_n(input, 1, 2).unwrap_or((input, 0));
    let (input, second) = opt(preceded(char(':'), |i| digits_n(i, 1, 2)))(input)?;
    let (input, _) = opt_ws(input)?;
    let (input, zone_minutes) = zone(input).unwrap_or((input, 0));

    Ok((
        input,
        DateTime::new(
            expand_year(year),
            mon.number(),
            day as u8,
            hour as u8,
            minute as u8,
            second.unwrap_or(0) as u8,
            zone_minutes,
        ),
    ))
}

/// Parses a date-time, falling back to the Unix epoch on any grammar
/// failure rather than propagating an error (the typed-field-value
/// leniency policy of spec §7).
pub fn date_time_lenient(input: &[u8]) -> DateTime {
    date_time(input).map(|(_, dt)| dt).unwrap_or_else(|_| DateTime::epoch())
}

/// Emits `www, D MMM YYYY HH:MM:SS +-HHMM` (spec §4.F date-time.generate).
pub fn generate_date_time(dt: &DateTime) -> String {
    let sign = if dt.zone_minutes < 0 { '-' } else { '+' };
    let abs = dt.zone_minutes.unsigned_abs();
    format!(
        "{}, {} {} {:04} {:02}:{:02}:{:02} {}{:02}{:02}",
        weekday_str(dt.weekday()),
        dt.day,
        month_str(dt.month),
        dt.year,
        dt.hour,
        dt.minute,
        dt.second,
        sign,
        abs / 60,
        abs % 60
    )
}

fn weekday_str(w: Weekday) -> &'static str {
    w.as_str()
}

fn month_str(month_number: u8) -> &'static str {
    match month_number {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_rfc2822_date() {
        let (rest, dt) = date_time(b"Fri, 21 Nov 1997 09:55:06 -0600").unwrap();
        assert!(rest.is_empty());
        assert_eq!(dt.year, 1997);
        assert_eq!(dt.month, 11);
        assert_eq!(dt.day, 21);
        assert_eq!(dt.zone_minutes, -360);
    }

    #[test]
    fn two_digit_year_expands_per_rfc2822() {
        let (_, dt) = date_time(b"21 Nov 97 09:55:06 GMT").unwrap();
        assert_eq!(dt.year, 1997);
    }

    #[test]
    fn military_zone_letter_maps_to_offset() {
        let (_, dt) = date_time(b"21 Nov 1997 09:55:06 A").unwrap();
        assert_eq!(dt.zone_minutes, 60);
    }

    #[test]
    fn unparseable_input_falls_back_to_epoch() {
        assert_eq!(date_time_lenient(b"not a date"), DateTime::epoch());
    }

    #[test]
    fn a_malformed_year_defaults_without_discarding_the_already_parsed_day_and_month() {
        // Previously any mid-field failure propagated via `?`, aborting the
        // whole parse; `date_time_lenient` would then substitute the full
        // epoch and the already-parsed day/month would be lost too.
        let (_, dt) = date_time(b"21 Nov abcd 09:55:06 -0600").unwrap();
        assert_eq!(dt.year, 1970);
        assert_eq!(dt.month, 11);
        assert_eq!(dt.day, 21);
        assert_ne!(dt, DateTime::epoch());
    }

    #[test]
    fn a_malformed_hour_and_minute_default_independently() {
        let (_, dt) = date_time(b"21 Nov 1997 xx:yy:06 -0600").unwrap();
        assert_eq!(dt.year, 1997);
        assert_eq!(dt.month, 11);
        assert_eq!(dt.day, 21);
        assert_eq!(dt.hour, 0);
        assert_eq!(dt.minute, 0);
    }

    #[test]
    fn generate_round_trips_through_parse() {
        let dt = DateTime::new(1997, 11, 21, 9, 55, 6, -360);
        let generated = generate_date_time(&dt);
        let (_, parsed) = date_time(generated.as_bytes()).unwrap();
        assert_eq!(dt, parsed);
    }
}
