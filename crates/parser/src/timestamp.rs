//! Timestamp parsing.
//!
//! RFC 5424 frames carry an RFC 3339 date-time with a mandatory offset.
//! RFC 3164 frames carry one of four dialects, tried in priority order:
//!
//! 1. `YYYY Mon DD HH:MM:SS [TZ]` - explicit leading year
//! 2. `Mon DD YYYY HH:MM:SS [AM|PM][.ms] [UTC|TZ±N|ABBR] [:]` - Cisco CUCM
//! 3. `Mon DD HH:MM:SS [TZ] YYYY` - ctime style with trailing year
//! 4. `Mon DD HH:MM:SS [TZ]` - classic, year defaults to the current UTC year
//!
//! Every result is normalized to UTC.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ParseError;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ============================================================================
// RFC 3339 (used by the RFC 5424 path)
// ============================================================================

/// Parse an RFC 3339 timestamp at the head of `input`.
///
/// `-` encodes an absent timestamp. Fractional seconds are limited to six
/// digits; RFC 5424 explicitly rules out nanosecond precision, so a seventh
/// digit is an error rather than a truncation.
pub(crate) fn parse_rfc3339(input: &str) -> Result<(Option<DateTime<Utc>>, &str), ParseError> {
    if let Some(rest) = input.strip_prefix('-') {
        return Ok((None, rest));
    }

    let bytes = input.as_bytes();

    let year = digits4(bytes, 0)?;
    expect(bytes, 4, b'-')?;
    let month = digits2(bytes, 5)?;
    expect(bytes, 7, b'-')?;
    let day = digits2(bytes, 8)?;
    expect(bytes, 10, b'T')?;
    let hour = digits2(bytes, 11)?;
    expect(bytes, 13, b':')?;
    let minute = digits2(bytes, 14)?;
    expect(bytes, 16, b':')?;
    let second = digits2(bytes, 17)?;

    let mut pos = 19;
    let mut micros = 0u32;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        let start = pos;
        while bytes.get(pos).is_some_and(|b| b.is_ascii_digit()) {
            pos += 1;
        }
        let count = pos - start;
        if count == 0 || count > 6 {
            return Err(ParseError::TimestampInvalid);
        }
        let mut frac = 0u32;
        for &digit in &bytes[start..pos] {
            frac = frac * 10 + u32::from(digit - b'0');
        }
        micros = frac * 10u32.pow(6 - count as u32);
    }

    let offset_seconds = match bytes.get(pos) {
        Some(b'Z') | Some(b'z') => {
            pos += 1;
            0
        }
        Some(sign @ (b'+' | b'-')) => {
            let direction = if *sign == b'-' { -1 } else { 1 };
            let hours = digits2(bytes, pos + 1)?;
            expect(bytes, pos + 3, b':')?;
            let minutes = digits2(bytes, pos + 4)?;
            if hours > 23 || minutes > 59 {
                return Err(ParseError::TimestampInvalid);
            }
            pos += 6;
            direction * (hours as i32 * 3600 + minutes as i32 * 60)
        }
        _ => return Err(ParseError::TimestampInvalid),
    };

    let naive = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_micro_opt(hour, minute, second, micros))
        .ok_or(ParseError::TimestampInvalid)?;
    let offset = FixedOffset::east_opt(offset_seconds).ok_or(ParseError::TimestampInvalid)?;
    let timestamp = match offset.from_local_datetime(&naive) {
        LocalResult::Single(instant) => instant.with_timezone(&Utc),
        _ => return Err(ParseError::TimestampInvalid),
    };

    Ok((Some(timestamp), &input[pos..]))
}

fn digit(bytes: &[u8], index: usize) -> Result<u32, ParseError> {
    match bytes.get(index) {
        Some(byte) if byte.is_ascii_digit() => Ok(u32::from(byte - b'0')),
        _ => Err(ParseError::TimestampInvalid),
    }
}

fn digits2(bytes: &[u8], index: usize) -> Result<u32, ParseError> {
    Ok(digit(bytes, index)? * 10 + digit(bytes, index + 1)?)
}

fn digits4(bytes: &[u8], index: usize) -> Result<u32, ParseError> {
    Ok(digits2(bytes, index)? * 100 + digits2(bytes, index + 2)?)
}

fn expect(bytes: &[u8], index: usize, wanted: u8) -> Result<(), ParseError> {
    if bytes.get(index) == Some(&wanted) {
        Ok(())
    } else {
        Err(ParseError::TimestampInvalid)
    }
}

// ============================================================================
// RFC 3164 dialects
// ============================================================================

/// Try every legacy dialect in priority order; the first match wins.
///
/// Returns the UTC instant and the remainder after the timestamp (including
/// any consumed zone token and CUCM `:` separator). `now` supplies the year
/// for the classic no-year dialect.
pub(crate) fn parse_rfc3164<'a>(
    input: &'a str,
    now: DateTime<Utc>,
    timezones: &HashMap<String, Tz>,
) -> Option<(DateTime<Utc>, &'a str)> {
    explicit_year(input, timezones)
        .or_else(|| cucm(input, timezones))
        .or_else(|| trailing_year(input, timezones))
        .or_else(|| classic(input, now, timezones))
}

/// `YYYY Mon DD HH:MM:SS [TZ]`
fn explicit_year<'a>(
    input: &'a str,
    timezones: &HashMap<String, Tz>,
) -> Option<(DateTime<Utc>, &'a str)> {
    let mut scanner = Scanner::new(input);

    let year = parse_year(scanner.token()?)?;
    let month = parse_month(scanner.token()?)?;
    let day = parse_day(scanner.token()?)?;
    let (hour, minute, second) = parse_time(scanner.token()?)?;

    // The zone directly precedes the hostname here, so only positively
    // recognized tokens are consumed.
    let zone = take_recognized_zone(&mut scanner, timezones);

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    Some((resolve(naive, &zone), scanner.rest()))
}

/// `Mon DD YYYY HH:MM:SS [AM|PM][.ms] [UTC|TZ±N|ABBR] [:]`
fn cucm<'a>(input: &'a str, timezones: &HashMap<String, Tz>) -> Option<(DateTime<Utc>, &'a str)> {
    let mut scanner = Scanner::new(input);

    let month = parse_month(scanner.token()?)?;
    let day = parse_day(scanner.token()?)?;
    let year = parse_year(scanner.token()?)?;
    let (mut hour, minute, second) = parse_time(scanner.token()?)?;

    let mut micros = 0;
    if let Some(token) = scanner.peek()
        && let Some((is_pm, fraction)) = parse_meridiem(token)
    {
        if hour < 1 || hour > 12 {
            return None;
        }
        scanner.token();
        micros = fraction;
        if is_pm && hour != 12 {
            hour += 12;
        } else if !is_pm && hour == 12 {
            hour = 0;
        }
    }

    // This slot is structurally a timezone, so an unrecognized abbreviation
    // is consumed too and falls back to UTC with a warning.
    let zone = take_structural_zone(&mut scanner, timezones);

    if scanner.peek() == Some(":") {
        scanner.token();
    }

    let naive =
        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_micro_opt(hour, minute, second, micros)?;
    Some((resolve(naive, &zone), scanner.rest()))
}

/// `Mon DD HH:MM:SS [TZ] YYYY`
fn trailing_year<'a>(
    input: &'a str,
    timezones: &HashMap<String, Tz>,
) -> Option<(DateTime<Utc>, &'a str)> {
    let mut scanner = Scanner::new(input);

    let month = parse_month(scanner.token()?)?;
    let day = parse_day(scanner.token()?)?;
    let (hour, minute, second) = parse_time(scanner.token()?)?;

    let first = scanner.token()?;
    let (zone, year) = match parse_year(first) {
        Some(year) => (Zone::Utc, year),
        None => {
            // The token between the time and the year is structurally a
            // timezone slot.
            let year = parse_year(scanner.peek()?)?;
            scanner.token();
            (structural_zone(first, timezones)?, year)
        }
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    Some((resolve(naive, &zone), scanner.rest()))
}

/// `Mon DD HH:MM:SS [TZ]` - the year is taken from the injected clock.
fn classic<'a>(
    input: &'a str,
    now: DateTime<Utc>,
    timezones: &HashMap<String, Tz>,
) -> Option<(DateTime<Utc>, &'a str)> {
    use chrono::Datelike;

    let mut scanner = Scanner::new(input);

    let month = parse_month(scanner.token()?)?;
    let day = parse_day(scanner.token()?)?;
    let (hour, minute, second) = parse_time(scanner.token()?)?;

    let zone = take_recognized_zone(&mut scanner, timezones);

    let naive =
        NaiveDate::from_ymd_opt(now.year(), month, day)?.and_hms_opt(hour, minute, second)?;
    Some((resolve(naive, &zone), scanner.rest()))
}

// ============================================================================
// Token scanning
// ============================================================================

/// Space-separated token cursor over a legacy header. Runs of spaces are
/// collapsed, which covers the space-padded day in `Feb  5 17:32:18`.
#[derive(Clone, Copy)]
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn peek(&self) -> Option<&'a str> {
        let mut probe = *self;
        probe.token()
    }

    fn token(&mut self) -> Option<&'a str> {
        self.rest = self.rest.trim_start_matches(' ');
        if self.rest.is_empty() {
            return None;
        }
        let end = self.rest.find(' ').unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    fn rest(&self) -> &'a str {
        self.rest
    }
}

fn parse_year(token: &str) -> Option<i32> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn parse_month(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
        .map(|index| index as u32 + 1)
}

fn parse_day(token: &str) -> Option<u32> {
    if token.is_empty() || token.len() > 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day: u32 = token.parse().ok()?;
    (1..=31).contains(&day).then_some(day)
}

/// `HH:MM:SS` with one or two digits per component.
fn parse_time(token: &str) -> Option<(u32, u32, u32)> {
    let mut parts = token.split(':');
    let hour = time_component(parts.next()?, 23)?;
    let minute = time_component(parts.next()?, 59)?;
    let second = time_component(parts.next()?, 59)?;
    if parts.next().is_some() {
        return None;
    }
    Some((hour, minute, second))
}

fn time_component(part: &str, max: u32) -> Option<u32> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = part.parse().ok()?;
    (value <= max).then_some(value)
}

/// `AM`/`PM` with an optional fractional-second suffix, e.g. `PM.601`.
/// Returns whether the token is PM and the fraction in microseconds.
fn parse_meridiem(token: &str) -> Option<(bool, u32)> {
    let bytes = token.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let is_pm = bytes[..2].eq_ignore_ascii_case(b"PM");
    if !is_pm && !bytes[..2].eq_ignore_ascii_case(b"AM") {
        return None;
    }

    let fraction = &token[2..];
    if fraction.is_empty() {
        return Some((is_pm, 0));
    }

    let digits = fraction.strip_prefix('.')?;
    if digits.is_empty() || digits.len() > 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut value = 0u32;
    for byte in digits.bytes() {
        value = value * 10 + u32::from(byte - b'0');
    }
    Some((is_pm, value * 10u32.pow(6 - digits.len() as u32)))
}

// ============================================================================
// Timezone tokens
// ============================================================================

enum Zone {
    Utc,
    Fixed(FixedOffset),
    Named(Tz),
}

/// Recognize `UTC`, the `TZ±N` dialect, or a table abbreviation.
fn recognize_zone(token: &str, timezones: &HashMap<String, Tz>) -> Option<Zone> {
    if token.eq_ignore_ascii_case("UTC") {
        return Some(Zone::Utc);
    }

    if let Some(signed) = token.strip_prefix("TZ") {
        let (direction, digits) = match signed.as_bytes().first()? {
            b'+' => (1, &signed[1..]),
            b'-' => (-1, &signed[1..]),
            _ => return None,
        };
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hours: i32 = digits.parse().ok()?;
        if hours > 14 {
            return None;
        }
        return FixedOffset::east_opt(direction * hours * 3600).map(Zone::Fixed);
    }

    timezones.get(token).copied().map(Zone::Named)
}

/// A 2-5 letter all-caps token, the shape of a timezone abbreviation.
pub(crate) fn is_abbreviation(token: &str) -> bool {
    (2..=5).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_uppercase())
}

/// Consume the next token only when it is positively a timezone. Used in
/// the dialects where the optional zone directly precedes the hostname, so
/// that an all-caps hostname is not mistaken for an abbreviation.
fn take_recognized_zone(scanner: &mut Scanner<'_>, timezones: &HashMap<String, Tz>) -> Zone {
    if let Some(token) = scanner.peek()
        && let Some(zone) = recognize_zone(token, timezones)
    {
        scanner.token();
        return zone;
    }
    Zone::Utc
}

/// Consume a token from a slot that is structurally a timezone; unknown
/// abbreviations fall back to UTC with a warning.
fn take_structural_zone(scanner: &mut Scanner<'_>, timezones: &HashMap<String, Tz>) -> Zone {
    if let Some(token) = scanner.peek() {
        if let Some(zone) = recognize_zone(token, timezones) {
            scanner.token();
            return zone;
        }
        if is_abbreviation(token) {
            scanner.token();
            tracing::warn!(
                abbreviation = token,
                "unknown timezone abbreviation, assuming UTC"
            );
            return Zone::Utc;
        }
    }
    Zone::Utc
}

/// Like [`take_structural_zone`] but for an already-taken token; `None`
/// means the token cannot be a timezone at all.
fn structural_zone(token: &str, timezones: &HashMap<String, Tz>) -> Option<Zone> {
    if let Some(zone) = recognize_zone(token, timezones) {
        return Some(zone);
    }
    if is_abbreviation(token) {
        tracing::warn!(
            abbreviation = token,
            "unknown timezone abbreviation, assuming UTC"
        );
        return Some(Zone::Utc);
    }
    None
}

/// Interpret a naive local datetime in `zone` and convert it to UTC.
/// Ambiguous local times resolve to the earlier instant; times skipped by a
/// DST transition are treated as already being UTC.
fn resolve(naive: NaiveDateTime, zone: &Zone) -> DateTime<Utc> {
    match zone {
        Zone::Utc => Utc.from_utc_datetime(&naive),
        Zone::Fixed(offset) => match offset.from_local_datetime(&naive) {
            LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => {
                instant.with_timezone(&Utc)
            }
            LocalResult::None => Utc.from_utc_datetime(&naive),
        },
        Zone::Named(tz) => match tz.from_local_datetime(&naive) {
            LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => {
                instant.with_timezone(&Utc)
            }
            LocalResult::None => Utc.from_utc_datetime(&naive),
        },
    }
}

#[cfg(test)]
#[path = "timestamp_test.rs"]
mod timestamp_test;
