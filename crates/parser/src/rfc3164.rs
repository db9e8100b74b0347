//! Tolerant RFC 3164 parsing.
//!
//! This path never fails: the worst case is a record carrying only the PRI
//! fields (when the header had one) with `message` set to the entire
//! original frame. Everything after the timestamp is optional and degrades
//! gracefully, so the only hard failure left is an unrecognizable
//! timestamp.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::ParseError;
use crate::pri;
use crate::record::Record;
use crate::{structured_data, timestamp};

const HOSTNAME_MAX: usize = 255;
const APP_NAME_MAX: usize = 48;
const PROCESS_ID_MAX: usize = 128;

pub(crate) fn parse(input: &str, now: DateTime<Utc>, timezones: &HashMap<String, Tz>) -> Record {
    let mut record = Record::default();

    let rest = match pri::parse_pri(input) {
        Ok((facility, severity, rest)) => {
            record.facility = Some(facility);
            record.severity = Some(severity);
            rest
        }
        Err(_) => {
            // No recognizable header at all: the whole frame is the message.
            record.message = input.to_string();
            return record;
        }
    };

    // Cisco devices may insert a sequence number between PRI and timestamp.
    let rest = skip_sequence_number(rest);

    let rest = match timestamp::parse_rfc3164(rest, now, timezones) {
        Some((instant, rest)) => {
            record.timestamp = Some(instant);
            rest
        }
        None => {
            tracing::warn!(
                error = %ParseError::TimestampInvalid,
                "unparseable legacy timestamp, keeping the whole frame as message"
            );
            record.message = input.to_string();
            return record;
        }
    };

    let mut rest = rest.trim_start_matches(' ');

    // Cisco-style messages carry no hostname; recognize them by the shape
    // of the remainder (`%...`, `: %...` or `ABBR : %...`).
    match skip_missing_hostname(rest) {
        Some(after) => rest = after,
        None => {
            if let Some(after) = rest.strip_prefix(": ") {
                // A bare colon marks an empty hostname slot.
                rest = after.trim_start_matches(' ');
            } else {
                let (token, after) = split_token(rest);
                // A colon- or bracket-bearing first token is the tag, not a
                // hostname.
                if !token.is_empty() && !token.contains(':') && !token.contains('[') {
                    if token.len() <= HOSTNAME_MAX {
                        record.hostname = Some(token.to_string());
                    } else {
                        tracing::warn!(
                            error = %ParseError::FieldTooLong("hostname"),
                            length = token.len(),
                            limit = HOSTNAME_MAX,
                            "dropping over-long hostname"
                        );
                    }
                    rest = after.strip_prefix(' ').unwrap_or(after);
                }

                // An optional bare IPv4 address can follow the hostname.
                let (candidate, after) = split_token(rest);
                if candidate.parse::<Ipv4Addr>().is_ok() {
                    record.ip_address = Some(candidate.to_string());
                    rest = after.strip_prefix(' ').unwrap_or(after);
                }
            }
        }
    }

    // The classic `APP-NAME[PROCID]:` tag, brackets optional.
    if let Some((app_name, process_id, after)) = parse_tag(rest) {
        if app_name.len() <= APP_NAME_MAX {
            record.app_name = Some(app_name.to_string());
        } else {
            tracing::warn!(
                error = %ParseError::FieldTooLong("app_name"),
                length = app_name.len(),
                limit = APP_NAME_MAX,
                "dropping over-long app name"
            );
        }
        if let Some(process_id) = process_id {
            if process_id.len() <= PROCESS_ID_MAX {
                record.process_id = Some(process_id.to_string());
            } else {
                tracing::warn!(
                    error = %ParseError::FieldTooLong("process_id"),
                    length = process_id.len(),
                    limit = PROCESS_ID_MAX,
                    "dropping over-long process id"
                );
            }
        }
        rest = after;
    }

    // Structured data is optional and comes in two shapes; bracketed text
    // that fails to parse is ordinary message content, not an error.
    if rest.starts_with('[') {
        if let Ok((elements, after)) = structured_data::parse_rfc5424(rest) {
            record.structured_data = elements;
            rest = after.strip_prefix(' ').unwrap_or(after);
        }
    } else if rest.starts_with("%[") {
        if let Ok((elements, after)) = structured_data::parse_cisco(rest) {
            record.structured_data = elements;
            rest = after.strip_prefix(' ').unwrap_or(after);
        }
    }

    record.message = rest.to_string();
    record
}

/// Skip a Cisco `N: ` sequence number, e.g. `<189>8103: Apr ...`.
fn skip_sequence_number(input: &str) -> &str {
    let digits = input.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits > 0
        && let Some(rest) = input[digits..].strip_prefix(": ")
    {
        return rest;
    }
    input
}

/// Returns the remainder after the hostname slot when the message shape
/// says there is no hostname: `%...`, `: %...`, or `ABBR : %...` (a leftover
/// timezone abbreviation in front of a Cisco message).
fn skip_missing_hostname(input: &str) -> Option<&str> {
    if input.starts_with('%') {
        return Some(input);
    }

    if let Some(after) = input.strip_prefix(':') {
        let after = after.trim_start_matches(' ');
        if after.starts_with('%') {
            return Some(after);
        }
    }

    let (token, rest) = split_token(input);
    if timestamp::is_abbreviation(token) {
        let rest = rest.trim_start_matches(' ');
        if let Some(after) = rest.strip_prefix(':') {
            let after = after.trim_start_matches(' ');
            if after.starts_with('%') {
                return Some(after);
            }
        }
    }

    None
}

fn split_token(input: &str) -> (&str, &str) {
    match input.find(' ') {
        Some(index) => input.split_at(index),
        None => (input, ""),
    }
}

/// `APP-NAME[PROCID]:` or `APP-NAME:`; returns the remainder after the
/// colon and its separating space. Anything that does not end in a colon is
/// message content, not a tag.
fn parse_tag(input: &str) -> Option<(&str, Option<&str>, &str)> {
    if input.starts_with("%[") {
        return None;
    }

    let end = input.find(|c: char| c == '[' || c == ':' || c.is_whitespace())?;
    let app_name = &input[..end];
    if app_name.is_empty() {
        return None;
    }

    let mut rest = &input[end..];
    let mut process_id = None;
    if rest.starts_with('[') {
        let close = rest.find(']')?;
        process_id = Some(&rest[1..close]);
        rest = &rest[close + 1..];
    }

    let rest = rest.strip_prefix(':')?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    Some((app_name, process_id, rest))
}

#[cfg(test)]
#[path = "rfc3164_test.rs"]
mod rfc3164_test;
