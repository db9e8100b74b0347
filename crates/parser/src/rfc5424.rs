//! RFC 5424 frame parsing.
//!
//! The grammar is strict: `<PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID
//! STRUCTURED-DATA [SP MSG]`. Any failure in the mandatory header means the
//! frame is not RFC 5424 and the caller falls back to the legacy path.
//! Over-long tokens and malformed structured data degrade in place instead:
//! the field stays unset and the parse continues.

use crate::error::ParseError;
use crate::pri;
use crate::record::{Record, Rfc};
use crate::{structured_data, timestamp};

const HOSTNAME_MAX: usize = 255;
const APP_NAME_MAX: usize = 48;
const PROCESS_ID_MAX: usize = 128;
const MESSAGE_ID_MAX: usize = 32;

pub(crate) fn parse(input: &str) -> Result<Record, ParseError> {
    let (facility, severity, rest) = pri::parse_pri(input)?;

    // VERSION is the literal `1` followed by a space. `<34>10 ...` is a
    // version 10 frame and not ours.
    let rest = rest.strip_prefix('1').ok_or(ParseError::VersionInvalid)?;
    let rest = rest.strip_prefix(' ').ok_or(ParseError::VersionInvalid)?;

    let mut record = Record {
        rfc: Rfc::Rfc5424,
        facility: Some(facility),
        severity: Some(severity),
        version: Some(1),
        ..Record::default()
    };

    let (instant, rest) = timestamp::parse_rfc3339(rest)?;
    record.timestamp = instant;
    let rest = expect_sp(rest)?;

    let (hostname, rest) = header_field(rest, "hostname", HOSTNAME_MAX)?;
    record.hostname = hostname;
    let rest = expect_sp(rest)?;

    let (app_name, rest) = header_field(rest, "app_name", APP_NAME_MAX)?;
    record.app_name = app_name;
    let rest = expect_sp(rest)?;

    let (process_id, rest) = header_field(rest, "process_id", PROCESS_ID_MAX)?;
    record.process_id = process_id;
    let rest = expect_sp(rest)?;

    let (message_id, rest) = header_field(rest, "message_id", MESSAGE_ID_MAX)?;
    record.message_id = message_id;
    let rest = expect_sp(rest)?;

    match structured_data::parse_rfc5424(rest) {
        Ok((elements, remainder)) => {
            record.structured_data = elements;
            record.message = message_body(remainder);
        }
        Err(error) => {
            // Keep the malformed block verbatim at the head of the message
            // rather than losing bytes.
            tracing::warn!(%error, "malformed structured data in RFC 5424 frame");
            record.message = message_body(rest);
        }
    }

    Ok(record)
}

fn expect_sp(input: &str) -> Result<&str, ParseError> {
    input.strip_prefix(' ').ok_or(ParseError::UnexpectedEof)
}

/// One space-terminated header token. `-` encodes an absent field; a token
/// over the size limit leaves the field unset without failing the frame.
fn header_field<'a>(
    input: &'a str,
    name: &'static str,
    max: usize,
) -> Result<(Option<String>, &'a str), ParseError> {
    let end = input.find(' ').unwrap_or(input.len());
    let token = &input[..end];
    if token.is_empty() {
        return Err(ParseError::UnexpectedEof);
    }
    let rest = &input[end..];

    if token == "-" {
        return Ok((None, rest));
    }
    if token.len() > max {
        tracing::warn!(
            error = %ParseError::FieldTooLong(name),
            field = name,
            length = token.len(),
            limit = max,
            "dropping over-long header field"
        );
        return Ok((None, rest));
    }

    Ok((Some(token.to_string()), rest))
}

/// MSG is everything after the structured data, minus the separating space
/// and a leading byte-order mark. This corpus encodes the BOM either as the
/// UTF-8 bytes or as the literal ASCII sequence `BOM`.
fn message_body(input: &str) -> String {
    let body = input.strip_prefix(' ').unwrap_or(input);
    let body = body
        .strip_prefix('\u{feff}')
        .or_else(|| body.strip_prefix("BOM"))
        .unwrap_or(body);
    body.to_string()
}

#[cfg(test)]
#[path = "rfc5424_test.rs"]
mod rfc5424_test;
