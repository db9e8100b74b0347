//! Structured data parsing.
//!
//! Two shapes exist in the wild: the RFC 5424 form
//! `[SD-ID name="value" ...][...]` and the Cisco form
//! `%[ key = value ][ key = value ]...:` where every bracketed pair becomes
//! an SD-ID whose sole param is named `value`.

use std::collections::HashMap;

use crate::error::ParseError;
use crate::record::StructuredData;

/// Maximum SD-ID length in bytes, per RFC 5424.
const SD_ID_MAX: usize = 32;

/// Parse `-` or one or more RFC 5424 SD-ELEMENTs at the head of `input`.
///
/// Elements whose SD-ID exceeds the size limit are parsed but not recorded.
/// Within an element, a later param overwrites an earlier one of the same
/// name; a later element overwrites an earlier one with the same SD-ID.
pub(crate) fn parse_rfc5424(input: &str) -> Result<(StructuredData, &str), ParseError> {
    if let Some(rest) = input.strip_prefix('-') {
        return Ok((StructuredData::new(), rest));
    }
    if !input.starts_with('[') {
        return Err(ParseError::StructuredDataInvalid);
    }

    let mut elements = StructuredData::new();
    let mut rest = input;
    while rest.starts_with('[') {
        let (id, params, remainder) = parse_element(rest)?;
        if id.len() > SD_ID_MAX {
            tracing::warn!(
                sd_id = id,
                limit = SD_ID_MAX,
                "sd-id exceeds size limit, dropping element"
            );
        } else {
            elements.insert(id, params);
        }
        rest = remainder;
    }

    Ok((elements, rest))
}

/// One `[SD-ID (SP name="value")*]` element.
fn parse_element(input: &str) -> Result<(String, HashMap<String, String>, &str), ParseError> {
    let mut rest = input
        .strip_prefix('[')
        .ok_or(ParseError::StructuredDataInvalid)?;

    let id_end = rest
        .find([' ', ']', '=', '"'])
        .ok_or(ParseError::StructuredDataInvalid)?;
    let id = &rest[..id_end];
    if id.is_empty() {
        return Err(ParseError::StructuredDataInvalid);
    }
    rest = &rest[id_end..];

    let mut params = HashMap::new();
    loop {
        if let Some(remainder) = rest.strip_prefix(']') {
            return Ok((id.to_string(), params, remainder));
        }
        rest = rest
            .strip_prefix(' ')
            .ok_or(ParseError::StructuredDataInvalid)?;

        let name_end = rest.find('=').ok_or(ParseError::StructuredDataInvalid)?;
        let name = &rest[..name_end];
        if name.is_empty() || name.contains([' ', ']', '"']) {
            return Err(ParseError::StructuredDataInvalid);
        }
        rest = &rest[name_end + 1..];

        let (value, remainder) = parse_param_value(rest)?;
        params.insert(name.to_string(), value);
        rest = remainder;
    }
}

/// A quoted param value with `\\`, `\"` and `\]` escapes decoded.
/// A backslash before any other character is an error.
fn parse_param_value(input: &str) -> Result<(String, &str), ParseError> {
    let rest = input
        .strip_prefix('"')
        .ok_or(ParseError::StructuredDataInvalid)?;

    let mut value = String::new();
    let mut chars = rest.char_indices();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, escaped @ ('\\' | '"' | ']'))) => value.push(escaped),
                _ => return Err(ParseError::StructuredDataInvalid),
            },
            '"' => return Ok((value, &rest[index + 1..])),
            ']' => return Err(ParseError::StructuredDataInvalid),
            other => value.push(other),
        }
    }

    Err(ParseError::StructuredDataInvalid)
}

/// The Cisco `%[ key = value ][ key = value ]...:` dialect. Keys and values
/// are whitespace-trimmed; the trailing `:` is consumed when present.
pub(crate) fn parse_cisco(input: &str) -> Result<(StructuredData, &str), ParseError> {
    let mut rest = input
        .strip_prefix('%')
        .ok_or(ParseError::StructuredDataInvalid)?;

    let mut elements = StructuredData::new();
    while rest.starts_with('[') {
        let close = rest.find(']').ok_or(ParseError::StructuredDataInvalid)?;
        let body = &rest[1..close];
        let separator = body.find('=').ok_or(ParseError::StructuredDataInvalid)?;
        let key = body[..separator].trim();
        let value = body[separator + 1..].trim();
        if key.is_empty() {
            return Err(ParseError::StructuredDataInvalid);
        }
        if key.len() > SD_ID_MAX {
            tracing::warn!(
                sd_id = key,
                limit = SD_ID_MAX,
                "sd-id exceeds size limit, dropping element"
            );
        } else {
            let mut params = HashMap::new();
            params.insert("value".to_string(), value.to_string());
            elements.insert(key.to_string(), params);
        }
        rest = &rest[close + 1..];
    }

    if elements.is_empty() {
        return Err(ParseError::StructuredDataInvalid);
    }

    let rest = rest.strip_prefix(':').unwrap_or(rest);
    Ok((elements, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_marker() {
        let (elements, rest) = parse_rfc5424("- message").unwrap();
        assert!(elements.is_empty());
        assert_eq!(rest, " message");
    }

    #[test]
    fn multiple_elements_no_separator() {
        let (elements, rest) =
            parse_rfc5424(r#"[exampleSDID@32473 iut="3"][examplePriority@32473 class="high"] m"#)
                .unwrap();
        assert_eq!(rest, " m");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements["exampleSDID@32473"]["iut"], "3");
        assert_eq!(elements["examplePriority@32473"]["class"], "high");
    }

    #[test]
    fn escapes_are_decoded() {
        let (elements, _) = parse_rfc5424(r#"[meta key="a\\b\"c\]d"]"#).unwrap();
        assert_eq!(elements["meta"]["key"], r#"a\b"c]d"#);
    }

    #[test]
    fn lone_backslash_is_an_error() {
        assert_eq!(
            parse_rfc5424(r#"[meta key="a\nb"]"#),
            Err(ParseError::StructuredDataInvalid)
        );
    }

    #[test]
    fn unescaped_bracket_in_value_is_an_error() {
        assert_eq!(
            parse_rfc5424(r#"[meta key="a]b"]"#),
            Err(ParseError::StructuredDataInvalid)
        );
    }

    #[test]
    fn later_params_overwrite() {
        let (elements, _) = parse_rfc5424(r#"[meta k="1" k="2"][meta j="3"]"#).unwrap();
        // The second [meta] element replaces the first entirely.
        assert_eq!(elements["meta"].len(), 1);
        assert_eq!(elements["meta"]["j"], "3");
    }

    #[test]
    fn empty_param_value() {
        let (elements, _) = parse_rfc5424(r#"[junos@2636 core-dump-status="" pid="14374"]"#).unwrap();
        assert_eq!(elements["junos@2636"]["core-dump-status"], "");
        assert_eq!(elements["junos@2636"]["pid"], "14374");
    }

    #[test]
    fn oversized_sd_id_is_dropped_but_parsing_continues() {
        let long_id = "a".repeat(40);
        let input = format!(r#"[{long_id} k="v"][meta k="v"] m"#);
        let (elements, rest) = parse_rfc5424(&input).unwrap();
        assert_eq!(rest, " m");
        assert_eq!(elements.len(), 1);
        assert!(elements.contains_key("meta"));
    }

    #[test]
    fn unterminated_element_is_an_error() {
        assert_eq!(
            parse_rfc5424(r#"[meta k="v""#),
            Err(ParseError::StructuredDataInvalid)
        );
        assert_eq!(
            parse_rfc5424("[incorrect x]"),
            Err(ParseError::StructuredDataInvalid)
        );
    }

    #[test]
    fn cisco_pairs_become_elements() {
        let (elements, rest) =
            parse_cisco("%[ UserID =admin][ ClusterID =][ NodeID =node1]: details").unwrap();
        assert_eq!(rest, " details");
        assert_eq!(elements["UserID"]["value"], "admin");
        assert_eq!(elements["ClusterID"]["value"], "");
        assert_eq!(elements["NodeID"]["value"], "node1");
    }

    #[test]
    fn cisco_without_pairs_is_an_error() {
        assert!(parse_cisco("%UC_AUDITLOG").is_err());
        assert!(parse_cisco("plain").is_err());
    }
}
