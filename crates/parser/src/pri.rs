//! PRI header parsing, shared by both RFC paths.

use crate::error::ParseError;
use crate::record::{Facility, Severity};

/// Parse `<PRI>` at the start of `input` and return the decomposed
/// facility/severity plus the remainder after `>`.
pub(crate) fn parse_pri(input: &str) -> Result<(Facility, Severity, &str), ParseError> {
    let rest = input.strip_prefix('<').ok_or(ParseError::PriMissing)?;
    let end = rest.find('>').ok_or(ParseError::PriInvalid)?;
    let digits = &rest[..end];

    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::PriInvalid);
    }

    let value: u16 = digits.parse().map_err(|_| ParseError::PriInvalid)?;
    if value > 191 {
        return Err(ParseError::PriInvalid);
    }

    let facility = Facility::from_int((value >> 3) as u8).ok_or(ParseError::PriInvalid)?;
    let severity = Severity::from_int((value & 7) as u8).ok_or(ParseError::PriInvalid)?;

    Ok((facility, severity, &rest[end + 1..]))
}
