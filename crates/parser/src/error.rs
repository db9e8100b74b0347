//! Typed parse errors.
//!
//! These never escape [`crate::Parser::parse`]; they steer the fallback
//! between the RFC 5424 and RFC 3164 paths and the in-place degradations.

use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The frame does not start with `<`.
    #[error("priority header missing")]
    PriMissing,

    /// The `<...>` content is not a decimal in 0..=191.
    #[error("priority header is not a valid decimal priority")]
    PriInvalid,

    /// The RFC 5424 version field is not the literal `1`.
    #[error("version field is not 1")]
    VersionInvalid,

    /// No timestamp grammar matched (RFC 3339 for 5424, no dialect for 3164).
    #[error("timestamp did not match any supported format")]
    TimestampInvalid,

    /// A header token exceeds its RFC-specified byte limit.
    #[error("{0} exceeds its size limit")]
    FieldTooLong(&'static str),

    /// Bracket, quote or escape mismatch inside structured data.
    #[error("malformed structured data")]
    StructuredDataInvalid,

    /// The frame ended in the middle of a mandatory header field.
    #[error("unexpected end of input")]
    UnexpectedEof,
}
