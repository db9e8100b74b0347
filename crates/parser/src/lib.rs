//! Tolerant syslog parser.
//!
//! Syslog is an irregular wire format: modern RFC 5424 frames coexist with
//! legacy RFC 3164 frames, Cisco CUCM headers, sequence-number prefixes,
//! nonstandard timezone abbreviations and 12-hour clocks. The parser here
//! accepts all of them and never fails: RFC 5424 is attempted first and any
//! header error falls back to the tolerant RFC 3164 path, whose worst case
//! is a record carrying only the PRI fields with the entire original frame
//! as the message.
//!
//! ```
//! use hark_parser::{Facility, Parser, Severity};
//!
//! let parser = Parser::new();
//! let record = parser.parse(
//!     "<34>1 2003-10-11T22:14:15.003Z mymachine.example.com su - ID47 - hi",
//! );
//! assert_eq!(record.facility, Some(Facility::Auth));
//! assert_eq!(record.severity, Some(Severity::Critical));
//! assert_eq!(record.hostname.as_deref(), Some("mymachine.example.com"));
//! assert_eq!(record.message, "hi");
//! ```

mod error;
mod pri;
mod record;
mod rfc3164;
mod rfc5424;
mod structured_data;
mod timestamp;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub use error::ParseError;
pub use record::{Facility, Record, Rfc, Severity, StructuredData};

/// A configured syslog parser.
///
/// Holds the timezone-abbreviation table used by the legacy dialects. The
/// built-in table is deliberately small (`BST`, `CST`, `CET`); deployments
/// extend it through configuration rather than code. Note that `CST` maps
/// to `Europe/Brussels`, matching the upstream convention this corpus uses,
/// not the US Central zone.
#[derive(Clone, Debug)]
pub struct Parser {
    timezones: HashMap<String, Tz>,
}

impl Default for Parser {
    fn default() -> Self {
        let mut timezones = HashMap::new();
        timezones.insert("BST".to_string(), chrono_tz::Europe::London);
        timezones.insert("CST".to_string(), chrono_tz::Europe::Brussels);
        timezones.insert("CET".to_string(), chrono_tz::Europe::Brussels);
        Self { timezones }
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser whose abbreviation table is the built-in one extended (and
    /// overridden) by `abbreviations`.
    pub fn with_timezones<I>(abbreviations: I) -> Self
    where
        I: IntoIterator<Item = (String, Tz)>,
    {
        let mut parser = Self::default();
        parser.timezones.extend(abbreviations);
        parser
    }

    /// Parse one frame. Never fails; reads the wall clock once for the
    /// legacy no-year dialect.
    pub fn parse(&self, input: &str) -> Record {
        self.parse_at(input, Utc::now())
    }

    /// Like [`Parser::parse`] with an injected clock, for deterministic
    /// tests of the no-year dialect.
    pub fn parse_at(&self, input: &str, now: DateTime<Utc>) -> Record {
        match rfc5424::parse(input) {
            Ok(record) => record,
            Err(error) => {
                tracing::debug!(%error, "frame is not RFC 5424, trying RFC 3164");
                rfc3164::parse(input, now, &self.timezones)
            }
        }
    }

    /// Parse a raw frame, tolerating non-UTF-8 bytes by lossy conversion.
    pub fn parse_bytes(&self, input: &[u8]) -> Record {
        match std::str::from_utf8(input) {
            Ok(text) => self.parse(text),
            Err(_) => self.parse(&String::from_utf8_lossy(input)),
        }
    }
}
