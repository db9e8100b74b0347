//! In-memory representation of a single normalized syslog record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The wire dialect a record was decoded from.
///
/// Anything that is not a well-formed RFC 5424 frame ends up as `Rfc3164`,
/// including frames that carried no recognizable header at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rfc {
    #[default]
    Rfc3164,
    Rfc5424,
}

/// Syslog facilities, values 0..=23 as encoded in the PRI header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Facility {
    Kernel = 0,
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    Authpriv = 10,
    Ftp = 11,
    Ntp = 12,
    Audit = 13,
    Alert = 14,
    Clock = 15,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl Facility {
    /// Convert the wire value into a `Facility`.
    pub fn from_int(value: u8) -> Option<Self> {
        let facility = match value {
            0 => Facility::Kernel,
            1 => Facility::User,
            2 => Facility::Mail,
            3 => Facility::Daemon,
            4 => Facility::Auth,
            5 => Facility::Syslog,
            6 => Facility::Lpr,
            7 => Facility::News,
            8 => Facility::Uucp,
            9 => Facility::Cron,
            10 => Facility::Authpriv,
            11 => Facility::Ftp,
            12 => Facility::Ntp,
            13 => Facility::Audit,
            14 => Facility::Alert,
            15 => Facility::Clock,
            16 => Facility::Local0,
            17 => Facility::Local1,
            18 => Facility::Local2,
            19 => Facility::Local3,
            20 => Facility::Local4,
            21 => Facility::Local5,
            22 => Facility::Local6,
            23 => Facility::Local7,
            _ => return None,
        };

        Some(facility)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Facility::Kernel => "kernel",
            Facility::User => "user",
            Facility::Mail => "mail",
            Facility::Daemon => "daemon",
            Facility::Auth => "auth",
            Facility::Syslog => "syslog",
            Facility::Lpr => "lpr",
            Facility::News => "news",
            Facility::Uucp => "uucp",
            Facility::Cron => "cron",
            Facility::Authpriv => "authpriv",
            Facility::Ftp => "ftp",
            Facility::Ntp => "ntp",
            Facility::Audit => "audit",
            Facility::Alert => "alert",
            Facility::Clock => "clock",
            Facility::Local0 => "local0",
            Facility::Local1 => "local1",
            Facility::Local2 => "local2",
            Facility::Local3 => "local3",
            Facility::Local4 => "local4",
            Facility::Local5 => "local5",
            Facility::Local6 => "local6",
            Facility::Local7 => "local7",
        }
    }
}

/// Syslog severities, values 0..=7 as encoded in the PRI header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

impl Severity {
    /// Convert the wire value into a `Severity`.
    pub fn from_int(value: u8) -> Option<Self> {
        let severity = match value {
            0 => Severity::Emergency,
            1 => Severity::Alert,
            2 => Severity::Critical,
            3 => Severity::Error,
            4 => Severity::Warning,
            5 => Severity::Notice,
            6 => Severity::Informational,
            7 => Severity::Debug,
            _ => return None,
        };

        Some(severity)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Emergency => "emergency",
            Severity::Alert => "alert",
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Informational => "informational",
            Severity::Debug => "debug",
        }
    }
}

/// Structured data: SD-ID to a map of param name to decoded param value.
/// Later occurrences of the same key overwrite earlier ones.
pub type StructuredData = HashMap<String, HashMap<String, String>>;

/// A normalized syslog record.
///
/// Built field by field by the parser, then stamped with the transport peer
/// address (`raw_ip_address`) by the decoder stage. Consumers treat records
/// as immutable.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Record {
    pub rfc: Rfc,
    pub facility: Option<Facility>,
    pub severity: Option<Severity>,
    /// Present only for RFC 5424 frames, where the only valid value is 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    /// Always UTC; original offsets are converted away during parsing.
    pub timestamp: Option<DateTime<Utc>>,
    pub hostname: Option<String>,
    pub app_name: Option<String>,
    pub process_id: Option<String>,
    pub message_id: Option<String>,
    /// A bare IPv4 address found after the hostname (legacy dialect only).
    pub ip_address: Option<String>,
    /// Peer address of the transport the frame arrived on.
    pub raw_ip_address: Option<String>,
    pub structured_data: StructuredData,
    /// Free text. On catastrophic parse failure this is the entire
    /// original frame.
    pub message: String,
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
