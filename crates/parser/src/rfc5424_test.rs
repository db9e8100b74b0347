//! Tests for the RFC 5424 path, including the normative examples and the
//! fallback behavior.

use chrono::{NaiveDate, TimeZone, Utc};

use crate::record::{Facility, Rfc, Severity};
use crate::Parser;

fn parse(input: &str) -> crate::Record {
    Parser::new().parse(input)
}

fn utc_micro(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    micros: u32,
) -> chrono::DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_micro_opt(hour, minute, second, micros)
        .unwrap();
    Utc.from_utc_datetime(&naive)
}

#[test]
fn pri_round_trips_for_the_whole_range() {
    for pri in 0u16..=191 {
        let frame = format!("<{pri}>1 - - - - - -");
        let record = parse(&frame);
        assert_eq!(record.rfc, Rfc::Rfc5424);
        assert_eq!(record.version, Some(1));
        assert_eq!(record.facility.map(|f| f as u16), Some(pri >> 3));
        assert_eq!(record.severity.map(|s| s as u16), Some(pri & 7));
    }
}

#[test]
fn all_fields_absent() {
    let record = parse("<1>1 - - - - - -");
    assert!(record.timestamp.is_none());
    assert!(record.hostname.is_none());
    assert!(record.app_name.is_none());
    assert!(record.process_id.is_none());
    assert!(record.message_id.is_none());
    assert!(record.structured_data.is_empty());
    assert_eq!(record.message, "");
}

#[test]
fn rfc_example_with_bom_message() {
    let record = parse(
        "<34>1 1985-04-12T23:20:50.52Z mymachine.example.com su - ID47 - \
         BOM'su root' failed for lonvick on /dev/pts/8",
    );
    assert_eq!(record.rfc, Rfc::Rfc5424);
    assert_eq!(record.facility, Some(Facility::Auth));
    assert_eq!(record.severity, Some(Severity::Critical));
    assert_eq!(
        record.timestamp,
        Some(utc_micro(1985, 4, 12, 23, 20, 50, 520_000))
    );
    assert_eq!(record.hostname.as_deref(), Some("mymachine.example.com"));
    assert_eq!(record.app_name.as_deref(), Some("su"));
    assert!(record.process_id.is_none());
    assert_eq!(record.message_id.as_deref(), Some("ID47"));
    assert_eq!(record.message, "'su root' failed for lonvick on /dev/pts/8");
}

#[test]
fn utf8_byte_order_mark_is_stripped_too() {
    let record = parse("<34>1 - - - - - - \u{feff}payload");
    assert_eq!(record.message, "payload");
}

#[test]
fn offset_timestamps_normalize_to_utc() {
    let record = parse("<34>1 1985-04-12T19:20:50.52-04:00 host app - - - m");
    assert_eq!(
        record.timestamp,
        Some(utc_micro(1985, 4, 12, 23, 20, 50, 520_000))
    );

    let record = parse("<165>1 2003-08-24T05:14:15.000003-07:00 192.0.2.1 myproc 8710 - - m");
    assert_eq!(
        record.timestamp,
        Some(utc_micro(2003, 8, 24, 12, 14, 15, 3))
    );
    assert_eq!(record.facility, Some(Facility::Local4));
    assert_eq!(record.severity, Some(Severity::Notice));
    assert_eq!(record.hostname.as_deref(), Some("192.0.2.1"));
    assert_eq!(record.app_name.as_deref(), Some("myproc"));
    assert_eq!(record.process_id.as_deref(), Some("8710"));
}

#[test]
fn structured_data_elements_and_message() {
    let record = parse(
        r#"<165>1 2003-10-11T22:14:15.003Z mymachine.example.com evntslog - ID47 [exampleSDID@32473 iut="3" eventSource="Application" eventID="1011"] BOMAn application event log entry..."#,
    );
    assert_eq!(record.structured_data.len(), 1);
    let params = &record.structured_data["exampleSDID@32473"];
    assert_eq!(params["iut"], "3");
    assert_eq!(params["eventSource"], "Application");
    assert_eq!(params["eventID"], "1011");
    assert_eq!(record.message, "An application event log entry...");
}

#[test]
fn multiple_structured_data_elements_without_message() {
    let record = parse(
        r#"<165>1 2003-10-11T22:14:15.003Z mymachine.example.com evntslog - ID47 [exampleSDID@32473 iut="3"][examplePriority@32473 class="high"]"#,
    );
    assert_eq!(record.structured_data.len(), 2);
    assert_eq!(
        record.structured_data["examplePriority@32473"]["class"],
        "high"
    );
    assert_eq!(record.message, "");
}

#[test]
fn escaped_param_values_round_trip() {
    // ESC replaces \ " ] with their escaped forms; parsing must restore the
    // original string.
    let cases = [r#"plain"#, r#"with "quotes""#, r#"back\slash"#, r#"brack]et"#];
    for original in cases {
        let escaped = original
            .replace('\\', r"\\")
            .replace('"', r#"\""#)
            .replace(']', r"\]");
        let frame = format!(r#"<1>1 - - - - - [meta k="{escaped}"] m"#);
        let record = parse(&frame);
        assert_eq!(
            record.structured_data["meta"]["k"], original,
            "escaped form: {escaped}"
        );
    }
}

#[test]
fn malformed_structured_data_keeps_the_remainder_as_message() {
    let record = parse("<13>1 2019-02-13T19:48:34+00:00 host root 8449 - [incorrect x] qwerty");
    assert_eq!(record.rfc, Rfc::Rfc5424);
    assert_eq!(record.hostname.as_deref(), Some("host"));
    assert!(record.structured_data.is_empty());
    assert_eq!(record.message, "[incorrect x] qwerty");
}

#[test]
fn over_long_fields_are_dropped_without_failing_the_frame() {
    let long_host = "h".repeat(256);
    let record = parse(&format!("<1>1 - {long_host} app - msgid - m"));
    assert_eq!(record.rfc, Rfc::Rfc5424);
    assert!(record.hostname.is_none());
    assert_eq!(record.app_name.as_deref(), Some("app"));
    assert_eq!(record.message_id.as_deref(), Some("msgid"));
    assert_eq!(record.message, "m");

    let long_app = "a".repeat(49);
    let record = parse(&format!("<1>1 - host {long_app} - msgid - m"));
    assert!(record.app_name.is_none());
    assert_eq!(record.hostname.as_deref(), Some("host"));

    let long_procid = "p".repeat(129);
    let record = parse(&format!("<1>1 - host app {long_procid} msgid - m"));
    assert!(record.process_id.is_none());
    assert_eq!(record.message_id.as_deref(), Some("msgid"));

    let long_msgid = "i".repeat(33);
    let record = parse(&format!("<1>1 - host app - {long_msgid} - m"));
    assert!(record.message_id.is_none());
    assert_eq!(record.message, "m");
}

#[test]
fn nanosecond_fraction_falls_back_to_the_legacy_path() {
    let frame = "<34>1 2003-08-24T05:14:15.000000003-07:00 mymachine.example.com su - ID47 - m";
    let record = parse(frame);
    assert_eq!(record.rfc, Rfc::Rfc3164);
    assert_eq!(record.facility, Some(Facility::Auth));
    assert_eq!(record.severity, Some(Severity::Critical));
    assert!(record.version.is_none());
    assert!(record.timestamp.is_none());
    assert_eq!(record.message, frame);
}

#[test]
fn other_versions_fall_back_to_the_legacy_path() {
    let record = parse("<34>2 2003-10-11T22:14:15.003Z host app - - - m");
    assert_eq!(record.rfc, Rfc::Rfc3164);
    assert!(record.version.is_none());

    let record = parse("<34>10 2003-10-11T22:14:15.003Z host app - - - m");
    assert_eq!(record.rfc, Rfc::Rfc3164);
}

#[test]
fn truncated_header_falls_back_to_the_legacy_path() {
    let frame = "<39>1 2018-05-15T20:56:58+00:00 host -";
    let record = parse(frame);
    assert_eq!(record.rfc, Rfc::Rfc3164);
    assert_eq!(record.message, frame);
}
