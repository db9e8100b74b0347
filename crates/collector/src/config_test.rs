//! Tests for configuration loading.

use std::str::FromStr;

use hark_sources::Transport;

use crate::config::{Config, Protocol};

#[test]
fn empty_config_is_a_udp_daemon_on_the_default_port() {
    let config = Config::from_str("").unwrap();
    assert_eq!(config.listener.port, 5544);
    assert_eq!(config.listener.protocol, Protocol::Udp);
    assert_eq!(config.listener.address, "0.0.0.0");
    assert!(config.timezones.is_empty());

    let listener = config.listener.listener_config();
    assert_eq!(listener.transport, Transport::Udp);
    assert_eq!(listener.port, 5544);
}

#[test]
fn listener_section_overrides() {
    let config = Config::from_str(
        r#"
[listener]
address = "127.0.0.1"
port = 1514
protocol = "tcp"
max_frame_size = 4096
"#,
    )
    .unwrap();

    let listener = config.listener.listener_config();
    assert_eq!(listener.transport, Transport::Tcp);
    assert_eq!(listener.address, "127.0.0.1");
    assert_eq!(listener.port, 1514);
    assert_eq!(listener.max_frame_size, 4096);
}

#[test]
fn decoder_demand_budgets() {
    let config = Config::from_str("[decoder]\ndemand = 8\nsink_demand = 4\n").unwrap();
    assert_eq!(config.decoder.demand, 8);
    assert_eq!(config.decoder.sink_demand, 4);
}

#[test]
fn timezone_table_resolves_iana_names() {
    let config = Config::from_str(
        r#"
[timezones]
IST = "Asia/Kolkata"
AEST = "Australia/Sydney"
"#,
    )
    .unwrap();

    let table = config.timezone_table().unwrap();
    assert_eq!(table.len(), 2);
    assert!(table
        .iter()
        .any(|(abbr, tz)| abbr == "IST" && *tz == chrono_tz::Asia::Kolkata));
}

#[test]
fn unknown_timezone_names_are_rejected() {
    let config = Config::from_str("[timezones]\nXYZ = \"Not/AZone\"\n").unwrap();
    let error = config.timezone_table().unwrap_err();
    assert!(error.to_string().contains("XYZ"));
}

#[test]
fn unknown_protocols_are_rejected() {
    assert!(Config::from_str("[listener]\nprotocol = \"sctp\"\n").is_err());
}
