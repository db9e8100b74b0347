//! TOML configuration.
//!
//! Every section is optional; a missing file's worth of defaults is a
//! working UDP daemon on port 5544.
//!
//! ```toml
//! [listener]
//! protocol = "tcp"
//! port = 1514
//!
//! [timezones]
//! IST = "Asia/Kolkata"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::Deserialize;

use hark_sources::{ListenerConfig, Transport};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown timezone {name:?} for abbreviation {abbreviation:?}")]
    UnknownTimezone { abbreviation: String, name: String },
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listener: ListenerSection,
    pub decoder: DecoderSection,
    pub log: LogSection,
    /// Extra timezone abbreviations for the legacy parser, mapping an
    /// abbreviation to an IANA zone name. Merged over the built-in table.
    pub timezones: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Udp,
    Tcp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerSection {
    /// Bind address.
    pub address: String,

    /// Listen port; 0 requests an OS-assigned port.
    pub port: u16,

    /// Transport protocol.
    pub protocol: Protocol,

    /// Upper bound on a single frame's payload.
    pub max_frame_size: usize,

    /// Socket receive buffer size.
    pub recv_buffer_size: usize,
}

impl Default for ListenerSection {
    fn default() -> Self {
        let defaults = ListenerConfig::default();
        Self {
            address: defaults.address,
            port: defaults.port,
            protocol: Protocol::Udp,
            max_frame_size: defaults.max_frame_size,
            recv_buffer_size: defaults.recv_buffer_size,
        }
    }
}

impl ListenerSection {
    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            address: self.address.clone(),
            port: self.port,
            transport: match self.protocol {
                Protocol::Udp => Transport::Udp,
                Protocol::Tcp => Transport::Tcp,
            },
            max_frame_size: self.max_frame_size,
            recv_buffer_size: self.recv_buffer_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoderSection {
    /// Demand budget between the listener and the decoder.
    pub demand: usize,

    /// Demand budget between the decoder and the record sink.
    pub sink_demand: usize,
}

impl Default for DecoderSection {
    fn default() -> Self {
        Self {
            demand: hark_pipeline::DEFAULT_DEMAND,
            sink_demand: hark_pipeline::DEFAULT_DEMAND,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    /// Resolve the `[timezones]` section into the parser's table shape.
    pub fn timezone_table(&self) -> Result<Vec<(String, Tz)>, ConfigError> {
        self.timezones
            .iter()
            .map(|(abbreviation, name)| {
                let zone = name
                    .parse::<Tz>()
                    .map_err(|_| ConfigError::UnknownTimezone {
                        abbreviation: abbreviation.clone(),
                        name: name.clone(),
                    })?;
                Ok((abbreviation.clone(), zone))
            })
            .collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
