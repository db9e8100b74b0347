//! hark - a syslog ingestion daemon.
//!
//! # Usage
//!
//! ```bash
//! # UDP on the default port 5544
//! hark
//!
//! # TCP on a custom port
//! hark --protocol tcp --port 1514
//!
//! # With a config file
//! hark --config hark.toml
//! ```

mod config;
mod sink;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{Config, Protocol};
use hark_parser::Parser as SyslogParser;
use hark_pipeline::{Decoder, DemandDispatcher};
use hark_sources::Listener;

/// Syslog ingestion daemon: receives RFC 5424 / RFC 3164 frames over UDP
/// or TCP and emits normalized records to stdout as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "hark")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Listen port (default 5544; 0 requests an OS-assigned port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Transport protocol
    #[arg(long, value_enum)]
    protocol: Option<ProtocolArg>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProtocolArg {
    Udp,
    Tcp,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    // CLI flags override the file.
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(protocol) = cli.protocol {
        config.listener.protocol = match protocol {
            ProtocolArg::Udp => Protocol::Udp,
            ProtocolArg::Tcp => Protocol::Tcp,
        };
    }
    let log_level = cli.log_level.unwrap_or_else(|| config.log.level.clone());
    init_logging(&log_level)?;

    run(config).await
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let timezones = config.timezone_table().context("resolving [timezones]")?;
    let parser = SyslogParser::with_timezones(timezones);

    // Listener -> decoder -> stdout sink, each boundary carrying its own
    // demand budget.
    let mut to_decoder = DemandDispatcher::new();
    let frames = to_decoder.subscribe(config.decoder.demand);
    let mut to_sink = DemandDispatcher::new();
    let records = to_sink.subscribe(config.decoder.sink_demand);

    let listener = Listener::start(config.listener.listener_config(), to_decoder)
        .await
        .context("starting listener")?;
    tracing::info!(
        port = listener.port(),
        protocol = ?config.listener.protocol,
        "hark listening"
    );

    let decoder = Decoder::new(parser).start(frames, to_sink);
    let sink = tokio::spawn(sink::write_json_lines(records));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down");

    listener.stop().await.context("stopping listener")?;
    decoder.stop().await;
    let _ = sink.await;

    Ok(())
}
