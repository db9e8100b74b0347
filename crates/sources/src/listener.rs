//! The listener facade: configuration, transport dispatch and the running
//! handle.

use std::io;
use std::sync::{Arc, Mutex};

use hark_pipeline::{DemandDispatcher, Frame};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::common::{MetricsSnapshot, SourceMetrics};
use crate::registry::ClientRegistry;
use crate::{tcp, udp};

/// Default syslog ingestion port.
pub const DEFAULT_PORT: u16 = 5544;

/// Default maximum frame size (8KB). UDP datagrams larger than this are
/// truncated by the kernel; a TCP read never returns more than this per
/// frame.
const DEFAULT_MAX_FRAME_SIZE: usize = 8192;

/// Default socket receive buffer size (256KB).
const DEFAULT_RECV_BUFFER_SIZE: usize = 256 * 1024;

/// Which transport the listener binds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transport {
    #[default]
    Udp,
    Tcp,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Bind address (e.g. "0.0.0.0").
    pub address: String,

    /// Listen port; 0 requests an OS-assigned port.
    pub port: u16,

    /// Transport to bind.
    pub transport: Transport,

    /// Upper bound on a single frame's payload.
    pub max_frame_size: usize,

    /// Socket receive buffer size (SO_RCVBUF).
    pub recv_buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            transport: Transport::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl ListenerConfig {
    /// Config with a custom port on the default transport.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// The socket address to bind to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Listener errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to bind to the address.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Fatal accept failure; the listener has stopped.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The listener.
///
/// Owns one UDP socket or one TCP acceptor plus its client connections and
/// produces `(payload, peer_ip)` frames into the given dispatcher.
pub struct Listener;

impl Listener {
    /// Bind the configured transport and start producing frames.
    pub async fn start(
        config: ListenerConfig,
        output: DemandDispatcher<Frame>,
    ) -> Result<ListenerHandle, SourceError> {
        match config.transport {
            Transport::Udp => udp::start(config, output).await,
            Transport::Tcp => tcp::start(config, output).await,
        }
    }
}

/// Handle to a running listener.
#[derive(Debug)]
pub struct ListenerHandle {
    port: u16,
    cancel: CancellationToken,
    clients: ClientRegistry,
    metrics: Arc<SourceMetrics>,
    task: Mutex<Option<JoinHandle<Result<(), SourceError>>>>,
}

impl ListenerHandle {
    pub(crate) fn new(
        port: u16,
        cancel: CancellationToken,
        clients: ClientRegistry,
        metrics: Arc<SourceMetrics>,
        task: JoinHandle<Result<(), SourceError>>,
    ) -> Self {
        Self {
            port,
            cancel,
            clients,
            metrics,
            task: Mutex::new(Some(task)),
        }
    }

    /// The actually-bound port; differs from the configured one when the
    /// config requested port 0.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of live TCP clients (always 0 for UDP).
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop the listener: close the listening socket and every client
    /// socket, discard pending frames, and wait for the produce loop and
    /// every client task to finish before returning. Idempotent; returns
    /// the loop's fatal error, if it had one.
    pub async fn stop(&self) -> Result<(), SourceError> {
        self.cancel.cancel();
        for client in self.clients.shutdown() {
            let _ = client.await;
        }
        let task = self.task.lock().expect("listener task lock").take();
        match task {
            Some(task) => task.await.unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "listener_test.rs"]
mod listener_test;
