//! UDP listener.
//!
//! One socket, one datagram per frame. The peer address from the receive
//! metadata rides along on each frame; receive errors are logged and the
//! loop keeps going.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use hark_pipeline::{DemandDispatcher, Frame};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::common::{trim_trailing_newline, SourceMetrics};
use crate::listener::{ListenerConfig, ListenerHandle, SourceError};
use crate::registry::ClientRegistry;

pub(crate) async fn start(
    config: ListenerConfig,
    output: DemandDispatcher<Frame>,
) -> Result<ListenerHandle, SourceError> {
    let bind_addr = config.bind_address();
    let socket_addr: SocketAddr = bind_addr.parse().map_err(|_| SourceError::Bind {
        address: bind_addr.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid socket address"),
    })?;

    let socket = bind_socket(&config, socket_addr).map_err(|source| SourceError::Bind {
        address: bind_addr.clone(),
        source,
    })?;
    let port = socket.local_addr()?.port();

    let cancel = CancellationToken::new();
    let metrics = Arc::new(SourceMetrics::new());

    tracing::info!(address = %bind_addr, port, "UDP listener started");

    let task = tokio::spawn(run(
        socket,
        config,
        output,
        cancel.clone(),
        Arc::clone(&metrics),
    ));

    Ok(ListenerHandle::new(
        port,
        cancel,
        ClientRegistry::new(),
        metrics,
        task,
    ))
}

/// Build the socket through socket2 so the receive buffer can be sized
/// before binding.
fn bind_socket(config: &ListenerConfig, addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    if let Err(error) = socket.set_recv_buffer_size(config.recv_buffer_size) {
        tracing::warn!(
            %error,
            requested_size = config.recv_buffer_size,
            "failed to set UDP SO_RCVBUF"
        );
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

async fn run(
    socket: UdpSocket,
    config: ListenerConfig,
    mut output: DemandDispatcher<Frame>,
    cancel: CancellationToken,
    metrics: Arc<SourceMetrics>,
) -> Result<(), SourceError> {
    let mut buf = vec![0u8; config.max_frame_size];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, peer)) => {
                        let payload = trim_trailing_newline(&buf[..len]);
                        if payload.is_empty() {
                            continue;
                        }

                        metrics.frame_received(len as u64);
                        let frame = Frame::new(Bytes::copy_from_slice(payload), peer.ip());

                        tokio::select! {
                            biased;

                            _ = cancel.cancelled() => break,

                            dispatched = output.dispatch(frame) => {
                                if dispatched.is_err() {
                                    tracing::info!("no live subscribers, UDP listener pausing");
                                    cancel.cancelled().await;
                                    break;
                                }
                            }
                        }
                    }
                    Err(error) => {
                        metrics.error();
                        tracing::debug!(%error, "UDP recv error");
                    }
                }
            }
        }
    }

    tracing::info!("UDP listener stopped");
    Ok(())
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
