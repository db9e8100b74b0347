//! TCP listener.
//!
//! An accept loop that never blocks the produce path: each accepted client
//! gets its own read task and registry entry. One delivered read buffer is
//! one frame; no message framing is applied on top of what the socket
//! delivers. A read error closes only the offending client, while a fatal
//! accept error stops the whole listener and surfaces through the handle.

use std::io;
use std::net::SocketAddr;
#[cfg(unix)]
use std::os::fd::{AsRawFd, FromRawFd};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hark_pipeline::{DemandDispatcher, Frame};
#[cfg(unix)]
use socket2::{Socket, TcpKeepalive};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::common::SourceMetrics;
use crate::listener::{ListenerConfig, ListenerHandle, SourceError};
use crate::registry::ClientRegistry;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub(crate) async fn start(
    config: ListenerConfig,
    output: DemandDispatcher<Frame>,
) -> Result<ListenerHandle, SourceError> {
    let bind_addr = config.bind_address();
    let acceptor = TcpListener::bind(&bind_addr)
        .await
        .map_err(|source| SourceError::Bind {
            address: bind_addr.clone(),
            source,
        })?;
    let port = acceptor.local_addr()?.port();

    let cancel = CancellationToken::new();
    let clients = ClientRegistry::new();
    let metrics = Arc::new(SourceMetrics::new());

    tracing::info!(address = %bind_addr, port, "TCP listener started");

    let task = tokio::spawn(accept_loop(
        acceptor,
        config,
        output,
        cancel.clone(),
        clients.clone(),
        Arc::clone(&metrics),
    ));

    Ok(ListenerHandle::new(port, cancel, clients, metrics, task))
}

async fn accept_loop(
    acceptor: TcpListener,
    config: ListenerConfig,
    output: DemandDispatcher<Frame>,
    cancel: CancellationToken,
    clients: ClientRegistry,
    metrics: Arc<SourceMetrics>,
) -> Result<(), SourceError> {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            accepted = acceptor.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        configure_socket(&stream, &config);

                        // Registered only once the socket is set up for
                        // asynchronous reads.
                        let client_cancel = cancel.child_token();
                        let id = clients.insert(client_cancel.clone());
                        metrics.client_opened();

                        tracing::debug!(peer = %peer, client_id = id, "client connected");

                        let client_clients = clients.clone();
                        let client_metrics = Arc::clone(&metrics);
                        let client_output = output.clone();
                        let client_config = config.clone();
                        let task = tokio::spawn(async move {
                            serve_client(
                                stream,
                                peer,
                                client_config,
                                client_output,
                                client_cancel,
                                Arc::clone(&client_metrics),
                            )
                            .await;

                            client_clients.remove(id);
                            client_metrics.client_closed();
                            tracing::debug!(peer = %peer, client_id = id, "client closed");
                        });
                        clients.attach_task(id, task);
                    }
                    Err(error) if is_transient_accept_error(&error) => {
                        metrics.error();
                        tracing::debug!(%error, "transient accept error");
                    }
                    Err(error) => {
                        metrics.error();
                        tracing::error!(%error, "fatal accept error, stopping TCP listener");
                        for task in clients.shutdown() {
                            let _ = task.await;
                        }
                        return Err(SourceError::Accept(error));
                    }
                }
            }
        }
    }

    tracing::info!("TCP listener stopped");
    Ok(())
}

/// Read loop for one client. Each successful read is emitted as one frame;
/// EOF or a read error ends only this client.
async fn serve_client(
    mut stream: TcpStream,
    peer: SocketAddr,
    config: ListenerConfig,
    mut output: DemandDispatcher<Frame>,
    cancel: CancellationToken,
    metrics: Arc<SourceMetrics>,
) {
    let mut buf = vec![0u8; config.max_frame_size];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            read = stream.read(&mut buf) => {
                match read {
                    Ok(0) => break,
                    Ok(len) => {
                        metrics.frame_received(len as u64);
                        let frame = Frame::new(Bytes::copy_from_slice(&buf[..len]), peer.ip());

                        tokio::select! {
                            biased;

                            _ = cancel.cancelled() => break,

                            dispatched = output.dispatch(frame) => {
                                if dispatched.is_err() {
                                    tracing::info!("no live subscribers, client reader pausing");
                                    cancel.cancelled().await;
                                    break;
                                }
                            }
                        }
                    }
                    Err(error) => {
                        if !is_connection_reset(&error) {
                            metrics.error();
                            tracing::debug!(peer = %peer, %error, "TCP read error");
                        }
                        break;
                    }
                }
            }
        }
    }
}

/// Set nodelay, buffer sizes and keepalive on the accepted socket.
#[cfg(unix)]
fn configure_socket(stream: &TcpStream, config: &ListenerConfig) {
    let fd = stream.as_raw_fd();

    // SAFETY: the fd is borrowed for the duration of this call; forget()
    // below keeps socket2 from closing it, tokio still owns it.
    let socket = unsafe { Socket::from_raw_fd(fd) };

    if let Err(error) = socket.set_nodelay(true) {
        tracing::warn!(%error, "failed to set TCP_NODELAY");
    }
    if let Err(error) = socket.set_recv_buffer_size(config.recv_buffer_size) {
        tracing::warn!(%error, "failed to set SO_RCVBUF");
    }

    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_INTERVAL);
    if let Err(error) = socket.set_tcp_keepalive(&keepalive) {
        tracing::warn!(%error, "failed to set TCP keepalive");
    }

    std::mem::forget(socket);
}

#[cfg(not(unix))]
fn configure_socket(stream: &TcpStream, _config: &ListenerConfig) {
    if let Err(error) = stream.set_nodelay(true) {
        tracing::warn!(%error, "failed to set TCP_NODELAY");
    }
}

/// Accept errors that do not doom the acceptor.
fn is_transient_accept_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// Read errors that are ordinary disconnects, not worth an error counter.
fn is_connection_reset(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
