//! The decoder stage: frames in, normalized records out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossfire::AsyncRx;
use hark_parser::{Parser, Record};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::DemandDispatcher;
use crate::frame::Frame;

/// Decoder stage counters.
#[derive(Debug, Default)]
struct DecoderMetrics {
    frames_received: AtomicU64,
    records_emitted: AtomicU64,
}

/// Point-in-time snapshot of the decoder counters.
#[derive(Debug, Clone, Copy)]
pub struct DecoderSnapshot {
    pub frames_received: u64,
    pub records_emitted: u64,
}

/// Consumes frames from the listener, runs the parser on each payload,
/// stamps the transport peer address on the resulting record and emits it
/// downstream.
///
/// The parser is total, so every frame yields a record; degraded parses
/// surface through the parser's own warnings, not by dropping frames. On a
/// single-subscriber pipeline the decoder preserves listener order.
pub struct Decoder {
    parser: Parser,
}

impl Decoder {
    pub fn new(parser: Parser) -> Self {
        Self { parser }
    }

    /// Spawn the stage. It runs until the upstream channel closes, the
    /// handle is stopped, or every downstream subscriber disconnects (in
    /// which case it parks without emitting until stopped).
    pub fn start(
        self,
        upstream: AsyncRx<Frame>,
        mut downstream: DemandDispatcher<Record>,
    ) -> DecoderHandle {
        let cancel = CancellationToken::new();
        let metrics = Arc::new(DecoderMetrics::default());

        let task_cancel = cancel.clone();
        let task_metrics = Arc::clone(&metrics);
        let task = tokio::spawn(async move {
            tracing::debug!("decoder starting");

            loop {
                tokio::select! {
                    biased;

                    _ = task_cancel.cancelled() => break,

                    received = upstream.recv() => {
                        let frame = match received {
                            Ok(frame) => frame,
                            Err(_) => break,
                        };
                        task_metrics.frames_received.fetch_add(1, Ordering::Relaxed);

                        let mut record = self.parser.parse_bytes(&frame.payload);
                        record.raw_ip_address = Some(frame.peer_ip);

                        tokio::select! {
                            biased;

                            _ = task_cancel.cancelled() => break,

                            dispatched = downstream.dispatch(record) => {
                                if dispatched.is_err() {
                                    tracing::info!("no live subscribers, decoder pausing");
                                    task_cancel.cancelled().await;
                                    break;
                                }
                                task_metrics.records_emitted.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
            }

            tracing::debug!(
                frames_received = task_metrics.frames_received.load(Ordering::Relaxed),
                records_emitted = task_metrics.records_emitted.load(Ordering::Relaxed),
                "decoder stopped"
            );
        });

        DecoderHandle {
            cancel,
            metrics,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Handle to a running decoder stage.
pub struct DecoderHandle {
    cancel: CancellationToken,
    metrics: Arc<DecoderMetrics>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DecoderHandle {
    pub fn snapshot(&self) -> DecoderSnapshot {
        DecoderSnapshot {
            frames_received: self.metrics.frames_received.load(Ordering::Relaxed),
            records_emitted: self.metrics.records_emitted.load(Ordering::Relaxed),
        }
    }

    /// Stop the stage and wait for it to finish. Idempotent.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().expect("decoder task lock").take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
#[path = "decoder_test.rs"]
mod decoder_test;
