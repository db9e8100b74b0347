//! Counters shared by the listener variants.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics kept by a listener. For UDP only the frame and error counters
/// move; the client counters track TCP connections.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Currently connected TCP clients.
    pub clients_active: AtomicU64,

    /// Total TCP clients accepted.
    pub clients_total: AtomicU64,

    /// Frames emitted downstream.
    pub frames_received: AtomicU64,

    /// Payload bytes received.
    pub bytes_received: AtomicU64,

    /// Socket errors survived.
    pub errors: AtomicU64,
}

impl SourceMetrics {
    pub const fn new() -> Self {
        Self {
            clients_active: AtomicU64::new(0),
            clients_total: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn client_opened(&self) {
        self.clients_active.fetch_add(1, Ordering::Relaxed);
        self.clients_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn client_closed(&self) {
        self.clients_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn frame_received(&self, bytes: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            clients_active: self.clients_active.load(Ordering::Relaxed),
            clients_total: self.clients_total.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of a listener's counters.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub clients_active: u64,
    pub clients_total: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub errors: u64,
}

/// Trim a trailing LF or CRLF; some syslog clients append one to datagrams.
#[inline]
pub(crate) fn trim_trailing_newline(data: &[u8]) -> &[u8] {
    let mut end = data.len();

    if end > 0 && data[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && data[end - 1] == b'\r' {
            end -= 1;
        }
    }

    &data[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_tracking() {
        let metrics = SourceMetrics::new();

        metrics.client_opened();
        metrics.client_opened();
        metrics.client_closed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.clients_active, 1);
        assert_eq!(snapshot.clients_total, 2);
    }

    #[test]
    fn frame_tracking() {
        let metrics = SourceMetrics::new();

        metrics.frame_received(100);
        metrics.frame_received(200);
        metrics.error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.bytes_received, 300);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn newline_trimming() {
        assert_eq!(trim_trailing_newline(b"hello\n"), b"hello");
        assert_eq!(trim_trailing_newline(b"hello\r\n"), b"hello");
        assert_eq!(trim_trailing_newline(b"hello"), b"hello");
        assert_eq!(trim_trailing_newline(b"\n"), b"");
        assert_eq!(trim_trailing_newline(b""), b"");
        assert_eq!(trim_trailing_newline(b"line1\nline2\n"), b"line1\nline2");
    }
}
