//! Network sources that receive syslog frames and feed the pipeline.
//!
//! # Available listeners
//!
//! - **UDP** - one datagram is one frame
//! - **TCP** - concurrent client connections; one delivered read buffer is
//!   one frame (any message framing on top of that is the application's
//!   concern)
//!
//! Both attach the peer address to every frame and emit downstream only
//! against outstanding demand; when demand runs out, the excess waits in
//! the OS socket queue.

mod common;
mod listener;
mod registry;
mod tcp;
mod udp;

pub use common::{MetricsSnapshot, SourceMetrics};
pub use listener::{Listener, ListenerConfig, ListenerHandle, SourceError, Transport, DEFAULT_PORT};
pub use registry::ClientRegistry;
