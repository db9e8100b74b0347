//! Demand-driven pipeline plumbing.
//!
//! The daemon is a linear pipeline of cooperating stages:
//!
//! ```text
//! Network ──► Listener ──► Decoder ──► consumer
//!             (frames)     (records)
//! ```
//!
//! Stages communicate over bounded channels whose capacity encodes the
//! subscriber's demand budget: no item crosses a stage boundary without a
//! matching unit of demand having been issued, and a producer whose
//! subscribers are all out of demand blocks, leaving the excess in the OS
//! socket queue.

mod decoder;
mod dispatch;
mod frame;

pub use decoder::{Decoder, DecoderHandle, DecoderSnapshot};
pub use dispatch::{DemandDispatcher, Unsubscribed};
pub use frame::Frame;

/// Default demand budget between two stages.
pub const DEFAULT_DEMAND: usize = 128;
