//! The unit of work between the listener and the decoder.

use std::net::IpAddr;

use bytes::Bytes;

/// One raw frame off the wire: a UDP datagram or one TCP read buffer,
/// together with the peer address it arrived from, already formatted as
/// text the way it ends up on the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
    pub peer_ip: String,
}

impl Frame {
    pub fn new(payload: Bytes, peer: IpAddr) -> Self {
        Self {
            payload,
            peer_ip: peer.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
