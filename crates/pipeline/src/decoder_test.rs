//! Tests for the decoder stage.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use bytes::Bytes;
use hark_parser::{Facility, Parser, Record, Severity};
use tokio::time::timeout;

use crate::decoder::Decoder;
use crate::dispatch::DemandDispatcher;
use crate::frame::Frame;

fn frame(payload: &str) -> Frame {
    Frame::new(
        Bytes::copy_from_slice(payload.as_bytes()),
        IpAddr::V4(Ipv4Addr::LOCALHOST),
    )
}

fn wiring() -> (
    DemandDispatcher<Frame>,
    crossfire::AsyncRx<Record>,
    crate::decoder::DecoderHandle,
) {
    let mut to_decoder = DemandDispatcher::new();
    let frames = to_decoder.subscribe(16);
    let mut to_sink = DemandDispatcher::new();
    let records = to_sink.subscribe(16);
    let handle = Decoder::new(Parser::new()).start(frames, to_sink);
    (to_decoder, records, handle)
}

#[tokio::test]
async fn stamps_the_peer_address_exactly_once() {
    let (mut to_decoder, records, handle) = wiring();

    to_decoder
        .dispatch(frame("<34>1 - mymachine su - ID47 - hello"))
        .await
        .unwrap();

    let record = timeout(Duration::from_secs(1), records.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.raw_ip_address.as_deref(), Some("127.0.0.1"));
    assert_eq!(record.facility, Some(Facility::Auth));
    assert_eq!(record.severity, Some(Severity::Critical));
    assert_eq!(record.message, "hello");

    handle.stop().await;
}

#[tokio::test]
async fn preserves_upstream_order() {
    let (mut to_decoder, records, handle) = wiring();

    for index in 0..5 {
        to_decoder
            .dispatch(frame(&format!("<13>1 - - - - - - message {index}")))
            .await
            .unwrap();
    }

    for index in 0..5 {
        let record = timeout(Duration::from_secs(1), records.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.message, format!("message {index}"));
    }

    handle.stop().await;
}

#[tokio::test]
async fn degraded_frames_are_still_emitted() {
    let (mut to_decoder, records, handle) = wiring();

    let payload = "<34>Invalid timestamp format mymachine su: Test message";
    to_decoder.dispatch(frame(payload)).await.unwrap();

    let record = timeout(Duration::from_secs(1), records.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(record.timestamp.is_none());
    assert_eq!(record.message, payload);

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.frames_received, 1);
    assert_eq!(snapshot.records_emitted, 1);

    handle.stop().await;
}

#[tokio::test]
async fn stops_when_upstream_closes() {
    let (to_decoder, _records, handle) = wiring();

    drop(to_decoder);

    // The recv loop sees the closed channel and the task finishes; stop()
    // then just joins it.
    timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("decoder should stop after upstream closes");
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (_to_decoder, _records, handle) = wiring();

    handle.stop().await;
    handle.stop().await;
}
