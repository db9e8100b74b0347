//! Tests for the UDP listener.

use std::time::Duration;

use hark_pipeline::{DemandDispatcher, Frame};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::listener::{Listener, ListenerConfig, ListenerHandle, Transport};

async fn start_listener(demand: usize) -> (ListenerHandle, crossfire::AsyncRx<Frame>) {
    let mut output = DemandDispatcher::new();
    let frames = output.subscribe(demand);

    let config = ListenerConfig {
        address: "127.0.0.1".into(),
        port: 0,
        transport: Transport::Udp,
        ..Default::default()
    };
    let handle = Listener::start(config, output).await.unwrap();
    (handle, frames)
}

async fn client_for(handle: &ListenerHandle) -> (UdpSocket, String) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = format!("127.0.0.1:{}", handle.port());
    (socket, target)
}

#[tokio::test]
async fn ephemeral_port_is_reported() {
    let (handle, _frames) = start_listener(16).await;
    assert_ne!(handle.port(), 0);
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn one_datagram_is_one_frame_with_the_peer_address() {
    let (handle, frames) = start_listener(16).await;
    let (client, target) = client_for(&handle).await;

    let msg = "<134>Dec 20 12:34:56 host test: Hello syslog UDP";
    client.send_to(msg.as_bytes(), &target).await.unwrap();

    let frame = timeout(Duration::from_secs(2), frames.recv())
        .await
        .expect("timeout waiting for frame")
        .expect("channel closed");

    assert_eq!(frame.payload.as_ref(), msg.as_bytes());
    assert_eq!(frame.peer_ip, "127.0.0.1");

    assert_eq!(handle.metrics().frames_received, 1);
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn trailing_newline_is_trimmed() {
    let (handle, frames) = start_listener(16).await;
    let (client, target) = client_for(&handle).await;

    client
        .send_to(b"<134>Dec 20 12:34:56 host test: with newline\r\n", &target)
        .await
        .unwrap();

    let frame = timeout(Duration::from_secs(2), frames.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(frame.payload.ends_with(b"with newline"));

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn frames_arrive_in_receive_order() {
    let (handle, frames) = start_listener(16).await;
    let (client, target) = client_for(&handle).await;

    for index in 0..5 {
        let msg = format!("<134>Dec 20 12:34:{index:02} host test: Message {index}");
        client.send_to(msg.as_bytes(), &target).await.unwrap();
    }

    for index in 0..5 {
        let frame = timeout(Duration::from_secs(2), frames.recv())
            .await
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&frame.payload).unwrap();
        assert!(text.ends_with(&format!("Message {index}")), "got {text}");
    }

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn emits_at_most_the_demanded_count() {
    // Demand budget of two: the listener may emit two frames, then has to
    // hold the rest in the socket queue until demand is renewed.
    let (handle, frames) = start_listener(2).await;
    let (client, target) = client_for(&handle).await;

    for index in 0..5 {
        let msg = format!("<13>msg {index}");
        client.send_to(msg.as_bytes(), &target).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(300)).await;

    // On the single-threaded test runtime the listener cannot run while we
    // drain synchronously, so exactly the demanded count is buffered.
    let mut drained = Vec::new();
    while let Ok(frame) = frames.try_recv() {
        drained.push(frame);
    }
    assert_eq!(drained.len(), 2, "listener emitted beyond its demand");

    // Renewed demand lets the remaining frames through.
    let mut total = drained.len();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while total < 5 && tokio::time::Instant::now() < deadline {
        if let Ok(Ok(_)) = timeout(Duration::from_millis(100), frames.recv()).await {
            total += 1;
        }
    }
    assert_eq!(total, 5);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (handle, _frames) = start_listener(16).await;
    handle.stop().await.unwrap();
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn udp_listener_has_no_clients() {
    let (handle, _frames) = start_listener(16).await;
    assert_eq!(handle.client_count(), 0);
    handle.stop().await.unwrap();
}
