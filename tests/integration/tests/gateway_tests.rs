//! Gateway integration tests
//!
//! Drive the real WebSocket connector against the in-process fake gateway.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use herald_core::Intents;
use herald_gateway::{
    discovery, ConnectionState, DispatchEvent, GatewayClient, GatewayConfig, GatewayHandle,
};
use integration_tests::{
    hello, message_create, ready, GatewaySocket, TestServer, TEST_SESSION, TEST_TOKEN, WAIT,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const RECONNECT_DELAY: Duration = Duration::from_millis(200);

async fn connect(server: &TestServer) -> (GatewayHandle, mpsc::UnboundedReceiver<DispatchEvent>) {
    let config = GatewayConfig::new(TEST_TOKEN).with_reconnect_delay(RECONNECT_DELAY);
    let gateway = GatewayClient::new(config).spawn();

    let (event_tx, events) = mpsc::unbounded_channel();
    gateway
        .on_event(move |event: DispatchEvent| {
            let _ = event_tx.send(event);
        })
        .await
        .expect("driver running");
    gateway
        .connect(&server.discovery_url())
        .await
        .expect("discovery should succeed");

    (gateway, events)
}

/// Complete HELLO, IDENTIFY, READY on a fresh socket
async fn handshake(server: &mut TestServer, gateway: &GatewayHandle) -> GatewaySocket {
    let mut socket = server.next_socket().await.unwrap();
    socket.send_json(hello(45_000)).await.unwrap();

    let identify = socket.recv_json().await.unwrap();
    assert_eq!(identify["op"], 2);

    socket.send_json(ready(1, &server.gateway_url())).await.unwrap();
    wait_for(gateway, ConnectionState::Ready).await;
    socket
}

async fn wait_for(gateway: &GatewayHandle, state: ConnectionState) {
    timeout(WAIT, gateway.wait_for_state(state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state}"))
        .unwrap();
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<DispatchEvent>) -> DispatchEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("handler dropped")
}

#[tokio::test]
async fn test_discovery_returns_gateway_url() {
    let server = TestServer::start().await.unwrap();

    let url = discovery::discover(&reqwest::Client::new(), &server.discovery_url())
        .await
        .unwrap();
    assert_eq!(url, server.gateway_url());
}

#[tokio::test]
async fn test_identify_and_receive_dispatches() {
    let mut server = TestServer::start().await.unwrap();
    let (gateway, mut events) = connect(&server).await;

    let mut socket = server.next_socket().await.unwrap();
    assert_eq!(socket.query.get("v").map(String::as_str), Some("10"));
    assert_eq!(socket.query.get("encoding").map(String::as_str), Some("json"));

    socket.send_json(hello(45_000)).await.unwrap();
    let identify = socket.recv_json().await.unwrap();
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], TEST_TOKEN);
    assert_eq!(identify["d"]["intents"], Intents::DEFAULT.bits());

    socket.send_json(ready(1, &server.gateway_url())).await.unwrap();
    wait_for(&gateway, ConnectionState::Ready).await;

    socket.send_json(message_create(2, 77, "yp!help")).await.unwrap();
    let event = next_event(&mut events).await;
    assert_eq!(event.name, "MESSAGE_CREATE");
    assert_eq!(event.sequence, Some(2));
    assert_eq!(event.as_message_create().unwrap().content, "yp!help");
}

#[tokio::test]
async fn test_dropped_socket_resumes_session() {
    let mut server = TestServer::start().await.unwrap();
    let (gateway, mut events) = connect(&server).await;

    let mut socket = handshake(&mut server, &gateway).await;
    socket.send_json(message_create(2, 77, "first")).await.unwrap();
    next_event(&mut events).await;

    drop(socket);

    let mut resumed = server.next_socket().await.unwrap();
    let resume = resumed.recv_json().await.unwrap();
    assert_eq!(resume["op"], 6);
    assert_eq!(resume["d"]["token"], TEST_TOKEN);
    assert_eq!(resume["d"]["session_id"], TEST_SESSION);
    assert_eq!(resume["d"]["seq"], 2);

    resumed.send_json(hello(45_000)).await.unwrap();
    resumed.expect_silence(Duration::from_millis(300)).await.unwrap();
    assert_eq!(gateway.state(), ConnectionState::Resuming);

    resumed.send_json(message_create(3, 77, "after resume")).await.unwrap();
    let event = next_event(&mut events).await;
    assert_eq!(event.as_message_create().unwrap().content, "after resume");
    wait_for(&gateway, ConnectionState::Ready).await;
}

#[tokio::test]
async fn test_invalid_session_close_starts_over() {
    let mut server = TestServer::start().await.unwrap();
    let (gateway, _events) = connect(&server).await;

    let mut socket = handshake(&mut server, &gateway).await;
    // Session timed out
    socket.send_close(4009).await.unwrap();

    let mut fresh = server.next_socket().await.unwrap();
    fresh.send_json(hello(45_000)).await.unwrap();
    let identify = fresh.recv_json().await.unwrap();
    assert_eq!(identify["op"], 2);
}

#[tokio::test]
async fn test_shutdown_closes_normally() {
    let mut server = TestServer::start().await.unwrap();
    let (gateway, _events) = connect(&server).await;

    let mut socket = handshake(&mut server, &gateway).await;
    gateway.shutdown().await.unwrap();

    assert_eq!(socket.recv_close().await.unwrap(), Some(1000));
    assert_eq!(gateway.state(), ConnectionState::Disconnected);
}
