//! REST integration tests
//!
//! Drive the reqwest transport and the dispatcher against the fake REST API.
//!
//! Run with: cargo test -p integration-tests --test rest_tests

use herald_core::Snowflake;
use herald_rest::{
    DispatchError, Dispatcher, HttpRestTransport, OutboundMessage, RateBudget, RestTransport,
};
use integration_tests::{ScriptedReply, TestServer, TEST_TOKEN};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_transport_posts_message_with_credentials() {
    let mut server = TestServer::start().await.unwrap();
    server.script_reply(
        ScriptedReply::ok()
            .with_limit(5)
            .with_reset_after(Duration::from_millis(2_500)),
    );

    let transport = HttpRestTransport::new(server.api_base(), TEST_TOKEN);
    let response = transport
        .post_message(&OutboundMessage {
            channel_id: Snowflake::new(123),
            content: "hello".to_string(),
        })
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.rate_limit.limit, Some(5));
    assert_eq!(response.rate_limit.reset_after, Some(Duration::from_millis(2_500)));

    let post = server.next_post().await.unwrap();
    assert_eq!(post.channel_id, "123");
    assert_eq!(post.authorization.as_deref(), Some("Bot integration-token"));
    assert!(post.user_agent.unwrap().starts_with("DiscordBot"));
    assert_eq!(post.body, json!({"content": "hello", "tts": false}));
}

#[tokio::test]
async fn test_dispatcher_surfaces_rate_limited_response() {
    let mut server = TestServer::start().await.unwrap();
    server.script_reply(
        ScriptedReply::status(429)
            .with_limit(3)
            .with_reset_after(Duration::from_secs(1)),
    );

    let dispatcher =
        Dispatcher::new(HttpRestTransport::new(server.api_base(), TEST_TOKEN)).spawn();

    let err = dispatcher.send(Some(Snowflake::new(1)), "too fast").await.unwrap_err();
    match err {
        DispatchError::RateLimited { reset_after } => assert_eq!(reset_after, Duration::from_secs(1)),
        other => panic!("unexpected error: {other:?}"),
    }
    server.next_post().await.unwrap();

    let snapshot = dispatcher.budget().await.unwrap();
    assert_eq!(snapshot.budget.capacity(), 3);
    assert_eq!(snapshot.budget.reset_delay(), Duration::from_secs(1));
}

#[tokio::test]
async fn test_dispatcher_spaces_sends_by_reset_delay() {
    let mut server = TestServer::start().await.unwrap();
    let reset_delay = Duration::from_millis(300);

    let dispatcher = Dispatcher::new(HttpRestTransport::new(server.api_base(), TEST_TOKEN))
        .with_budget(RateBudget::new(1, reset_delay))
        .spawn();

    let first = dispatcher.enqueue(Some(Snowflake::new(1)), "A").await.unwrap();
    let second = dispatcher.enqueue(Some(Snowflake::new(1)), "B").await.unwrap();
    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap().status, 200);
    assert_eq!(second.unwrap().status, 200);

    let a = server.next_post().await.unwrap();
    let b = server.next_post().await.unwrap();
    assert_eq!(a.body["content"], "A");
    assert_eq!(b.body["content"], "B");
    assert!(b.received_at.duration_since(a.received_at) >= Duration::from_millis(250));
}

#[tokio::test]
async fn test_dispatcher_reports_rejection() {
    let mut server = TestServer::start().await.unwrap();
    server.script_reply(ScriptedReply::status(403));

    let dispatcher =
        Dispatcher::new(HttpRestTransport::new(server.api_base(), TEST_TOKEN)).spawn();

    let err = dispatcher.send(Some(Snowflake::new(1)), "nope").await.unwrap_err();
    assert!(matches!(err, DispatchError::Rejected { status: 403, .. }));
    server.next_post().await.unwrap();
}
