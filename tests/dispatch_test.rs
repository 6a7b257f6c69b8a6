//! Integration tests for both send paths against a mock Pushover endpoint.
//!
//! Run with: cargo test --test dispatch_test

use pushover_client::{Channel, Dispatcher, KeyStore, SendError};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MESSAGES_PATH: &str = "/1/messages.json";

fn ok_reply() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "status": 1,
        "request": "647d2300-702c-4b38-8b2f-d56326ae460b"
    }))
}

fn dispatcher_for(server: &MockServer) -> Dispatcher {
    Dispatcher::with_endpoint(format!("{}{MESSAGES_PATH}", server.uri())).expect("dispatcher")
}

fn channel() -> Channel {
    let keys: KeyStore = r#"{"app": {"home": "app-secret"}, "rec": {"me": "rec-secret"}}"#
        .parse()
        .expect("keys");
    keys.resolve("home", "me").expect("resolve")
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_send_and_wait_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("token=app-secret"))
        .and(body_string_contains("user=rec-secret"))
        .and(body_string_contains("title=Door"))
        .and(body_string_contains("message=Front+door+opened"))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    dispatcher
        .send_and_wait(&channel(), "Door", "Front door opened", Duration::from_secs(5))
        .await
        .expect("send succeeds");
}

#[tokio::test]
async fn test_send_and_wait_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = dispatcher_for(&server)
        .send_and_wait(&channel(), "t", "b", Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        SendError::Server(status) => assert_eq!(status.as_u16(), 503),
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_and_wait_client_error_counts_as_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "user": "invalid",
            "errors": ["user identifier is invalid"],
            "status": 0,
            "request": "5042853c-402d-4a18-abcb-168734a801de"
        })))
        .mount(&server)
        .await;

    let result = dispatcher_for(&server)
        .send_and_wait(&channel(), "t", "b", Duration::from_secs(5))
        .await;
    assert!(result.is_ok(), "4xx should not fail: {result:?}");
}

#[tokio::test]
async fn test_send_and_wait_non_json_reply_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    dispatcher_for(&server)
        .send_and_wait(&channel(), "t", "b", Duration::from_secs(5))
        .await
        .expect("plain body accepted");
}

#[tokio::test]
async fn test_send_and_wait_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply().set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = dispatcher_for(&server)
        .send_and_wait(&channel(), "t", "b", Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err:?}");
    assert!(matches!(err, SendError::Network(_)));
}

#[tokio::test]
async fn test_send_and_wait_zero_timeout_is_unbounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply().set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher_for(&server)
        .send_and_wait(&channel(), "t", "b", Duration::ZERO)
        .await;
    assert!(result.is_ok(), "zero timeout should wait for the reply: {result:?}");
}

#[tokio::test]
async fn test_send_and_wait_connection_refused() {
    // Bind then drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("free port")
        .port();
    let dispatcher =
        Dispatcher::with_endpoint(format!("http://127.0.0.1:{port}{MESSAGES_PATH}"))
            .expect("dispatcher");

    let err = dispatcher
        .send_and_wait(&channel(), "t", "b", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, SendError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_throttle_applies_to_waiting_sends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let channel = channel();
    channel.set_throttle(Duration::from_secs(60));

    dispatcher
        .send_and_wait(&channel, "t", "first", Duration::from_secs(5))
        .await
        .expect("first send");
    let err = dispatcher
        .send_and_wait(&channel, "t", "second", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(err.is_throttled());
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_failed_send_still_consumes_window() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let channel = channel();
    channel.set_throttle(Duration::from_secs(60));

    let first = dispatcher
        .send_and_wait(&channel, "t", "b", Duration::from_secs(5))
        .await;
    assert!(matches!(first, Err(SendError::Server(_))));

    let second = dispatcher
        .send_and_wait(&channel, "t", "b", Duration::from_secs(5))
        .await;
    assert!(matches!(second, Err(SendError::Throttled)));

    channel.reset_throttle();
    let third = dispatcher
        .send_and_wait(&channel, "t", "b", Duration::from_secs(5))
        .await;
    assert!(matches!(third, Err(SendError::Server(_))));
}

#[tokio::test]
async fn test_background_send_returns_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply().set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let started = Instant::now();
    dispatcher
        .send(&channel(), "Slow", "server")
        .expect("accepted");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(dispatcher.pending(), 1);

    assert!(dispatcher.shutdown(Duration::from_secs(10)).await);
    assert_eq!(dispatcher.pending(), 0);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_background_send_swallows_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    assert!(dispatcher.send(&channel(), "t", "b").is_ok());
    assert!(dispatcher.shutdown(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_background_throttle_is_synchronous() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let channel = channel();
    channel.set_throttle(Duration::from_secs(60));

    assert!(dispatcher.send(&channel, "t", "one").is_ok());
    for _ in 0..5 {
        let err = dispatcher.send(&channel, "t", "again").unwrap_err();
        assert!(err.is_throttled());
    }
    assert!(dispatcher.shutdown(Duration::from_secs(5)).await);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_shutdown_gives_up_after_grace() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply().set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    dispatcher.send(&channel(), "t", "b").expect("accepted");

    assert!(!dispatcher.shutdown(Duration::from_millis(200)).await);
    assert_eq!(dispatcher.pending(), 1);
}

#[tokio::test]
async fn test_shared_channel_across_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply())
        .mount(&server)
        .await;

    let dispatcher = std::sync::Arc::new(dispatcher_for(&server));
    let channel = std::sync::Arc::new(channel());
    channel.set_throttle(Duration::from_secs(60));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = std::sync::Arc::clone(&dispatcher);
            let channel = std::sync::Arc::clone(&channel);
            tokio::spawn(async move {
                dispatcher
                    .send_and_wait(&channel, "t", &format!("msg {i}"), Duration::from_secs(5))
                    .await
                    .is_ok()
            })
        })
        .collect();

    let mut sent = 0;
    for task in tasks {
        if task.await.expect("task panicked") {
            sent += 1;
        }
    }
    assert_eq!(sent, 1);
    assert_eq!(request_count(&server).await, 1);
}
