#![allow(clippy::unwrap_used)]
// Integration tests for `EventStreamClient` over a real SSE endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bodyctl_api::{
    ConnectionState, EventKind, EventStreamClient, PushTransport, ReconnectConfig, SseTransport,
    StreamNotice,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn sse_body(frames: &[(&str, serde_json::Value)]) -> String {
    let mut body = String::from(
        "data: {\"type\":\"welcome\",\"message\":\"connected\",\"timestamp\":1}\n\n",
    );
    for (event, payload) in frames {
        body.push_str(&format!("event: {event}\ndata: {payload}\n\n"));
    }
    body
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

fn slow_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_secs(30),
        jitter: 0.0,
        ..ReconnectConfig::default()
    }
}

async fn client_for(server: &MockServer, config: ReconnectConfig) -> EventStreamClient {
    let url = Url::parse(&format!("{}/api/events", server.uri())).unwrap();
    let transport: Arc<dyn PushTransport> = Arc::new(SseTransport::new(reqwest::Client::new(), url));
    EventStreamClient::new(transport, config)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_typed_handlers_receive_sse_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(header("accept", "text/event-stream"))
        .respond_with(sse_response(sse_body(&[
            (
                "door_lock_changed",
                json!({ "type": "door_lock_changed", "data": { "doorID": 2, "lockState": true }, "timestamp": 10 }),
            ),
            (
                "window_position_changed",
                json!({ "type": "window_position_changed", "data": { "windowID": 0, "position": 35 }, "timestamp": 11 }),
            ),
        ])))
        .mount(&server)
        .await;

    let stream = client_for(&server, slow_reconnect()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let door_tx = tx.clone();
    stream.on(EventKind::DoorLockChanged, move |env| {
        door_tx.send(("door", env.data.clone())).unwrap();
        Ok(())
    });
    stream.on(EventKind::WindowPositionChanged, move |env| {
        tx.send(("window", env.data.clone())).unwrap();
        Ok(())
    });

    stream.connect();

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, ("door", json!({ "doorID": 2, "lockState": true })));
    assert_eq!(second, ("window", json!({ "windowID": 0, "position": 35 })));

    stream.disconnect();
    assert_eq!(stream.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_welcome_reaches_generic_listener_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(sse_response(sse_body(&[])))
        .mount(&server)
        .await;

    let stream = client_for(&server, slow_reconnect()).await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    stream.on_message(move |env| {
        s.lock().unwrap().push((env.event_type.clone(), env.kind));
        Ok(())
    });

    let mut notices = stream.notices();
    stream.connect();

    // The mock closes the body after the welcome frame.
    loop {
        let notice = tokio::time::timeout(Duration::from_secs(5), notices.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(notice, StreamNotice::Disconnected) {
            break;
        }
    }

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("welcome".to_owned(), EventKind::Unknown)]
    );
    stream.disconnect();
}

#[tokio::test]
async fn test_http_error_schedules_reconnect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let stream = client_for(&server, slow_reconnect()).await;
    let mut notices = stream.notices();
    stream.connect();

    let mut saw_error = false;
    loop {
        let notice = tokio::time::timeout(Duration::from_secs(5), notices.recv())
            .await
            .unwrap()
            .unwrap();
        match notice {
            StreamNotice::Error(_) => saw_error = true,
            StreamNotice::Reconnecting { attempt, delay } => {
                assert_eq!(attempt, 1);
                assert_eq!(delay, Duration::from_secs(30));
                break;
            }
            other => panic!("unexpected notice {other:?}"),
        }
    }
    assert!(saw_error);
    assert_eq!(stream.connection_state(), ConnectionState::Reconnecting);

    stream.disconnect();
    assert_eq!(stream.connection_state(), ConnectionState::Disconnected);
}
