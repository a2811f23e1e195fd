#![allow(clippy::unwrap_used)]
// Integration tests for `RequestClient` using wiremock.

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bodyctl_api::models::{LockCommand, Position, WindowCommand};
use bodyctl_api::{Endpoint, Error, RequestClient, RetryPolicy};

// ── Helpers ─────────────────────────────────────────────────────────

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(20),
        multiplier: 2.0,
        attempt_timeout: Duration::from_secs(2),
    }
}

async fn setup() -> (MockServer, RequestClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = RequestClient::with_client(reqwest::Client::new(), base_url).with_policy(fast_policy());
    (server, client)
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "message": "ok",
        "data": data,
        "timestamp": 1_700_000_000
    }))
}

// ── Retry behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn test_retries_server_error_then_succeeds() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/door/1/status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/door/1/status"))
        .respond_with(ok(json!({ "doorID": 1, "lockState": 1 })))
        .mount(&server)
        .await;

    let started = Instant::now();
    let resp = client.execute(&Endpoint::door_status(Position::FrontRight)).await.unwrap();

    assert_eq!(resp.attempts, 2);
    assert_eq!(resp.timestamp, Some(1_700_000_000));
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn test_retries_exhausted_reports_last_response() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/window/control"))
        .respond_with(ResponseTemplate::new(500).set_body_string("motor fault"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client
        .control_window(Position::RearLeft, WindowCommand::Down)
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 3);
    assert!(err.is_transient());
    let last = err.last_response.unwrap();
    assert_eq!(last.status, 500);
    assert_eq!(last.body, "motor fault");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/window/position"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": "bad request", "message": "position out of range" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .set_window_position(Position::FrontLeft, 100)
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 1);
    assert!(matches!(err.cause, Error::Http { status: 400, .. }));
}

#[tokio::test]
async fn test_business_failure_is_not_retried() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/door/lock"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "message": "door ajar", "timestamp": 1 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .lock_door(Position::RearRight, LockCommand::Lock)
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 1);
    assert_eq!(err.business_message(), Some("door ajar"));
    assert_eq!(err.last_response.map(|r| r.status), Some(200));
}

#[tokio::test]
async fn test_attempt_timeout_is_retried_then_fails() {
    let (server, client) = setup().await;
    let client = client.with_policy(RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(10),
        multiplier: 2.0,
        attempt_timeout: Duration::from_millis(50),
    });

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ok(json!({ "status": "healthy" })).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let err = client.health().await.unwrap_err();

    assert_eq!(err.attempts, 2);
    assert!(matches!(err.cause, Error::Timeout { timeout_ms: 50 }));
    assert!(err.last_response.is_none());
}

#[tokio::test]
async fn test_endpoint_timeout_overrides_policy_timeout() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/door/0/status"))
        .respond_with(
            ok(json!({ "doorID": 0, "lockState": 1 })).set_delay(Duration::from_millis(300)),
        )
        .expect(3)
        .mount(&server)
        .await;

    // Policy allows 2s per attempt; the endpoint only 100ms.
    let endpoint = Endpoint::door_status(Position::FrontLeft).with_timeout(Duration::from_millis(100));
    let err = client.execute(&endpoint).await.unwrap_err();

    assert_eq!(err.attempts, fast_policy().attempts());
    assert!(matches!(err.cause, Error::Timeout { timeout_ms: 100 }));
}

#[tokio::test]
async fn test_per_call_policy_overrides_client_policy() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/window/3/position"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .execute_with_policy(
            &Endpoint::window_position(Position::RearRight),
            &RetryPolicy::no_retry(),
        )
        .await
        .unwrap_err();

    assert_eq!(client.policy().attempts(), 3);
    assert_eq!(err.attempts, 1);
    assert!(matches!(err.cause, Error::Http { status: 503, .. }));
    assert_eq!(err.last_response.map(|r| r.status), Some(503));
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.system_info().await.unwrap_err();
    assert!(
        matches!(&err.cause, Error::Deserialization { body, .. } if body.contains("proxy")),
        "unexpected cause: {:?}",
        err.cause
    );
}

// ── Command bodies ──────────────────────────────────────────────────

#[tokio::test]
async fn test_lock_command_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/door/lock"))
        .and(body_json(json!({ "doorID": 2, "command": 1 })))
        .respond_with(ok(json!({ "doorID": 2, "lockState": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client.lock_door(Position::RearLeft, LockCommand::Lock).await.unwrap();
    assert_eq!(resp.attempts, 1);
    assert_eq!(resp.data["lockState"], json!(1));
}

#[tokio::test]
async fn test_seat_memory_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/seat/memory/save"))
        .and(body_json(json!({ "presetID": 2 })))
        .respond_with(ok(serde_json::Value::Null))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client.save_memory(2).await.unwrap();
    assert_eq!(resp.data, serde_json::Value::Null);
}

// ── Batch execution ─────────────────────────────────────────────────

#[tokio::test]
async fn test_execute_all_keeps_input_order_and_isolates_failures() {
    let (server, client) = setup().await;
    let client = client.with_policy(RetryPolicy::no_retry());

    for id in [0, 1, 3] {
        Mock::given(method("GET"))
            .and(path(format!("/api/window/{id}/position")))
            .respond_with(ok(json!({ "windowID": id, "position": id * 10 })))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/window/2/position"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let results = client.window_positions().await;
    assert_eq!(results.len(), 4);

    let positions: Vec<Option<u8>> = results
        .iter()
        .map(|(_, r)| r.as_ref().ok().map(|w| w.position))
        .collect();
    assert_eq!(positions, vec![Some(0), Some(10), None, Some(30)]);
    assert_eq!(results[2].0, Position::RearLeft);
}

#[tokio::test]
async fn test_door_statuses_accepts_flag_variants() {
    let (server, client) = setup().await;

    let bodies = [
        json!({ "doorID": 0, "lockState": 1 }),
        json!({ "doorID": 1, "lockState": false }),
        json!({ "doorID": 2, "currentState": 1, "doorState": 1 }),
        json!({ "doorID": 3, "lockState": 0, "doorState": 0 }),
    ];
    for (id, body) in bodies.into_iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(format!("/api/door/{id}/status")))
            .respond_with(ok(body))
            .mount(&server)
            .await;
    }

    let statuses: Vec<(bool, Option<bool>)> = client
        .door_statuses()
        .await
        .into_iter()
        .map(|(_, r)| {
            let s = r.unwrap();
            (s.locked, s.open)
        })
        .collect();

    assert_eq!(
        statuses,
        vec![(true, None), (false, None), (true, Some(true)), (false, Some(false))]
    );
}

#[tokio::test]
async fn test_unlock_all_sends_four_commands() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/door/lock"))
        .respond_with(ok(serde_json::Value::Null))
        .expect(4)
        .mount(&server)
        .await;

    let results = client.unlock_all_doors().await;
    assert!(results.iter().all(|(_, r)| r.is_ok()));

    let requests = server.received_requests().await.unwrap();
    let mut doors: Vec<i64> = requests
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            assert_eq!(body["command"], json!(0));
            body["doorID"].as_i64().unwrap()
        })
        .collect();
    doors.sort_unstable();
    assert_eq!(doors, vec![0, 1, 2, 3]);
}

// ── System endpoints ────────────────────────────────────────────────

#[tokio::test]
async fn test_system_info_and_health() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ok(json!({
            "name": "Body Controller",
            "version": "1.0.0",
            "description": "door/window/light/seat gateway",
            "services": { "door": "Door lock control" },
            "endpoints": { "events": "/api/events" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ok(json!({
            "status": "healthy",
            "uptime": 42.5,
            "services": { "door_service": true, "seat_service": false }
        })))
        .mount(&server)
        .await;

    let info = client.system_info().await.unwrap();
    assert_eq!(info.version, "1.0.0");
    assert_eq!(info.endpoints.get("events").map(String::as_str), Some("/api/events"));

    let health = client.health().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.uptime, Some(42.5));
    assert_eq!(health.services.get("seat_service"), Some(&false));
}
