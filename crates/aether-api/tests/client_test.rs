// Integration tests for `CoreClient` using wiremock.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aether_api::{ConfigDocument, CoreClient, CoreState, Error, StreamState};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CoreClient) {
    let server = MockServer::start().await;
    let base = format!("{}/api/v1", server.uri());
    let client = CoreClient::from_reqwest(&base, reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "Active",
            "config": { "url": "https://edge.example/tunnel" },
            "uptime": 42,
            "active_streams": 2
        })))
        .mount(&server)
        .await;

    let status = client.get_status().await.unwrap();

    assert_eq!(status.state, CoreState::Active);
    assert_eq!(status.uptime, Some(42));
    assert_eq!(status.active_streams, 2);
    assert!(status.config.is_some());
}

#[tokio::test]
async fn test_list_streams() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "s1",
                "targetHost": "a.com",
                "targetPort": 443,
                "state": "active",
                "bytesSent": 100,
                "bytesReceived": 200,
                "openedAt": 1_767_225_600_000_i64
            },
            {
                "id": "s2",
                "targetHost": "b.org",
                "targetPort": 80,
                "openedAt": 1_767_225_601_000_i64
            }
        ])))
        .mount(&server)
        .await;

    let streams = client.list_streams().await.unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].state, Some(StreamState::Active));
    assert_eq!(streams[0].bytes_received, 200);
    assert_eq!(streams[1].state, None);
    assert_eq!(streams[1].bytes_sent, 0);
}

#[tokio::test]
async fn test_get_metrics() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timestamp": 1_767_225_600_000_i64,
            "upload": 1024,
            "download": 2048
        })))
        .mount(&server)
        .await;

    let sample = client.get_metrics().await.unwrap();

    assert_eq!(sample.upload, 1024);
    assert_eq!(sample.download, 2048);
    assert_eq!(sample.latency_ms, None);
}

#[tokio::test]
async fn test_control_commands_post_to_their_paths() {
    let (server, client) = setup().await;

    for command in ["start", "stop", "rotate"] {
        Mock::given(method("POST"))
            .and(path(format!("/api/v1/control/{command}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    client.start().await.unwrap();
    client.stop().await.unwrap();
    client.rotate().await.unwrap();
}

#[tokio::test]
async fn test_update_config_sends_document_verbatim() {
    let (server, client) = setup().await;
    let document = json!({ "url": "https://edge.example/tunnel", "psk": "secret", "extra": [1, 2] });

    Mock::given(method("POST"))
        .and(path("/api/v1/config"))
        .and(body_json(&document))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .update_config(&ConfigDocument::new(document.clone()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_close_stream_escapes_id() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/streams/s%2F1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.close_stream("s/1").await.unwrap();
}

#[tokio::test]
async fn test_set_system_proxy() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/system-proxy"))
        .and(body_json(json!({ "enabled": true })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_system_proxy(true).await.unwrap();
}

// ── Failure tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_non_success_is_request_failed() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/control/rotate"))
        .respond_with(ResponseTemplate::new(409).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = client.rotate().await.unwrap_err();

    assert!(matches!(err, Error::RequestFailed { status: 409, .. }));
    assert!(err.is_request_failure());
}

#[tokio::test]
async fn test_failures_are_not_retried() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/status"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get_status().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_bad_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"state\": 7}"))
        .mount(&server)
        .await;

    let err = client.get_status().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "{\"state\": 7}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_core_is_transport_error() {
    let client =
        CoreClient::from_reqwest("http://127.0.0.1:9/api/v1", reqwest::Client::new()).unwrap();

    let err = client.get_status().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_request_failure());
}
