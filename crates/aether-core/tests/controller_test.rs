// Integration tests for `Controller` against a mocked Core: wiremock for
// the control endpoint, a local WebSocket server for the event channel.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aether_core::{
    ConnectionState, Controller, ControllerConfig, CoreError, CoreState, ReconnectPolicy,
    StreamState,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn mock_core(status: serde_json::Value, streams: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams))
        .mount(&server)
        .await;
    server
}

fn stream_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "targetHost": format!("{id}.example"),
        "targetPort": 443,
        "state": "active",
        "bytesSent": 10,
        "bytesReceived": 20,
        "openedAt": 1_767_225_600_000_i64
    })
}

/// Event server: each accepted connection receives the frames pushed into
/// the returned sender. With `drop_first`, the first connection is closed
/// right after the handshake.
async fn event_server(drop_first: bool) -> (Url, mpsc::UnboundedSender<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("ws://{}/api/v1/events", listener.local_addr().unwrap())).unwrap();
    (url, serve_events(listener, drop_first))
}

fn serve_events(listener: TcpListener, drop_first: bool) -> mpsc::UnboundedSender<String> {
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let mut accepted = 0_u32;
        while let Ok((tcp, _)) = listener.accept().await {
            accepted += 1;
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            if drop_first && accepted == 1 {
                let _ = ws.close(None).await;
                continue;
            }
            loop {
                tokio::select! {
                    frame = frames_rx.recv() => match frame {
                        Some(frame) => {
                            if ws.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    msg = ws.next() => if msg.is_none() { break },
                }
            }
        }
    });

    frames_tx
}

fn config(server: &MockServer, events_url: Url) -> ControllerConfig {
    let api_url = Url::parse(&format!("{}/api/v1", server.uri())).unwrap();
    let mut config = ControllerConfig::new(api_url, events_url);
    config.reconnect = ReconnectPolicy::Fixed {
        delay: Duration::from_millis(200),
    };
    config.refresh_interval = Duration::ZERO;
    config
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ── Sync engine ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_hydrates_then_applies_events() {
    let server = mock_core(
        json!({ "state": "Active", "uptime": 1, "active_streams": 1 }),
        json!([stream_json("s1")]),
    )
    .await;
    let (events_url, frames) = event_server(false).await;
    let controller = Controller::new(config(&server, events_url)).unwrap();
    let store = controller.store().clone();

    controller.connect().await;
    wait_for(|| store.connection_state() == ConnectionState::Connected).await;
    wait_for(|| store.stream_count() == 1).await;
    assert_eq!(store.core_state(), CoreState::Active);
    assert!(store.session().is_some());

    frames
        .send(json!({ "type": "stream_opened", "id": "s2", "targetHost": "a.com", "targetPort": 443 }).to_string())
        .unwrap();
    frames.send("garbage".into()).unwrap();
    frames
        .send(json!({ "type": "stream_updated", "id": "s2", "bytesSent": 1000 }).to_string())
        .unwrap();
    frames
        .send(json!({ "type": "metrics_snapshot", "timestamp": 1_767_225_600_000_i64, "upload": 5, "download": 7 }).to_string())
        .unwrap();
    frames
        .send(json!({ "type": "stream_closed", "id": "s1" }).to_string())
        .unwrap();

    wait_for(|| store.stream_by_id("s1").is_none() && store.stream_count() == 1).await;
    let s2 = store.stream_by_id("s2").unwrap();
    assert_eq!(s2.state, StreamState::Active);
    assert_eq!(s2.bytes_sent, 1000);
    wait_for(|| store.metrics_snapshot().len() == 1).await;
    assert_eq!(store.totals().total_download, 7);

    controller.disconnect().await;
}

#[tokio::test]
async fn test_reconnect_rehydrates() {
    let server = mock_core(
        json!({ "state": "Idle", "active_streams": 0 }),
        json!([]),
    )
    .await;
    let (events_url, _frames) = event_server(true).await;
    let controller = Controller::new(config(&server, events_url)).unwrap();
    let store = controller.store().clone();

    controller.connect().await;

    // first connection is dropped, the second one sticks
    let status_calls = || async {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/api/v1/status")
            .count()
    };
    tokio::time::timeout(Duration::from_secs(5), async {
        while status_calls().await < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    wait_for(|| store.connection_state() == ConnectionState::Connected).await;

    controller.disconnect().await;
}

#[tokio::test]
async fn test_connect_revives_transport_after_retry_limit() {
    let server = mock_core(json!({ "state": "Idle", "active_streams": 0 }), json!([])).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let events_url = Url::parse(&format!("ws://{addr}/api/v1/events")).unwrap();

    let mut config = config(&server, events_url);
    config.max_retries = Some(0);
    let controller = Controller::new(config).unwrap();
    let store = controller.store().clone();

    controller.connect().await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.connection_state(), ConnectionState::Disconnected);

    // the Core comes back on the same port
    let _frames = serve_events(TcpListener::bind(addr).await.unwrap(), false);
    controller.connect().await;
    wait_for(|| store.connection_state() == ConnectionState::Connected).await;

    controller.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_keeps_last_known_state() {
    let server = mock_core(
        json!({ "state": "Active", "active_streams": 2 }),
        json!([stream_json("s1"), stream_json("s2")]),
    )
    .await;
    let (events_url, _frames) = event_server(false).await;
    let controller = Controller::new(config(&server, events_url)).unwrap();
    let store = controller.store().clone();

    controller.connect().await;
    wait_for(|| store.stream_count() == 2).await;

    controller.disconnect().await;
    controller.disconnect().await;

    assert_eq!(store.connection_state(), ConnectionState::Disconnected);
    assert_eq!(store.stream_count(), 2);
    assert_eq!(store.core_state(), CoreState::Active);
}

// ── Actions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_close_stream_removes_record() {
    let server = mock_core(
        json!({ "state": "Active", "active_streams": 1 }),
        json!([stream_json("s1")]),
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/streams/s1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let (events_url, _frames) = event_server(false).await;
    let controller = Controller::new(config(&server, events_url)).unwrap();
    let store = controller.store().clone();

    controller.connect().await;
    wait_for(|| store.stream_count() == 1).await;

    controller.close_stream("s1").await.unwrap();
    wait_for(|| store.stream_count() == 0).await;

    controller.disconnect().await;
}

#[tokio::test]
async fn test_failed_action_leaves_state_untouched() {
    let server = mock_core(json!({ "state": "Idle" }), json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/system-proxy"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (events_url, _frames) = event_server(false).await;
    let controller = Controller::new(config(&server, events_url)).unwrap();

    let err = controller.set_system_proxy(true).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::RequestFailed {
            status: Some(500),
            ..
        }
    ));
    assert!(!controller.store().system_proxy_enabled());
}

#[tokio::test]
async fn test_actions_apply_while_disconnected() {
    let server = mock_core(json!({ "state": "Idle" }), json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/system-proxy"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/config"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let (events_url, _frames) = event_server(false).await;
    let controller = Controller::new(config(&server, events_url)).unwrap();

    controller.set_system_proxy(true).await.unwrap();
    controller
        .update_config(json!({ "url": "https://edge.example" }).into())
        .await
        .unwrap();

    let store = controller.store();
    assert!(store.system_proxy_enabled());
    assert_eq!(
        store.config().unwrap().get("url"),
        Some(&json!("https://edge.example"))
    );
}

#[tokio::test]
async fn test_oneshot_hydrates_without_event_channel() {
    let server = mock_core(
        json!({ "state": "Rotating", "active_streams": 1 }),
        json!([stream_json("s1")]),
    )
    .await;
    let events_url = Url::parse("ws://127.0.0.1:9/api/v1/events").unwrap();

    let snapshot = Controller::oneshot(config(&server, events_url), |c| async move {
        Ok(c.snapshot())
    })
    .await
    .unwrap();

    assert_eq!(snapshot.core_state, CoreState::Rotating);
    assert!(snapshot.session.is_some());
    assert_eq!(snapshot.streams.len(), 1);
    assert_eq!(snapshot.connection, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_oneshot_surfaces_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let events_url = Url::parse("ws://127.0.0.1:9/api/v1/events").unwrap();

    let result = Controller::oneshot(config(&server, events_url), |c| async move {
        Ok(c.snapshot())
    })
    .await;

    assert!(matches!(result, Err(CoreError::RequestFailed { .. })));
}
