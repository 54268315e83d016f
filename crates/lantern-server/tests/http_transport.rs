//! End-to-end tests over real HTTP with event-stream delivery.

mod common;

use std::time::Duration;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::time::timeout;

use common::{boot_server, TIMEOUT};
use lantern_server::http::SESSION_HEADER;
use lantern_server::TransportConfig;

type ByteStream = std::pin::Pin<Box<dyn futures::Stream<Item = reqwest::Result<axum::body::Bytes>> + Send>>;

/// Minimal event-stream reader: yields the `data` of each event.
struct EventReader {
    stream: ByteStream,
    buffer: String,
}

impl EventReader {
    fn new(resp: reqwest::Response) -> Self {
        Self {
            stream: Box::pin(resp.bytes_stream()),
            buffer: String::new(),
        }
    }

    /// Next event's data as JSON, or `None` when the stream ends.
    async fn next_event(&mut self) -> Option<Value> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                let data: Vec<&str> = block.lines().filter_map(|l| l.strip_prefix("data:")).map(str::trim_start).collect();
                if data.is_empty() {
                    continue;
                }
                return Some(serde_json::from_str(&data.join("\n")).unwrap());
            }
            let chunk = self.stream.next().await?.ok()?;
            self.buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    /// Next event whose `id` equals `id`.
    async fn next_with_id(&mut self, id: &Value) -> Option<Value> {
        loop {
            let event = self.next_event().await?;
            if &event["id"] == id {
                return Some(event);
            }
        }
    }
}

fn url(addr: &str) -> String {
    format!("http://{addr}/transport")
}

async fn handshake(client: &reqwest::Client, addr: &str) -> String {
    let resp = client
        .post(url(addr))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    resp.headers()[SESSION_HEADER].to_str().unwrap().to_owned()
}

async fn open_stream(client: &reqwest::Client, addr: &str, session: &str) -> EventReader {
    let resp = client
        .get(url(addr))
        .header(SESSION_HEADER, session)
        .header("accept", "text/event-stream")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    EventReader::new(resp)
}

#[tokio::test]
async fn list_operations_result_arrives_on_stream_once() {
    let (addr, server, _handle) = boot_server(TransportConfig::default()).await;
    let client = reqwest::Client::new();

    let session = handshake(&client, &addr).await;
    let mut events = open_stream(&client, &addr, &session).await;

    let resp = client
        .post(url(&addr))
        .header(SESSION_HEADER, &session)
        .json(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let event = timeout(TIMEOUT, events.next_with_id(&json!(2))).await.unwrap().unwrap();
    assert_eq!(event["jsonrpc"], "2.0");
    assert_eq!(event["result"]["tools"].as_array().unwrap().len(), 2);

    let again = timeout(Duration::from_millis(300), events.next_with_id(&json!(2))).await;
    assert!(again.is_err(), "result delivered twice");

    server.shutdown().shutdown();
}

#[tokio::test]
async fn post_with_stream_accept_carries_its_own_result() {
    let (addr, server, _handle) = boot_server(TransportConfig::default()).await;
    let client = reqwest::Client::new();
    let session = handshake(&client, &addr).await;

    let resp = client
        .post(url(&addr))
        .header(SESSION_HEADER, &session)
        .header("accept", "application/json, text/event-stream")
        .json(&json!({"jsonrpc": "2.0", "id": "p-1", "method": "ping"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let mut events = EventReader::new(resp);
    let event = timeout(TIMEOUT, events.next_with_id(&json!("p-1"))).await.unwrap().unwrap();
    assert_eq!(event["result"], json!({}));

    server.shutdown().shutdown();
}

#[tokio::test]
async fn unknown_method_error_is_pushed() {
    let (addr, server, _handle) = boot_server(TransportConfig::default()).await;
    let client = reqwest::Client::new();
    let session = handshake(&client, &addr).await;
    let mut events = open_stream(&client, &addr, &session).await;

    let resp = client
        .post(url(&addr))
        .header(SESSION_HEADER, &session)
        .json(&json!({"jsonrpc": "2.0", "id": 9, "method": "does/not/exist"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let event = timeout(TIMEOUT, events.next_with_id(&json!(9))).await.unwrap().unwrap();
    assert_eq!(event["error"]["code"], -32601);

    server.shutdown().shutdown();
}

#[tokio::test]
async fn delete_ends_open_stream() {
    let (addr, server, _handle) = boot_server(TransportConfig::default()).await;
    let client = reqwest::Client::new();
    let session = handshake(&client, &addr).await;
    let mut events = open_stream(&client, &addr, &session).await;

    let resp = client
        .delete(url(&addr))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    // Drain anything queued before the delete; the stream must then end.
    let ended = timeout(TIMEOUT, async { while events.next_event().await.is_some() {} }).await;
    assert!(ended.is_ok());

    let resp = client
        .post(url(&addr))
        .header(SESSION_HEADER, &session)
        .json(&json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.shutdown().shutdown();
}

#[tokio::test]
async fn idle_session_is_reaped() {
    let config = TransportConfig {
        session_timeout_ms: 200,
        ..TransportConfig::default()
    };
    let (addr, server, _handle) = boot_server(config).await;
    let client = reqwest::Client::new();
    let _session = handshake(&client, &addr).await;
    assert_eq!(server.transport().registry().len(), 1);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(server.transport().registry().is_empty());

    server.shutdown().shutdown();
}

#[tokio::test]
async fn health_is_fixed_and_cors_exposes_session_header() {
    let (addr, server, _handle) = boot_server(TransportConfig::default()).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client.get(format!("http://{addr}/health")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({"status": "healthy"}));
    }

    let resp = client
        .post(url(&addr))
        .header("origin", "http://example.test")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
        .send()
        .await
        .unwrap();
    let exposed = resp.headers()["access-control-expose-headers"].to_str().unwrap().to_ascii_lowercase();
    assert!(exposed.contains(SESSION_HEADER), "exposed: {exposed}");

    server.shutdown().shutdown();
}
