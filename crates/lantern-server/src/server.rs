//! `LanternServer`: the Axum router plus listener lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderName;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use lantern_core::{Inbound, OutboundSink};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::TransportConfig;
use crate::errors::{Result, TransportError};
use crate::facade::Transport;
use crate::health::{self, HealthResponse};
use crate::http::gateway::{delete_transport, get_transport, post_transport};
use crate::http::SESSION_HEADER;
use crate::shutdown::ShutdownCoordinator;

/// The network-facing server.
pub struct LanternServer {
    config: TransportConfig,
    transport: Arc<Transport>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
}

impl LanternServer {
    /// Create a server feeding `inbound_tx`.
    pub fn new(config: TransportConfig, inbound_tx: mpsc::Sender<Inbound>) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let transport = Arc::new(Transport::new(config.clone(), inbound_tx, shutdown.token()));
        Self {
            config,
            transport,
            shutdown,
            metrics: None,
        }
    }

    /// Serve `GET /metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::permissive().expose_headers([HeaderName::from_static(SESSION_HEADER)]);
        let mut router = Router::new()
            .route(
                "/transport",
                get(get_transport).post(post_transport).delete(delete_transport),
            )
            .route("/health", get(health_handler));
        if let Some(handle) = self.metrics.clone() {
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }
        router
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.transport))
    }

    /// The transport facade.
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// The facade as the engine's outbound sink.
    pub fn sink(&self) -> Arc<dyn OutboundSink> {
        Arc::clone(&self.transport) as Arc<dyn OutboundSink>
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Bind, start serving, and start the session reaper.
    ///
    /// Both tasks are tracked by the shutdown coordinator.
    pub async fn listen(&self) -> Result<ServerHandle> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener.local_addr()?;

        let router = self.router();
        let token = self.shutdown.token();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server terminated");
            }
        });
        self.shutdown.track("listener", server);
        self.shutdown.track("reaper", self.transport.spawn_reaper());

        info!(addr = %local_addr, "lantern server listening");
        Ok(ServerHandle { addr: local_addr })
    }
}

/// Address of a running server.
#[derive(Clone, Copy, Debug)]
pub struct ServerHandle {
    /// Bound address.
    pub addr: SocketAddr,
}

impl ServerHandle {
    /// Bound port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// GET /health
async fn health_handler() -> Json<HealthResponse> {
    Json(health::health_check())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use lantern_core::errors::{INVALID_SESSION, PARSE_ERROR, SESSION_ALREADY_EXISTS};
    use lantern_core::{ChannelKind, Envelope, SessionId};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn make_server() -> (LanternServer, mpsc::Receiver<Inbound>) {
        let (tx, rx) = mpsc::channel(16);
        (LanternServer::new(TransportConfig::default(), tx), rx)
    }

    fn post(body: &str, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/transport")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, session);
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    const HANDSHAKE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
    const LIST: &str = r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#;

    async fn handshake(server: &LanternServer) -> String {
        let resp = server.router().oneshot(post(HANDSHAKE, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        resp.headers()[SESSION_HEADER].to_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn health_endpoint_returns_fixed_payload() {
        let (server, _rx) = make_server();
        for _ in 0..3 {
            let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
            let resp = server.router().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(json_body(resp).await, json!({"status": "healthy"}));
        }
        assert!(server.transport().registry().is_empty());
    }

    #[tokio::test]
    async fn metrics_route_only_when_enabled() {
        let (server, _rx) = make_server();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        assert_eq!(server.router().oneshot(req).await.unwrap().status(), StatusCode::NOT_FOUND);

        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let (server, _rx) = make_server();
        let server = server.with_metrics(recorder.handle());
        metrics::with_local_recorder(&recorder, || {
            let _ = server.transport().registry().create(None);
        });
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("sessions_created_total 1"), "got: {text}");
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (server, _rx) = make_server();
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_is_400_and_creates_nothing() {
        let (server, mut rx) = make_server();
        for body in ["{oops", "[]", r#"{"jsonrpc":"1.0","id":1,"method":"initialize"}"#, ""] {
            let resp = server.router().oneshot(post(body, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body:?}");
            let v = json_body(resp).await;
            assert_eq!(v["error"]["code"], PARSE_ERROR);
            assert!(v["error"]["data"].is_array());
        }
        assert!(server.transport().registry().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn handshake_creates_session_and_forwards() {
        let (server, mut rx) = make_server();
        let session = handshake(&server).await;
        assert_eq!(server.transport().registry().len(), 1);

        let inbound = rx.recv().await.unwrap();
        assert!(inbound.envelope.is_handshake());
        assert_eq!(inbound.context.session_id, Some(SessionId::from_raw(&session)));
        assert_eq!(inbound.context.channel, ChannelKind::Http);
    }

    #[tokio::test]
    async fn handshakes_issue_distinct_ids() {
        let (server, _rx) = make_server();
        let a = handshake(&server).await;
        let b = handshake(&server).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn second_handshake_with_session_is_rejected() {
        let (server, mut rx) = make_server();
        let session = handshake(&server).await;
        let _ = rx.recv().await;

        let resp = server.router().oneshot(post(HANDSHAKE, Some(&session))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = json_body(resp).await;
        assert_eq!(v["error"]["code"], SESSION_ALREADY_EXISTS);
        assert_eq!(v["id"], 1);
        assert_eq!(server.transport().registry().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn request_without_session_is_404() {
        let (server, mut rx) = make_server();
        let resp = server.router().oneshot(post(LIST, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["error"]["code"], INVALID_SESSION);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn request_with_unknown_session_is_404() {
        let (server, _rx) = make_server();
        let resp = server.router().oneshot(post(LIST, Some("never-issued"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn request_on_live_session_is_accepted() {
        let (server, mut rx) = make_server();
        let session = handshake(&server).await;
        let _ = rx.recv().await;

        let resp = server.router().oneshot(post(LIST, Some(&session))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let inbound = rx.recv().await.unwrap();
        assert_eq!(inbound.envelope.method(), Some("tools/list"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn act_as_header_sets_identity_override() {
        let (server, mut rx) = make_server();
        let req = Request::builder()
            .method("POST")
            .uri("/transport")
            .header(crate::http::ACT_AS_HEADER, "erin@example.com")
            .body(Body::from(HANDSHAKE))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let inbound = rx.recv().await.unwrap();
        assert_eq!(inbound.context.identity_override.as_deref(), Some("erin@example.com"));
    }

    #[tokio::test]
    async fn engine_gone_is_500_and_session_discarded() {
        let (server, rx) = make_server();
        drop(rx);
        let resp = server.router().oneshot(post(HANDSHAKE, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await["error"]["message"], "Internal error");
        assert!(server.transport().registry().is_empty());
    }

    #[tokio::test]
    async fn get_without_stream_accept_is_405() {
        let (server, _rx) = make_server();
        let session = server.transport().registry().create(None);
        let req = Request::builder()
            .uri("/transport")
            .header(SESSION_HEADER, session.as_str())
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let req = Request::builder()
            .uri("/transport")
            .header(header::ACCEPT, "text/event-stream")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn get_stream_for_unknown_session_is_404() {
        let (server, _rx) = make_server();
        let req = Request::builder()
            .uri("/transport")
            .header(SESSION_HEADER, "never-issued")
            .header(header::ACCEPT, "text/event-stream")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_stream_attaches_listener() {
        let (server, _rx) = make_server();
        let session = server.transport().registry().create(None);
        let req = Request::builder()
            .uri("/transport")
            .header(SESSION_HEADER, session.as_str())
            .header(header::ACCEPT, "text/event-stream")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(server.transport().registry().get(&session).unwrap().listener_count, 1);

        drop(resp);
        assert_eq!(server.transport().registry().get(&session).unwrap().listener_count, 0);
    }

    #[tokio::test]
    async fn post_with_stream_accept_forwards_and_streams() {
        let (server, mut rx) = make_server();
        let session = server.transport().registry().create(None);
        let req = Request::builder()
            .method("POST")
            .uri("/transport")
            .header(SESSION_HEADER, session.as_str())
            .header(header::ACCEPT, "application/json, text/event-stream")
            .body(Body::from(LIST))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");

        let inbound = rx.recv().await.unwrap();
        assert_eq!(inbound.context.channel, ChannelKind::Stream);
        assert_eq!(server.transport().registry().get(&session).unwrap().listener_count, 1);
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let (server, _rx) = make_server();
        let session = server.transport().registry().create(None);
        let delete = |id: &str| {
            Request::builder()
                .method("DELETE")
                .uri("/transport")
                .header(SESSION_HEADER, id)
                .body(Body::empty())
                .unwrap()
        };

        let resp = server.router().oneshot(delete(session.as_str())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(server.transport().registry().is_empty());

        let resp = server.router().oneshot(delete(session.as_str())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_without_session_is_404() {
        let (server, _rx) = make_server();
        let req = Request::builder().method("DELETE").uri("/transport").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_is_404() {
        let (server, _rx) = make_server();
        let session = server.transport().registry().create(None);
        tokio::time::advance(server.config().session_timeout()).await;
        let resp = server.router().oneshot(post(LIST, Some(session.as_str()))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn emitted_reply_reaches_post_stream() {
        let (server, mut rx) = make_server();
        let session = server.transport().registry().create(None);
        let req = Request::builder()
            .method("POST")
            .uri("/transport")
            .header(SESSION_HEADER, session.as_str())
            .header(header::ACCEPT, "text/event-stream")
            .body(Body::from(LIST))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        let inbound = rx.recv().await.unwrap();

        let reply: Envelope =
            lantern_core::Response::success(inbound.envelope.id().cloned(), json!({"tools": []})).into();
        server.sink().emit(lantern_core::Outbound::to_session(session.clone(), reply));
        let _ = server.transport().registry().remove(&session);

        let body = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let data = text
            .lines()
            .find_map(|l| l.strip_prefix("data: "))
            .expect("one data line");
        let v: Value = serde_json::from_str(data).unwrap();
        assert_eq!(v["id"], 2);
        assert_eq!(v["result"]["tools"], json!([]));
    }

    #[tokio::test]
    async fn listen_binds_and_shuts_down() {
        let (server, _rx) = make_server();
        let handle = server.listen().await.unwrap();
        assert_ne!(handle.port(), 0);
        assert_eq!(server.shutdown().tracked(), 2);
        let aborted = server
            .shutdown()
            .graceful_shutdown(std::time::Duration::from_secs(5))
            .await;
        assert_eq!(aborted, 0);
        assert!(tokio::net::TcpStream::connect(handle.addr).await.is_err());
    }
}
