//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use convey_api::{AppState, build_app, serve};
use convey_core::config::AppConfig;
use convey_realtime::DeliveryFrame;

/// Client side of a stream socket.
pub type StreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a test waits for any single frame.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state behind the router
    pub state: AppState,
}

/// Parsed test response
pub struct TestResponse {
    /// HTTP status
    pub status: StatusCode,
    /// JSON body, `Null` when empty
    pub body: Value,
}

impl TestApp {
    /// Create a new test application with default configuration
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a new test application with the given configuration
    pub fn with_config(config: AppConfig) -> Self {
        let state = AppState::new(config);
        Self {
            router: build_app(state.clone()),
            state,
        }
    }

    /// Send a request through the router
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("Failed to build request"))
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Issue a stream token over HTTP and return it
    pub async fn issue_token(&self, conversation_id: &str, watermark: Option<u64>) -> String {
        let uri = match watermark {
            Some(w) => format!("/api/conversations/{conversation_id}/stream?watermark={w}"),
            None => format!("/api/conversations/{conversation_id}/stream"),
        };
        let response = self.request("POST", &uri, None).await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["data"]["token"]
            .as_str()
            .expect("token in response")
            .to_string()
    }

    /// Post a text message over HTTP
    pub async fn post_text(&self, conversation_id: &str, text: &str) -> TestResponse {
        let uri = format!("/api/conversations/{conversation_id}/messages");
        let body = serde_json::json!({ "type": "message", "from": "user", "text": text });
        self.request("POST", &uri, Some(body)).await
    }
}

/// A server bound to an ephemeral local port
pub struct TestServer {
    /// Address the server listens on
    pub addr: SocketAddr,
    /// HTTP side sharing the server's state
    pub app: TestApp,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Spawn a server with default configuration
    pub async fn spawn() -> Self {
        Self::spawn_with(AppConfig::default()).await
    }

    /// Spawn a server with the given configuration
    pub async fn spawn_with(config: AppConfig) -> Self {
        let app = TestApp::with_config(config);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("local addr");

        let (tx, rx) = oneshot::channel::<()>();
        let state = app.state.clone();
        let handle = tokio::spawn(async move {
            serve(listener, state, async {
                let _ = rx.await;
            })
            .await
            .expect("server");
        });

        Self {
            addr,
            app,
            shutdown: Some(tx),
            handle,
        }
    }

    /// Open a stream socket with `token`
    pub async fn connect(
        &self,
        token: &str,
    ) -> Result<StreamSocket, tokio_tungstenite::tungstenite::Error> {
        let url = format!("ws://{}/ws?t={}", self.addr, token);
        tokio_tungstenite::connect_async(url)
            .await
            .map(|(socket, _)| socket)
    }

    /// Trigger graceful shutdown and wait for the server to stop
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task");
    }
}

/// Wait for the next delivery frame on `socket`
pub async fn next_frame(socket: &mut StreamSocket) -> DeliveryFrame {
    loop {
        let msg = tokio::time::timeout(FRAME_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket ended")
            .expect("socket error");

        match msg {
            WsMessage::Text(text) => {
                return DeliveryFrame::decode(text.as_str()).expect("valid frame");
            }
            WsMessage::Close(_) => panic!("socket closed while waiting for a frame"),
            _ => continue,
        }
    }
}

/// Wait until the server closes `socket`
pub async fn expect_closed(socket: &mut StreamSocket) {
    loop {
        match tokio::time::timeout(FRAME_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for close")
        {
            None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => return,
            Some(Ok(WsMessage::Text(text))) => panic!("unexpected frame: {}", text.as_str()),
            Some(Ok(_)) => continue,
        }
    }
}

/// Poll `check` until it holds or the frame timeout elapses
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + FRAME_TIMEOUT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Texts carried by a frame, in order
pub fn texts(frame: &DeliveryFrame) -> Vec<String> {
    frame
        .messages
        .iter()
        .filter_map(|m| m.text.clone())
        .collect()
}
