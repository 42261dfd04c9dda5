//! Test helpers for integration tests
//!
//! [`TestServer`] binds an ephemeral port and serves:
//! - `GET  /api/gateway` returning the WebSocket URL
//! - `GET  /ws` upgrading to a gateway socket handed to the test
//! - `POST /api/channels/:id/messages` answering from a script
//! - `GET  /youtube/playlists` and `/youtube/playlistItems`

use crate::fixtures::{RecordedPost, ScriptedReply};
use anyhow::{anyhow, bail, Context, Result};
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

/// How long a helper waits for the client before failing the test
pub const WAIT: Duration = Duration::from_secs(5);

type Queries = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

#[derive(Clone)]
struct ServerState {
    gateway_url: String,
    sockets: mpsc::UnboundedSender<GatewaySocket>,
    posts: mpsc::UnboundedSender<RecordedPost>,
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    queries: Queries,
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    sockets: mpsc::UnboundedReceiver<GatewaySocket>,
    posts: mpsc::UnboundedReceiver<RecordedPost>,
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    queries: Queries,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server on an ephemeral port
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let (socket_tx, sockets) = mpsc::unbounded_channel();
        let (post_tx, posts) = mpsc::unbounded_channel();
        let script = Arc::new(Mutex::new(VecDeque::new()));
        let queries = Queries::default();

        let state = ServerState {
            gateway_url: format!("ws://{addr}/ws"),
            sockets: socket_tx,
            posts: post_tx,
            script: Arc::clone(&script),
            queries: Arc::clone(&queries),
        };

        let app = Router::new()
            .route("/api/gateway", get(gateway_info))
            .route("/ws", get(gateway_socket))
            .route("/api/channels/:channel_id/messages", post(create_message))
            .route("/youtube/playlists", get(playlists))
            .route("/youtube/playlistItems", get(playlist_items))
            .with_state(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            sockets,
            posts,
            script,
            queries,
            _handle: handle,
        })
    }

    /// REST base the clients are pointed at
    pub fn api_base(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn discovery_url(&self) -> String {
        format!("{}/gateway", self.api_base())
    }

    /// Gateway base URL, also used as the resume URL
    pub fn gateway_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn youtube_base(&self) -> String {
        format!("http://{}/youtube", self.addr)
    }

    /// Wait for the client to open the next gateway socket
    pub async fn next_socket(&mut self) -> Result<GatewaySocket> {
        timeout(WAIT, self.sockets.recv())
            .await
            .context("timed out waiting for a gateway connection")?
            .ok_or_else(|| anyhow!("server stopped"))
    }

    /// Wait for the next message creation request
    pub async fn next_post(&mut self) -> Result<RecordedPost> {
        timeout(WAIT, self.posts.recv())
            .await
            .context("timed out waiting for a REST request")?
            .ok_or_else(|| anyhow!("server stopped"))
    }

    /// Queue the answer to a future message creation request
    pub fn script_reply(&self, reply: ScriptedReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    /// Query parameters of every playlist API request so far, with the resource name
    pub fn playlist_queries(&self) -> Vec<(String, HashMap<String, String>)> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

/// Server end of one gateway connection
pub struct GatewaySocket {
    socket: WebSocket,
    /// Query string the client connected with
    pub query: HashMap<String, String>,
}

impl GatewaySocket {
    pub async fn send_json(&mut self, frame: Value) -> Result<()> {
        self.socket
            .send(Message::Text(frame.to_string()))
            .await
            .map_err(|e| anyhow!("send failed: {e}"))
    }

    /// Close the connection with `code`
    pub async fn send_close(&mut self, code: u16) -> Result<()> {
        self.socket
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: "".into(),
            })))
            .await
            .map_err(|e| anyhow!("close failed: {e}"))
    }

    /// Next text frame as JSON
    pub async fn recv_json(&mut self) -> Result<Value> {
        loop {
            let message = timeout(WAIT, self.socket.recv())
                .await
                .context("timed out waiting for a client frame")?
                .ok_or_else(|| anyhow!("client went away"))?
                .map_err(|e| anyhow!("receive failed: {e}"))?;

            match message {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(frame) => bail!("client closed: {frame:?}"),
                _ => {}
            }
        }
    }

    /// Wait for the client's close frame and return its code
    pub async fn recv_close(&mut self) -> Result<Option<u16>> {
        loop {
            let message = timeout(WAIT, self.socket.recv())
                .await
                .context("timed out waiting for a close frame")?;

            match message {
                Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| f.code)),
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(None),
            }
        }
    }

    /// Assert the client sends nothing for `quiet`
    pub async fn expect_silence(&mut self, quiet: Duration) -> Result<()> {
        match timeout(quiet, self.socket.recv()).await {
            Err(_) => Ok(()),
            Ok(message) => bail!("expected silence, got {message:?}"),
        }
    }
}

async fn gateway_info(State(state): State<ServerState>) -> Json<Value> {
    Json(json!({ "url": state.gateway_url }))
}

async fn gateway_socket(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let _ = state.sockets.send(GatewaySocket { socket, query });
    })
}

async fn create_message(
    State(state): State<ServerState>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let _ = state.posts.send(RecordedPost {
        channel_id,
        authorization: header("authorization"),
        user_agent: header("user-agent"),
        body,
        received_at: Instant::now(),
    });

    let reply = state
        .script
        .lock()
        .ok()
        .and_then(|mut script| script.pop_front())
        .unwrap_or_default();

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    let mut response = (status, Json(json!({ "id": "5000" }))).into_response();
    if let Some(limit) = reply.limit {
        response
            .headers_mut()
            .insert("x-ratelimit-limit", HeaderValue::from(limit));
    }
    if let Some(reset_after) = reply.reset_after {
        if let Ok(value) = HeaderValue::from_str(&reset_after.to_string()) {
            response.headers_mut().insert("x-ratelimit-reset-after", value);
        }
    }
    response
}

fn record(state: &ServerState, resource: &str, query: &HashMap<String, String>) {
    if let Ok(mut queries) = state.queries.lock() {
        queries.push((resource.to_string(), query.clone()));
    }
}

async fn playlists(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "playlists", &query);
    match query.get("id").map(String::as_str) {
        Some("PL1") => Json(json!({
            "items": [{"snippet": {"channelId": "UC1", "title": "Watched"}}]
        })),
        _ => Json(json!({ "items": [] })),
    }
}

async fn playlist_items(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    record(&state, "playlistItems", &query);
    if query.get("playlistId").map(String::as_str) == Some("UUbroken") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"code": 403, "message": "quotaExceeded"}})),
        )
            .into_response();
    }

    Json(json!({
        "nextPageToken": "page-2",
        "items": [{
            "snippet": {
                "title": "Launch day",
                "publishedAt": "2024-05-01T12:00:00Z",
                "resourceId": {"kind": "youtube#video", "videoId": "abc123"},
                "videoOwnerChannelTitle": "Rocket Lab"
            }
        }]
    }))
    .into_response()
}
