//! Development server implementation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sluice_config::{BuildTarget, ConfigError};
use sluice_pipeline::{BuildEvent, EventBus};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use crate::websocket::{reload_client_script, ReloadHub, ReloadMessage};

/// WebSocket endpoint browsers connect to.
pub const RELOAD_WS_PATH: &str = "/__sluice/ws";

/// Path the reload client script is served from.
pub const RELOAD_SCRIPT_PATH: &str = "/__sluice/reload.js";

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory served at `/`
    pub root: PathBuf,

    /// Port to listen on (0 picks a free one)
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,

    /// Build target whose events trigger reloads
    pub target: BuildTarget,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".temp"),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
            target: BuildTarget::Temp,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Shared server state.
struct ServerState {
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    events: EventBus,
}

impl DevServer {
    /// Create a new development server that reloads on `events`.
    pub fn new(config: DevServerConfig, events: EventBus) -> Self {
        Self { config, events }
    }

    /// Check the root, bind the socket and start relaying build events.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        if !self.config.root.is_dir() {
            return Err(ConfigError::MissingDirectory(self.config.root.clone()).into());
        }

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::InvalidAddress(format!("{}:{}", self.config.host, self.config.port))
            })?;

        let hub = ReloadHub::new();
        let relay = spawn_relay(
            self.events.subscribe(),
            hub.clone(),
            self.config.root.clone(),
            self.config.target,
        );

        let state = Arc::new(ServerState { hub: hub.clone() });
        let app = Router::new()
            .route(RELOAD_WS_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
            .fallback_service(ServeDir::new(&self.config.root))
            .layer(middleware::map_response(inject_reload_script))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(BoundServer {
            listener,
            app,
            addr: local_addr,
            root: self.config.root,
            open: self.config.open,
            hub,
            relay,
        })
    }
}

/// A server with its socket bound, ready to serve.
pub struct BoundServer {
    listener: tokio::net::TcpListener,
    app: Router,
    addr: SocketAddr,
    root: PathBuf,
    open: bool,
    hub: ReloadHub,
    relay: JoinHandle<()>,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    pub async fn serve(self) -> Result<(), ServerError> {
        let url = format!("http://{}", self.addr);
        tracing::info!("Serving {} at {}", self.root.display(), url);

        if self.open {
            let _ = open::that(&url);
        }

        let result = axum::serve(self.listener, self.app)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()));
        self.relay.abort();
        result
    }
}

/// Turn build events for the served target into reload messages.
fn spawn_relay(
    mut events: tokio::sync::broadcast::Receiver<BuildEvent>,
    hub: ReloadHub,
    root: PathBuf,
    target: BuildTarget,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BuildEvent::Completed {
                    task,
                    category,
                    target: event_target,
                    dest,
                    paths,
                }) => {
                    if event_target != target {
                        continue;
                    }
                    let urls = paths.iter().map(|p| url_path(&root, &dest, p)).collect();
                    let msg = ReloadMessage::for_paths(&category, urls);
                    tracing::debug!("[{}] reload: {:?}", task, msg);
                    hub.send(msg);
                }
                Ok(BuildEvent::Failed { task, message }) => {
                    tracing::warn!("[{}] build failed, skipping reload: {}", task, message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Reload relay skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// URL path of a written file, relative to the served root.
fn url_path(root: &Path, dest: &Path, logical: &str) -> String {
    let prefix = dest
        .strip_prefix(root)
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    if prefix.is_empty() {
        format!("/{}", logical)
    } else {
        format!("/{}/{}", prefix, logical)
    }
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let rx = state.hub.subscribe();
    ws.on_upgrade(move |socket| handle_ws(socket, rx))
}

/// Handle a WebSocket connection.
async fn handle_ws(
    mut socket: WebSocket,
    mut rx: tokio::sync::broadcast::Receiver<ReloadMessage>,
) {
    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    // Forward reload messages to the client
    loop {
        match rx.recv().await {
            Ok(msg) => {
                if send_message(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

/// Handler for the reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        reload_client_script(RELOAD_WS_PATH),
    )
}

/// Add the reload script to successful HTML responses.
async fn inject_reload_script(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false);
    if response.status() != StatusCode::OK || !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let body = match std::str::from_utf8(&bytes) {
        Ok(html) if !html.is_empty() => Body::from(inject_script(html)),
        _ => Body::from(bytes),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, body)
}

/// Insert the reload script tag before the closing `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => format!("{}{}{}", &html[..idx], tag, &html[idx..]),
        None => format!("{}{}", html, tag),
    }
}
