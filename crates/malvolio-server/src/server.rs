//! Development server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::watch;
use tower_http::services::ServeDir;

use malvolio_static::{BuildError, SiteBuilder};

use crate::livereload::{
    inject_script, ReloadHub, ReloadMessage, RELOAD_CLIENT_SCRIPT, RELOAD_SCRIPT_PATH,
    RELOAD_SOCKET_PATH,
};
use crate::rebuild::RebuildLoop;
use crate::watcher::FileWatcher;

/// Largest HTML response the live reload script is injected into.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Rebuild when sources change
    pub watch: bool,

    /// Open browser on start
    pub open: bool,

    /// Quiet period before a rebuild starts
    pub debounce: Duration,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            watch: true,
            open: false,
            debounce: Duration::from_millis(150),
        }
    }
}

impl DevServerConfig {
    /// Socket address to bind.
    pub fn addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Initial build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Serves the output directory and rebuilds it when sources change.
pub struct DevServer {
    config: DevServerConfig,
    builder: SiteBuilder,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig, builder: SiteBuilder) -> Self {
        Self { config, builder }
    }

    /// Start the server and run until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        self.start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            tracing::info!("Shutting down...");
        })
        .await
    }

    /// Start the server and run until `shutdown` completes.
    ///
    /// The site is built once before serving. On shutdown the watcher is
    /// stopped and any rebuild in progress is allowed to finish.
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr()?;
        let output_dir = self.builder.config().output_dir.clone();
        let builder = Arc::new(self.builder);

        let initial = Arc::clone(&builder);
        let report = tokio::task::spawn_blocking(move || initial.build())
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))??;
        if let Some(e) = &report.sync_error {
            tracing::warn!("Initial build finished with output errors: {}", e);
        }

        let hub = ReloadHub::new();
        let (stop_tx, stop_rx) = watch::channel(false);

        let watching = if self.config.watch {
            let paths = builder.config().watch_paths();
            let (watcher, events) =
                FileWatcher::new(&paths).map_err(|e| ServerError::WatchError(e.to_string()))?;

            let rebuild = RebuildLoop::new(Arc::clone(&builder), self.config.debounce)
                .with_reload(hub.clone());
            let handle = tokio::spawn(rebuild.run(events, stop_rx));
            Some((watcher, handle))
        } else {
            None
        };

        let app = Router::new()
            .route(RELOAD_SOCKET_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(script_handler))
            .fallback_service(ServeDir::new(&output_dir))
            .with_state(hub);

        let app = if watching.is_some() {
            app.layer(middleware::from_fn(inject_reload_script))
        } else {
            app
        };

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        tracing::info!("Serving {} at http://{}", output_dir.display(), local);
        tracing::info!("Press Ctrl-C to stop");

        if self.config.open {
            let url = format!("http://{}", local);
            let _ = open::that(&url);
        }

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()));

        if let Some((watcher, handle)) = watching {
            drop(watcher);
            let _ = stop_tx.send(true);
            if let Err(e) = handle.await {
                tracing::error!("Rebuild loop failed: {}", e);
            }
        }

        served
    }
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// Forward reload messages to one connected browser.
async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
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

/// Handler for the live reload client script.
async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        RELOAD_CLIENT_SCRIPT,
    )
}

/// Add the live reload script tag to served HTML pages.
async fn inject_reload_script(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.status() != StatusCode::OK || !is_html(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(html))
}

fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}
