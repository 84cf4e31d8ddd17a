//! Development server with live reload via Server-Sent Events.
//!
//! Serves build output from the in-memory registry, static assets from their
//! source location, and an SSE endpoint for push-based reload notifications.

use crate::dev::{asset_middleware, DevEvent, DevServerState, SharedState};
use crate::error::{CliError, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::get,
    Router,
};
use ngbuild_core::index_html::INDEX_PATH;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

/// Server-Sent Events endpoint.
pub const SSE_PATH: &str = "/__ngbuild_sse__";

/// Live reload client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__ngbuild_reload__.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/dev/reload-client.js");

/// Development server bound to a listening socket.
pub struct DevServer {
    listener: TcpListener,
    state: SharedState,
}

impl DevServer {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns error if the address is unavailable.
    pub async fn bind(host: &str, port: u16, state: SharedState) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {host}:{port}: {e}")))?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve requests until the task is cancelled.
    pub async fn run(self) -> Result<()> {
        axum::serve(self.listener, router(self.state))
            .await
            .map_err(|e| CliError::Server(format!("Server error: {e}")))
    }
}

/// Build the axum router with all routes.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(SSE_PATH, get(handle_sse))
        .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (id, rx) = state.register_client();
    tracing::debug!(client = id, "live reload client connected");

    state.broadcast(&DevEvent::ClientConnected { id }).await;

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_reload_script() -> Response {
    let mut response = Body::from(RELOAD_SCRIPT).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/javascript"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// Resolve a request against assets, then build output, then the index.
async fn handle_request(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let path = strip_serve_path(uri.path(), &state.options().serve_path);

    if let Some(source) = state.asset_source(&path) {
        return asset_middleware::serve_asset(&state, &path, &source).await;
    }

    if !is_html(&path) {
        if let Some(contents) = state.output_file(&path) {
            return file_response(&state, determine_content_type(&path), contents);
        }
    }

    handle_index(&state, &path, accepts_html(&headers))
}

/// Serve HTML documents, falling back to `/index.html` for client-side routes.
///
/// A route counts as client-side when its last segment has no extension or
/// when the browser asked for HTML (`/users/john.doe` navigations).
fn handle_index(state: &DevServerState, path: &str, wants_html: bool) -> Response {
    let target = if is_html(path) {
        path
    } else if wants_html || !has_extension(path) {
        INDEX_PATH
    } else {
        return not_found(path);
    };

    match state.output_file(target) {
        Some(html) => {
            let html = if state.options().live_reload {
                inject_reload_script(&html)
            } else {
                html
            };
            file_response(state, "text/html; charset=utf-8", html)
        }
        None => not_found(path),
    }
}

/// Map a request path onto the registry's virtual paths.
///
/// `/app/main.js` with serve path `/app/` becomes `/main.js`, and `/app`
/// becomes `/`. Paths outside the serve path are left as they are.
pub fn strip_serve_path(path: &str, serve_path: &str) -> String {
    if serve_path == "/" {
        return path.to_string();
    }
    if let Some(rest) = path.strip_prefix(serve_path) {
        return format!("/{rest}");
    }
    if path == serve_path.trim_end_matches('/') {
        return "/".to_string();
    }
    path.to_string()
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_html(path: &str) -> bool {
    last_segment(path).ends_with(".html")
}

fn has_extension(path: &str) -> bool {
    last_segment(path).contains('.')
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/html"))
}

/// Inject the reload client before the closing `</body>` tag.
pub fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let script_tag = format!(r#"<script src="{RELOAD_SCRIPT_PATH}"></script>"#);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script_tag.len() + 4);
        result.push_str(&html[..pos]);
        result.push_str("  ");
        result.push_str(&script_tag);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.into_owned();
    result.push('\n');
    result.push_str(&script_tag);
    result.into_bytes()
}

/// A `200` response for served file contents.
///
/// Always `no-cache`; configured headers are applied last so they can
/// override the defaults.
pub(crate) fn file_response(
    state: &DevServerState,
    content_type: &'static str,
    contents: Vec<u8>,
) -> Response {
    let mut response = Body::from(contents).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    for (name, value) in &state.options().headers {
        headers.insert(name.clone(), value.clone());
    }
    response
}

pub(crate) fn plain_response(status: StatusCode, message: String) -> Response {
    let mut response = (status, message).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn not_found(path: &str) -> Response {
    plain_response(StatusCode::NOT_FOUND, format!("File not found: {path}"))
}

/// Determine content type from file extension.
pub(crate) fn determine_content_type(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "wasm" => "application/wasm",
        "js" | "mjs" => "application/javascript",
        "json" | "map" | "webmanifest" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
