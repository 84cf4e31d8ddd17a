//! Static asset serving for the development server.
//!
//! Assets are served straight from their source location. Nothing is cached,
//! so an edited image shows up on the next request without a rebuild.

use crate::dev::server::{determine_content_type, file_response, plain_response};
use crate::dev::DevServerState;
use axum::{http::StatusCode, response::Response};
use std::io::ErrorKind;
use std::path::Path;

/// Respond with the contents of the asset behind `request_path`.
///
/// The file is read when the request arrives. A file that disappeared since
/// the asset map was built is a 404; any other read failure is a 500.
pub async fn serve_asset(state: &DevServerState, request_path: &str, source: &Path) -> Response {
    match tokio::fs::read(source).await {
        Ok(content) => file_response(state, determine_content_type(request_path), content),
        Err(e) if e.kind() == ErrorKind::NotFound => plain_response(
            StatusCode::NOT_FOUND,
            format!("Asset not found: {request_path}"),
        ),
        Err(e) => {
            tracing::error!(path = %source.display(), error = %e, "failed to read asset");
            plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read asset".to_string(),
            )
        }
    }
}
