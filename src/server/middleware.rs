//! Request middleware

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Log every 4xx/5xx response
pub async fn log_request_errors(req: Request<Body>, next: Next) -> Response {
    let uri = req.uri().clone();
    let method = req.method().clone();

    let response = next.run(req).await;
    let status = response.status();
    if status.is_client_error() {
        tracing::warn!(method = %method, uri = %uri, status = %status, "Client error");
    } else if status.is_server_error() {
        tracing::error!(method = %method, uri = %uri, status = %status, "Server error");
    }

    response
}

/// Only let requests from the local host through
///
/// The ingest server runs next to this process, so its publish callbacks
/// always arrive over loopback.
pub async fn local_only(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !peer.ip().to_canonical().is_loopback() {
        tracing::warn!(peer = %peer, uri = %req.uri(), "Rejected non-local ingest callback");
        return StatusCode::FORBIDDEN.into_response();
    }

    next.run(req).await
}
