//! HTTP server listener
//!
//! Builds the router and runs the accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::registry::StreamRegistry;
use crate::server::config::ServerConfig;
use crate::server::middleware::{local_only, log_request_errors};
use crate::server::routes::{
    get_config, get_stream, list_streams, on_publish, on_publish_done,
};
use crate::server::socket::websocket_handler;
use crate::server::state::AppState;

/// Build the application router
///
/// Publish callbacks live under `/hooks` and only accept loopback peers, so
/// the router must be served with `ConnectInfo<SocketAddr>`.
pub fn router(state: AppState) -> Router {
    let hooks = Router::new()
        .route("/on_publish", post(on_publish))
        .route("/on_publish_done", post(on_publish_done))
        .route_layer(middleware::from_fn(local_only));

    Router::new()
        .route("/api/streams", get(list_streams))
        .route("/api/streams/{key}", get(get_stream))
        .route("/api/config", get(get_config))
        .route("/ws", get(websocket_handler))
        .nest("/hooks", hooks)
        .layer(middleware::from_fn(log_request_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Stream viewer server
pub struct StreamViewerServer {
    state: AppState,
}

impl StreamViewerServer {
    /// Create a server, reserving the configured stream keys
    pub async fn new(config: ServerConfig) -> Result<Self> {
        Ok(Self {
            state: AppState::new(config).await?,
        })
    }

    /// Get a reference to the stream registry
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.state.registry
    }

    /// Get the shared handler state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config.application.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        tracing::info!(addr = %self.bind_addr(), "Stream viewer listening");

        let app = router(self.state.clone());

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

        Ok(())
    }
}
