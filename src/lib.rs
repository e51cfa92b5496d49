//! Live stream directory for an RTMP ingest server
//!
//! The ingest server (e.g. nginx-rtmp) reports publish start/stop through
//! HTTP callbacks. This crate decides which publishers are admitted, keeps
//! the list of live streams, and pushes changes to browsers.
//!
//! ```no_run
//! use streamviewer::{ServerConfig, StreamViewerServer};
//!
//! # async fn run() -> streamviewer::Result<()> {
//! let server = StreamViewerServer::new(ServerConfig::default()).await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

pub mod error;
pub mod registry;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use registry::{RegistryConfig, RegistryError, StreamEntry, StreamOptions, StreamRegistry};
pub use server::{AppState, ServerConfig, StreamViewerServer};
pub use stats::ViewerCounter;
