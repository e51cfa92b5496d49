//! HTTP boundary
//!
//! Turns ingest callbacks into registry calls and exposes the registry to
//! browsers over JSON and a WebSocket.

pub mod config;
pub mod discovery;
pub mod listener;
pub mod middleware;
pub mod routes;
pub mod socket;
pub mod state;

pub use config::{merge_tables, ApplicationConfig, ReservedStream, ServerConfig};
pub use discovery::{ConfigSource, SourceKind};
pub use listener::{router, StreamViewerServer};
pub use state::AppState;
