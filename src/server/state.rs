//! Shared state handed to every request handler

use std::sync::Arc;

use crate::error::Result;
use crate::registry::StreamRegistry;
use crate::server::config::ServerConfig;
use crate::stats::ViewerCounter;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<StreamRegistry>,
    pub viewers: Arc<ViewerCounter>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the registry and reserve every configured stream key
    pub async fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let registry = StreamRegistry::with_config(config.registry_config());

        for stream in &config.streams {
            registry
                .seed(stream.name.trim(), stream.options())
                .await
                .inspect_err(|e| {
                    tracing::error!(stream = %stream.name, error = %e, "Failed to reserve stream")
                })?;
        }

        tracing::info!(
            reserved = config.streams.len(),
            max_streams = config.application.max_streams,
            free_choice = config.application.free_choice,
            "Stream registry ready"
        );

        Ok(Self {
            registry: Arc::new(registry),
            viewers: Arc::new(ViewerCounter::default()),
            config: Arc::new(config),
        })
    }
}
