//! Server configuration
//!
//! Built from layered TOML files over built-in defaults (see
//! [`discovery`](super::discovery) for where they are searched). Tables merge
//! key by key; any other value, arrays included, is replaced by the later
//! layer.
//!
//! ```toml
//! [application]
//! page_title = "stream"
//! hls_path = "/data/hls"
//! bind_addr = "0.0.0.0:5000"
//! max_streams = 10
//! password_protection_period = 60   # seconds
//! free_choice = true
//!
//! [[streams]]
//! name = "studio"
//! password = "secret"
//! description = "Main studio camera"
//! unlisted = false
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::registry::{RegistryConfig, StreamOptions};

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub application: ApplicationConfig,

    /// Keys reserved at boot, in file order
    pub streams: Vec<ReservedStream>,
}

/// `[application]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Title shown by the page renderer
    pub page_title: String,

    /// Directory the ingest server writes HLS playlists to
    pub hls_path: String,

    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Stream capacity
    pub max_streams: usize,

    /// Grace period for disconnected password-protected keys, in seconds
    pub password_protection_period: u64,

    /// Allow publishing on keys that are not configured below
    pub free_choice: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            page_title: "stream".to_string(),
            hls_path: "/data/hls".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            max_streams: 10,
            password_protection_period: 60,
            free_choice: true,
        }
    }
}

/// One `[[streams]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedStream {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub unlisted: bool,
}

impl ReservedStream {
    /// Registry options for this reserved key
    pub fn options(&self) -> StreamOptions {
        StreamOptions {
            password: self.password.clone(),
            description: self.description.clone(),
            unlisted: self.unlisted,
            protected: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a single TOML file over the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::load_layered(&[path])
    }

    /// Merge the given files over the defaults, in order, then validate
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut merged = toml::Table::try_from(Self::default())?;

        for (layer, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path)?;
            let table = content
                .parse::<toml::Table>()
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

            tracing::info!(layer = layer + 1, path = %path.display(), "Reading configuration");
            merge_tables(&mut merged, table);
        }

        let config: ServerConfig = merged.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for stream in &self.streams {
            let name = stream.name.trim();
            if name.is_empty() {
                return Err(Error::Config("reserved stream name cannot be empty".into()));
            }
            if !seen.insert(name) {
                return Err(Error::Config(format!(
                    "reserved stream configured twice: {}",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Registry settings derived from `[application]`
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default()
            .max_streams(self.application.max_streams)
            .password_protection_period(Duration::from_secs(
                self.application.password_protection_period,
            ))
            .free_choice(self.application.free_choice)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.application.bind_addr = addr;
        self
    }

    /// Set the stream capacity
    pub fn max_streams(mut self, max: usize) -> Self {
        self.application.max_streams = max;
        self
    }

    /// Set the grace period
    pub fn password_protection_period(mut self, period: Duration) -> Self {
        self.application.password_protection_period = period.as_secs();
        self
    }

    /// Allow or forbid unconfigured keys
    pub fn free_choice(mut self, enabled: bool) -> Self {
        self.application.free_choice = enabled;
        self
    }

    /// Add a reserved stream
    pub fn reserve(mut self, stream: ReservedStream) -> Self {
        self.streams.push(stream);
        self
    }
}

/// Merge `overlay` into `base`
///
/// Tables present on both sides merge recursively. Everything else in
/// `overlay` replaces the value in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(table) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, table);
                    continue;
                }
                base.insert(key, toml::Value::Table(table));
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}
