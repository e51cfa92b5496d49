//! Configuration file discovery
//!
//! Configuration is layered. Built-in defaults come first, then every
//! `*.toml` file found in the search directories (in alphabetical order per
//! directory), then the file named by `STREAMVIEWER_CONFIG_PATH`. Later
//! layers override earlier ones:
//!
//! 1. `/etc/streamviewer/*.toml`
//! 2. `$XDG_CONFIG_HOME/streamviewer/*.toml` (or `$HOME/.config/streamviewer`)
//! 3. `$STREAMVIEWER_CONFIG_DIR/*.toml`
//! 4. `$STREAMVIEWER_CONFIG_PATH`

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const APPLICATION_NAME: &str = "streamviewer";
pub const CONFIG_DIR_VAR: &str = "STREAMVIEWER_CONFIG_DIR";
pub const CONFIG_PATH_VAR: &str = "STREAMVIEWER_CONFIG_PATH";

/// Where a search location came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Built-in search location
    Default,
    /// Named by an environment variable
    Env(&'static str),
}

/// A configuration directory or file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl ConfigSource {
    fn default_kind(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: SourceKind::Default,
        }
    }

    /// Whether the path is an existing regular file
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let SourceKind::Env(var) = self.kind {
            write!(f, " (set by environment variable {})", var)?;
        }
        Ok(())
    }
}

/// Search directories, lowest priority first
pub fn config_directories() -> Vec<ConfigSource> {
    config_directories_with(|var| std::env::var(var).ok())
}

/// Search directories, reading the environment through `env`
pub fn config_directories_with(env: impl Fn(&str) -> Option<String>) -> Vec<ConfigSource> {
    let mut directories = vec![ConfigSource::default_kind(
        Path::new("/etc").join(APPLICATION_NAME),
    )];

    let user_dir = match non_blank(env("XDG_CONFIG_HOME")) {
        Some(xdg) => Some(PathBuf::from(xdg).join(APPLICATION_NAME)),
        None => non_blank(env("HOME"))
            .map(|home| PathBuf::from(home).join(".config").join(APPLICATION_NAME)),
    };
    directories.extend(user_dir.map(ConfigSource::default_kind));

    if let Some(dir) = non_blank(env(CONFIG_DIR_VAR)) {
        directories.push(ConfigSource {
            path: dir.into(),
            kind: SourceKind::Env(CONFIG_DIR_VAR),
        });
    }

    directories
}

/// Candidate configuration files, lowest priority first
///
/// Missing directories are skipped. The file named by
/// `STREAMVIEWER_CONFIG_PATH` is listed even when it does not exist.
pub fn config_files() -> Result<Vec<ConfigSource>> {
    config_files_with(|var| std::env::var(var).ok())
}

/// Candidate configuration files, reading the environment through `env`
pub fn config_files_with(env: impl Fn(&str) -> Option<String>) -> Result<Vec<ConfigSource>> {
    let mut files = toml_files_in(&config_directories_with(&env))?;

    if let Some(path) = non_blank(env(CONFIG_PATH_VAR)) {
        files.push(ConfigSource {
            path: path.into(),
            kind: SourceKind::Env(CONFIG_PATH_VAR),
        });
    }

    Ok(files)
}

/// `*.toml` files of each directory in turn, sorted by name within a directory
pub fn toml_files_in(directories: &[ConfigSource]) -> Result<Vec<ConfigSource>> {
    let mut files = Vec::new();

    for directory in directories {
        if !directory.path.is_dir() {
            continue;
        }

        let entries = match std::fs::read_dir(&directory.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::warn!(path = %directory.path.display(), error = %e, "Cannot read config directory");
                return Err(e.into());
            }
        };

        let mut found = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                found.push(path);
            }
        }
        found.sort();

        files.extend(found.into_iter().map(ConfigSource::default_kind));
    }

    Ok(files)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
