use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use streamviewer::server::discovery::{self, SourceKind};
use streamviewer::{ServerConfig, StreamViewerServer};

/// Live stream directory for an RTMP ingest server
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Extra TOML file applied after all discovered ones
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Address to bind to (overrides the configuration)
    #[arg(short, long, env = "STREAMVIEWER_BIND")]
    bind: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inspect configuration sources
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the built-in default configuration
    Default,
    /// Print every file that is or could be read, lowest priority first
    Paths,
    /// Print the directories searched for *.toml files
    Directories,
    /// Load the configuration like the server would and print the result
    Test,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stderr keeps `config default` / `config test` output clean
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(extra: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let mut paths: Vec<PathBuf> = discovery::config_files()?
        .into_iter()
        .filter(|source| {
            let exists = source.exists();
            if !exists && source.kind != SourceKind::Default {
                tracing::warn!(source = %source, "Configuration file does not exist");
            }
            exists
        })
        .map(|source| source.path)
        .collect();
    paths.extend(extra.map(Path::to_path_buf));

    if paths.is_empty() {
        tracing::warn!("No configuration files found, using defaults");
    }

    ServerConfig::load_layered(&paths).context("failed to load configuration")
}

fn run_config_command(action: ConfigAction, extra: Option<&Path>) -> anyhow::Result<()> {
    match action {
        ConfigAction::Default => {
            print!("{}", toml::to_string_pretty(&ServerConfig::default())?);
        }
        ConfigAction::Paths => {
            let files = discovery::config_files()?;
            if files.is_empty() && extra.is_none() {
                println!("No configuration files found");
            }
            for file in files {
                let missing = if file.exists() { "" } else { " (doesn't exist)" };
                println!("{}{}", file, missing);
            }
            if let Some(path) = extra {
                println!("{} (set by --config)", path.display());
            }
        }
        ConfigAction::Directories => {
            for directory in discovery::config_directories() {
                println!("{}", directory);
            }
        }
        ConfigAction::Test => {
            let config = load_config(extra)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    if let Some(Command::Config { action }) = args.command {
        return run_config_command(action, args.config.as_deref());
    }

    let mut config = load_config(args.config.as_deref())?;

    if let Some(addr) = args.bind {
        config = config.bind(addr);
    }

    let server = StreamViewerServer::new(config).await?;

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
