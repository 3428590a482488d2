//! mkanban HTTP server

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use mkanban::server::{self, ServerConfig};
use mkanban::storage::{MemoryStorage, SqliteStorage, Storage};
use mkanban::tracing_setup::{init_tracing, TracingConfig};

/// Server command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "mkanban-server", version, about = "Kanban board HTTP API")]
pub struct ServerArgs {
    /// Bind host
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "mkanban.db")]
    pub database_path: PathBuf,

    /// Allowed CORS origins, comma separated (`*` for any)
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,

    /// Request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Keep all data in memory instead of SQLite
    #[arg(long)]
    pub in_memory: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl From<&ServerArgs> for ServerConfig {
    fn from(args: &ServerArgs) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            database_path: args.database_path.clone(),
            cors_origin: args.cors_origin.clone(),
            request_timeout_secs: args.request_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(&TracingConfig { debug: args.debug })?;

    let config = ServerConfig::from(&args);
    let storage: Arc<dyn Storage> = if args.in_memory {
        info!("Using in-memory storage");
        Arc::new(MemoryStorage::new())
    } else {
        info!("Opening database at {}", config.database_path.display());
        Arc::new(
            SqliteStorage::open(&config.database_path)
                .with_context(|| format!("failed to open {}", config.database_path.display()))?,
        )
    };
    storage
        .initialize()
        .await
        .context("failed to initialize storage")?;

    server::serve(config, storage).await
}
