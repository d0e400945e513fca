//! tablewire - DataTables server-side processing over HTTP
//!
//! Serves table rows from a JSON file, answering paging, sorting and
//! searching requests sent by DataTables clients.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tablewire_server::{Config, Server, ServerError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tablewire")]
#[command(about = "DataTables server-side processing over HTTP")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "TABLEWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// URL path serving table requests
    #[arg(long)]
    path: Option<String>,

    /// JSON file holding the table rows
    #[arg(short, long)]
    data_file: Option<PathBuf>,

    /// Data field copied into DT_RowId
    #[arg(long)]
    row_id_field: Option<String>,
}

impl Cli {
    /// Loads the config file and environment, then applies the flags.
    fn load_config(&self) -> Result<Config, ServerError> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(path) = &self.config {
            tracing::info!("Loaded config from {}", path.display());
        }

        if let Some(bind) = self.bind {
            config.network.bind_addr = bind;
        }
        if let Some(path) = &self.path {
            config.network.path = path.clone();
        }
        if let Some(data_file) = &self.data_file {
            config.table.data_file = Some(data_file.clone());
        }
        if let Some(field) = &self.row_id_field {
            config.table.row_id_field = Some(field.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting tablewire server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Table path: {}", config.network.path);
    tracing::info!("  Max body: {} bytes", config.network.max_body_bytes);

    let server = match Server::from_config(&config) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            return Err(e.into());
        }
    };

    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}
