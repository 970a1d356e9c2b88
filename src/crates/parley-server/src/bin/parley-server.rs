//! parley server binary
//!
//! Loads `parley.toml` (or `--config`), applies environment overrides and serves the
//! configured agent.

use anyhow::Context;
use clap::Parser;
use parley_core::ToolRegistry;
use parley_server::app::{build_app, build_model};
use parley_server::config::{GraphKind, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "parley-server", version, about = "Serve a parley conversational agent over HTTP")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Agent graph to serve
    #[arg(long, value_enum)]
    graph: Option<GraphKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(kind) = cli.graph {
        config.graph.kind = kind;
    }

    tracing::info!(
        graph = config.graph.kind.as_str(),
        model = %config.model.name,
        dev_checkpointer = config.checkpoint.dev,
        "Configuration loaded"
    );

    let model = build_model(&config).context("creating model client")?;
    let app = build_app(&config, model, ToolRegistry::new())
        .await
        .context("building agent")?;

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    tracing::info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
