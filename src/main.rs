use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use mcp_stream_server::config::ServerConfig;
use mcp_stream_server::server::McpServer;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %format!("{e:#}"), "mcp-stream-server: fatal error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("configuration error")?;
    tracing::debug!(config = ?config, "configuration loaded");
    McpServer::new(config).run().await?;
    Ok(())
}
