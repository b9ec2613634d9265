use axum::Router;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::credentials::CredentialStore;
use crate::error::ServerError;
use crate::handlers::builtin_registry;
use crate::routes;
use crate::state::AppState;
use crate::tools::ToolRegistry;

/// MCP server speaking JSON-RPC over long-lived HTTP event streams.
pub struct McpServer {
    state: AppState,
}

impl McpServer {
    /// Server with the built-in tool bundles and in-memory credentials.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, builtin_registry(), CredentialStore::in_memory())
    }

    pub fn with_registry(
        config: ServerConfig,
        registry: ToolRegistry,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            state: AppState::new(config, registry, credentials),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
    }

    /// Bind, serve until ctrl-c, then stop the reaper.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.state.config.bind_addr;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!(
            addr = %addr,
            endpoint = %self.state.config.mcp_endpoint(),
            tools = self.state.dispatcher.registry().len(),
            "starting MCP stream server"
        );

        let reaper = spawn_reaper(self.state.clone());
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(ServerError::Serve);
        reaper.abort();

        tracing::info!("server stopped");
        result
    }
}

/// Periodically expire idle sessions and dead credentials.
pub fn spawn_reaper(state: AppState) -> JoinHandle<()> {
    let period = state.config.reap_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let sessions = state.sessions.reap();
            let credentials = state.credentials.purge_expired().await;
            tracing::debug!(
                sessions,
                credentials,
                active_sessions = state.sessions.len(),
                "reaper pass"
            );
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
