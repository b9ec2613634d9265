use std::sync::Arc;

use crate::auth::AuthGate;
use crate::config::ServerConfig;
use crate::credentials::CredentialStore;
use crate::handlers::Dispatcher;
use crate::oauth::OAuthService;
use crate::session::SessionManager;
use crate::tools::ToolRegistry;

/// Shared handles injected into every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub credentials: CredentialStore,
    pub sessions: SessionManager,
    pub dispatcher: Arc<Dispatcher>,
    pub auth: AuthGate,
    pub oauth: OAuthService,
}

impl AppState {
    pub fn new(config: ServerConfig, registry: ToolRegistry, credentials: CredentialStore) -> Self {
        let config = Arc::new(config);
        let auth = AuthGate::new(
            credentials.clone(),
            config.api_key.clone(),
            config.resource_metadata_url(),
        );
        Self {
            sessions: SessionManager::new(config.session_idle_timeout),
            dispatcher: Arc::new(Dispatcher::new(Arc::new(registry), &config)),
            oauth: OAuthService::new(credentials.clone(), &config),
            credentials,
            auth,
            config,
        }
    }
}
