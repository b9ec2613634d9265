use serde_json::{json, Value};

use super::pkce::METHOD_S256;
use crate::config::ServerConfig;

/// RFC 8414 authorization server metadata.
pub fn authorization_server_metadata(config: &ServerConfig) -> Value {
    let base = &config.public_base_url;
    let mut auth_methods = vec!["none"];
    if config.oauth.client_secret.is_some() {
        auth_methods.push("client_secret_post");
    }
    json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/authorize"),
        "token_endpoint": format!("{base}/token"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": [METHOD_S256],
        "token_endpoint_auth_methods_supported": auth_methods,
        "scopes_supported": config.oauth.scopes,
    })
}

/// RFC 9728 protected resource metadata.
pub fn protected_resource_metadata(config: &ServerConfig) -> Value {
    let base = &config.public_base_url;
    json!({
        "resource": base,
        "authorization_servers": [base],
        "bearer_methods_supported": ["header"],
        "scopes_supported": config.oauth.scopes,
        "resource_documentation": base,
        "mcp_endpoint": config.mcp_endpoint(),
    })
}
