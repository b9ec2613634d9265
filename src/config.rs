use std::net::SocketAddr;
use std::time::Duration;

/// Default timeout for tool operations (30 seconds).
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
/// Default heartbeat interval on idle streams.
const DEFAULT_HEARTBEAT_SECS: u64 = 15;
/// Default idle time after which a session is reaped (1 hour).
const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;
/// Default period of the background reaper.
const DEFAULT_REAP_INTERVAL_SECS: u64 = 300;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_CLIENT_ID: &str = "claude-desktop";
const DEFAULT_REDIRECT_URI: &str = "https://claude.ai/api/mcp/auth_callback";
const DEFAULT_SCOPES: &str = "mcp";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// The single OAuth client this server accepts.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Externally visible origin, without trailing slash.
    pub public_base_url: String,
    pub api_key: Option<String>,
    pub oauth: OAuthClientConfig,
    pub heartbeat_interval: Duration,
    pub tool_timeout: Duration,
    pub session_idle_timeout: Duration,
    pub reap_interval: Duration,
    /// Allow-list applied to `tools/list`; `None` lists every ecosystem.
    pub enabled_ecosystems: Option<Vec<String>>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("public_base_url", &self.public_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("oauth", &self.oauth)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("tool_timeout", &self.tool_timeout)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .field("reap_interval", &self.reap_interval)
            .field("enabled_ecosystems", &self.enabled_ecosystems)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            api_key: None,
            oauth: OAuthClientConfig {
                client_id: DEFAULT_CLIENT_ID.to_string(),
                client_secret: None,
                redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
                scopes: vec![DEFAULT_SCOPES.to_string()],
            },
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            session_idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            reap_interval: Duration::from_secs(DEFAULT_REAP_INTERVAL_SECS),
            enabled_ecosystems: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment.
    ///
    /// - `MCP_BIND_ADDR` (default `0.0.0.0:8000`)
    /// - `MCP_PUBLIC_BASE_URL` (default `http://localhost:8000`)
    /// - `MCP_API_KEY` (optional): shared secret accepted in `X-API-Key`
    /// - `OAUTH_CLIENT_ID`, `OAUTH_CLIENT_SECRET`, `OAUTH_REDIRECT_URI`, `OAUTH_SCOPES`
    /// - `MCP_HEARTBEAT_INTERVAL_SECS` (default 15)
    /// - `MCP_TOOL_TIMEOUT_SECS` (default 30): max seconds per tool call
    /// - `MCP_SESSION_IDLE_SECS` (default 3600)
    /// - `MCP_REAP_INTERVAL_SECS` (default 300)
    /// - `MCP_ENABLED_ECOSYSTEMS` (optional, comma-separated)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("MCP_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "MCP_BIND_ADDR",
                reason: e.to_string(),
            })?;

        let public_base_url = var("MCP_PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());
        url::Url::parse(&public_base_url).map_err(|e| ConfigError::Invalid {
            var: "MCP_PUBLIC_BASE_URL",
            reason: e.to_string(),
        })?;
        let public_base_url = public_base_url.trim_end_matches('/').to_string();

        let scopes = var("OAUTH_SCOPES")
            .unwrap_or_else(|| DEFAULT_SCOPES.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let oauth = OAuthClientConfig {
            client_id: var("OAUTH_CLIENT_ID").unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            client_secret: var("OAUTH_CLIENT_SECRET"),
            redirect_uri: var("OAUTH_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            scopes,
        };

        let enabled_ecosystems = var("MCP_ENABLED_ECOSYSTEMS").map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        Ok(Self {
            bind_addr,
            public_base_url,
            api_key: var("MCP_API_KEY"),
            oauth,
            heartbeat_interval: secs(&var, "MCP_HEARTBEAT_INTERVAL_SECS", DEFAULT_HEARTBEAT_SECS)?,
            tool_timeout: secs(&var, "MCP_TOOL_TIMEOUT_SECS", DEFAULT_TOOL_TIMEOUT_SECS)?,
            session_idle_timeout: secs(&var, "MCP_SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?,
            reap_interval: secs(&var, "MCP_REAP_INTERVAL_SECS", DEFAULT_REAP_INTERVAL_SECS)?,
            enabled_ecosystems,
        })
    }

    /// Canonical streaming endpoint announced to clients.
    pub fn mcp_endpoint(&self) -> String {
        format!("{}/mcp", self.public_base_url)
    }

    pub fn resource_metadata_url(&self) -> String {
        format!("{}/.well-known/oauth-protected-resource", self.public_base_url)
    }
}

fn secs(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let value = match var(key) {
        Some(val) => val.parse::<u64>().map_err(|_| ConfigError::Invalid {
            var: key,
            reason: "must be a positive integer".to_string(),
        })?,
        None => default,
    };
    if value == 0 {
        return Err(ConfigError::Invalid {
            var: key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(cfg.tool_timeout, Duration::from_secs(30));
        assert_eq!(cfg.session_idle_timeout, Duration::from_secs(3600));
        assert_eq!(cfg.oauth.client_id, "claude-desktop");
        assert!(cfg.api_key.is_none());
        assert!(cfg.enabled_ecosystems.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let cfg = load(&[
            ("MCP_PUBLIC_BASE_URL", "https://mcp.example.com/"),
            ("MCP_API_KEY", "k"),
            ("MCP_HEARTBEAT_INTERVAL_SECS", "5"),
            ("MCP_ENABLED_ECOSYSTEMS", "godaddy, digitalocean,,"),
            ("OAUTH_SCOPES", "mcp tools"),
        ])
        .unwrap();
        assert_eq!(cfg.public_base_url, "https://mcp.example.com");
        assert_eq!(cfg.mcp_endpoint(), "https://mcp.example.com/mcp");
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(
            cfg.enabled_ecosystems,
            Some(vec!["godaddy".to_string(), "digitalocean".to_string()])
        );
        assert_eq!(cfg.oauth.scopes, vec!["mcp", "tools"]);
    }

    #[test]
    fn zero_and_garbage_durations_are_rejected() {
        let err = load(&[("MCP_TOOL_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "MCP_TOOL_TIMEOUT_SECS", .. }));
        let err = load(&[("MCP_HEARTBEAT_INTERVAL_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "MCP_HEARTBEAT_INTERVAL_SECS", .. }));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let cfg = load(&[("MCP_API_KEY", "super-secret"), ("OAUTH_CLIENT_SECRET", "s3")]).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(!dbg.contains("s3\""));
    }
}
