//! OAuth 2.1 authorization server for the single configured client.
//!
//! Issues single-use authorization codes at `/authorize` and exchanges them
//! (or a refresh token) for bearer credentials at `/token`. Access tokens
//! minted here are what the authentication gate accepts.

pub mod discovery;
pub mod pkce;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::auth::redact;
use crate::config::{OAuthClientConfig, ServerConfig};
use crate::credentials::{CodeGrant, CredentialStore, TokenGrant, TokenPair, ACCESS_TOKEN_TTL};

/// RFC 6749 error responses. Always rendered as HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
    #[error("invalid_client: {0}")]
    InvalidClient(String),
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),
    #[error("unsupported_response_type: {0}")]
    UnsupportedResponseType(String),
}

impl OAuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest(d)
            | Self::InvalidClient(d)
            | Self::InvalidGrant(d)
            | Self::UnsupportedGrantType(d)
            | Self::UnsupportedResponseType(d) => d,
        }
    }
}

#[derive(Serialize)]
struct OAuthErrorBody<'a> {
    error: &'a str,
    error_description: &'a str,
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        tracing::warn!(error = self.code(), description = self.description(), "oauth request rejected");
        let body = OAuthErrorBody {
            error: self.code(),
            error_description: self.description(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// `/authorize` parameters (query string or form body).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub response_type: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// `/token` form body, covering both grant types.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
    pub scope: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access.token,
            token_type: "Bearer".into(),
            expires_in: ACCESS_TOKEN_TTL.as_secs(),
            refresh_token: pair.refresh.token,
            scope: pair.access.scope,
        }
    }
}

#[derive(Clone)]
pub struct OAuthService {
    credentials: CredentialStore,
    client: OAuthClientConfig,
    issuer: String,
    audience: String,
}

impl OAuthService {
    pub fn new(credentials: CredentialStore, config: &ServerConfig) -> Self {
        Self {
            credentials,
            client: config.oauth.clone(),
            issuer: config.public_base_url.clone(),
            audience: config.mcp_endpoint(),
        }
    }

    /// Validate an authorization request and mint a code.
    ///
    /// Returns the redirect location `redirect_uri?code=..&state=..`.
    pub async fn authorize(&self, req: AuthorizeRequest) -> Result<String, OAuthError> {
        if req.client_id != self.client.client_id {
            return Err(OAuthError::InvalidClient("Invalid client_id".into()));
        }
        if req.redirect_uri != self.client.redirect_uri {
            return Err(OAuthError::InvalidRequest("Invalid redirect_uri".into()));
        }
        if req.response_type != "code" {
            return Err(OAuthError::UnsupportedResponseType(
                "Invalid response_type".into(),
            ));
        }

        let pkce_method = match (&req.code_challenge, req.code_challenge_method.as_deref()) {
            (None, _) => None,
            (Some(_), None) | (Some(_), Some(pkce::METHOD_S256)) => {
                Some(pkce::METHOD_S256.to_string())
            }
            (Some(_), Some(other)) => {
                return Err(OAuthError::InvalidRequest(format!(
                    "Unsupported code_challenge_method '{other}'"
                )));
            }
        };

        let mut redirect = url::Url::parse(&req.redirect_uri)
            .map_err(|e| OAuthError::InvalidRequest(format!("Malformed redirect_uri: {e}")))?;

        let scope = req
            .scope
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.client.scopes.join(" "));

        let code = self
            .credentials
            .create_authorization_code(CodeGrant {
                client_id: req.client_id,
                redirect_uri: req.redirect_uri,
                scope,
                state: req.state.clone(),
                pkce_challenge: req.code_challenge,
                pkce_method,
            })
            .await;
        tracing::info!(
            code = %redact(&code.code),
            pkce = code.pkce_challenge.is_some(),
            "authorization code issued"
        );

        {
            let mut query = redirect.query_pairs_mut();
            query.append_pair("code", &code.code);
            if let Some(state) = &req.state {
                query.append_pair("state", state);
            }
        }
        Ok(redirect.into())
    }

    pub async fn token(&self, req: TokenRequest) -> Result<TokenResponse, OAuthError> {
        match req.grant_type.as_str() {
            "authorization_code" => self.exchange_code(req).await,
            "refresh_token" => self.refresh(req).await,
            other => Err(OAuthError::UnsupportedGrantType(format!(
                "Invalid grant_type '{other}'"
            ))),
        }
    }

    async fn exchange_code(&self, req: TokenRequest) -> Result<TokenResponse, OAuthError> {
        let client_id = req.client_id.unwrap_or_default();
        if client_id != self.client.client_id {
            return Err(OAuthError::InvalidClient("Invalid client_id".into()));
        }
        let redirect_uri = req.redirect_uri.unwrap_or_default();
        if redirect_uri != self.client.redirect_uri {
            return Err(OAuthError::InvalidRequest("Invalid redirect_uri".into()));
        }
        let code = req
            .code
            .ok_or_else(|| OAuthError::InvalidRequest("code is required".into()))?;

        // Consumed here; every later failure still burns the code.
        let stored = self
            .credentials
            .redeem_authorization_code(&code)
            .await
            .ok_or_else(|| OAuthError::InvalidGrant("Invalid or expired authorization code".into()))?;

        if stored.client_id != client_id {
            return Err(OAuthError::InvalidGrant("Mismatched client_id".into()));
        }

        match &stored.pkce_challenge {
            Some(challenge) => {
                let verifier = req.code_verifier.as_deref().ok_or_else(|| {
                    OAuthError::InvalidRequest("code_verifier required for PKCE".into())
                })?;
                if !pkce::verify(verifier, challenge) {
                    return Err(OAuthError::InvalidGrant("Invalid code_verifier".into()));
                }
            }
            None => {
                if !self.secret_matches(req.client_secret.as_deref()) {
                    return Err(OAuthError::InvalidClient("Invalid client_secret".into()));
                }
            }
        }

        if stored.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant("Mismatched redirect_uri".into()));
        }

        let pair = self.issue(client_id, stored.scope).await;
        tracing::info!(
            client_id = %pair.access.client_id,
            token = %redact(&pair.access.token),
            "access token issued"
        );
        Ok(pair.into())
    }

    /// Single-use refresh: the presented token is consumed, its access
    /// token revoked and a fresh pair issued.
    async fn refresh(&self, req: TokenRequest) -> Result<TokenResponse, OAuthError> {
        let presented = req
            .refresh_token
            .ok_or_else(|| OAuthError::InvalidRequest("refresh_token is required".into()))?;

        let stored = self
            .credentials
            .redeem_refresh_token(&presented)
            .await
            .ok_or_else(|| OAuthError::InvalidGrant("Invalid or expired refresh token".into()))?;

        if let Some(client_id) = req.client_id.as_deref() {
            if client_id != stored.client_id {
                return Err(OAuthError::InvalidGrant("Mismatched client_id".into()));
            }
        }

        self.credentials
            .revoke_access_token(&stored.linked_access_token)
            .await;

        let pair = self.issue(stored.client_id, stored.scope).await;
        tracing::info!(
            previous = %redact(&presented),
            token = %redact(&pair.access.token),
            "refresh token rotated"
        );
        Ok(pair.into())
    }

    async fn issue(&self, client_id: String, scope: String) -> TokenPair {
        self.credentials
            .issue_tokens(TokenGrant {
                client_id,
                scope,
                issuer: self.issuer.clone(),
                audience: self.audience.clone(),
            })
            .await
    }

    fn secret_matches(&self, presented: Option<&str>) -> bool {
        match (&self.client.client_secret, presented) {
            (Some(expected), Some(presented)) => {
                presented.as_bytes().ct_eq(expected.as_bytes()).into()
            }
            _ => false,
        }
    }
}
