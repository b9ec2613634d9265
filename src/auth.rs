//! Authentication Gate.
//!
//! Two schemes, checked in order: an OAuth bearer access token issued by this
//! server, then the static shared secret in `X-API-Key`. A rejected request
//! gets 401 with a `WWW-Authenticate` challenge pointing at the
//! protected-resource metadata so clients can run discovery.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::credentials::{AccessToken, CredentialStore};
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer,
    ApiKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "bearer",
            Self::ApiKey => "api_key",
        }
    }
}

/// Read-only credential check shared by all protected routes.
#[derive(Clone)]
pub struct AuthGate {
    credentials: CredentialStore,
    api_key: Option<String>,
    resource_metadata_url: String,
}

impl AuthGate {
    pub fn new(
        credentials: CredentialStore,
        api_key: Option<String>,
        resource_metadata_url: String,
    ) -> Self {
        Self {
            credentials,
            api_key,
            resource_metadata_url,
        }
    }

    /// Decide how (and whether) a request is authenticated. First match wins.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Option<AuthMethod> {
        if let Some(token) = bearer_token(headers) {
            if self.bearer(token).await.is_some() {
                return Some(AuthMethod::Bearer);
            }
            tracing::warn!(token = %redact(token), "bearer token unknown or expired");
        }

        if let Some(presented) = header_str(headers, API_KEY_HEADER) {
            if self.api_key_matches(presented) {
                return Some(AuthMethod::ApiKey);
            }
            tracing::warn!(key = %redact(presented), "invalid api key");
        }

        None
    }

    /// Live access token behind a bearer credential, if any.
    pub async fn bearer(&self, token: &str) -> Option<AccessToken> {
        self.credentials.access_token(token).await
    }

    /// The `HEAD /mcp` probe: only a valid bearer token counts.
    pub async fn probe(&self, headers: &HeaderMap) -> bool {
        match bearer_token(headers) {
            Some(token) => self.bearer(token).await.is_some(),
            None => false,
        }
    }

    fn api_key_matches(&self, presented: &str) -> bool {
        match &self.api_key {
            Some(expected) => presented.as_bytes().ct_eq(expected.as_bytes()).into(),
            None => false,
        }
    }

    /// `WWW-Authenticate` value sent with every 401.
    pub fn challenge(&self) -> String {
        format!(
            "Bearer resource_metadata=\"{}\"",
            self.resource_metadata_url
        )
    }

    pub fn unauthorized(&self) -> Response {
        let mut resp = (
            StatusCode::UNAUTHORIZED,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"error":"unauthorized","error_description":"Authentication required. Provide an OAuth bearer token or X-API-Key header"}"#,
        )
            .into_response();
        if let Ok(v) = HeaderValue::from_str(&self.challenge()) {
            resp.headers_mut().insert(header::WWW_AUTHENTICATE, v);
        }
        resp
    }
}

/// Middleware guarding the streaming endpoints. Stores the [`AuthMethod`]
/// in request extensions for the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match state.auth.authenticate(request.headers()).await {
        Some(method) => {
            tracing::debug!(auth = method.as_str(), "request authenticated");
            request.extensions_mut().insert(method);
            next.run(request).await
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "rejecting unauthenticated request");
            state.auth.unauthorized()
        }
    }
}

/// Credentials of an `Authorization: Bearer ...` header. The scheme name is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

/// First 8 characters, for logs.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(8).collect();
    format!("{prefix}...")
}
