//! Credential Store: TTL-bounded storage for authorization codes, access
//! tokens and refresh tokens.
//!
//! [`KeyValueStore`] is the raw expiring map. [`MemoryStore`] keeps it in
//! process memory; a deployment with several server instances must back the
//! trait with a shared cache instead. [`CredentialStore`] layers the three
//! typed credential kinds on top, each under its own key namespace.
//!
//! Lookups never distinguish "expired" from "never existed".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

/// Authorization codes live 10 minutes.
pub const AUTHORIZATION_CODE_TTL: Duration = Duration::from_secs(600);
/// Access tokens live 1 hour.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3600);
/// Refresh tokens live 7 days.
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

const CODE_PREFIX: &str = "auth_code:";
const ACCESS_PREFIX: &str = "access_token:";
const REFRESH_PREFIX: &str = "refresh_token:";

/// Expiring key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value`; overwriting an existing key resets its TTL.
    async fn put(&self, key: &str, value: Value, ttl: Duration);

    /// Value under `key`, or `None` once expired or deleted.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Atomically read and delete. At most one caller ever receives a value.
    async fn take(&self, key: &str) -> Option<Value>;

    async fn delete(&self, key: &str);

    /// Drop every expired entry, returning how many were removed.
    async fn purge_expired(&self) -> usize;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process [`KeyValueStore`] backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, e| !e.is_live(now));
        None
    }

    async fn take(&self, key: &str) -> Option<Value> {
        let (_, entry) = self.entries.remove(key)?;
        entry.is_live(Instant::now()).then_some(entry.value)
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(now));
        before.saturating_sub(self.entries.len())
    }
}

/// Stored state of an issued authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: Option<String>,
    pub pkce_challenge: Option<String>,
    pub pkce_method: Option<String>,
}

/// Everything needed to mint an [`AuthorizationCode`].
#[derive(Debug, Clone, Default)]
pub struct CodeGrant {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: Option<String>,
    pub pkce_challenge: Option<String>,
    pub pkce_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    pub scope: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub issuer: String,
    pub audience: String,
    pub subject: String,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token: String,
    pub client_id: String,
    pub scope: String,
    pub linked_access_token: String,
}

/// Who a token pair is issued to and by.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub client_id: String,
    pub scope: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: AccessToken,
    pub refresh: RefreshToken,
}

/// Typed credential operations over a shared [`KeyValueStore`].
#[derive(Clone)]
pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Mint and store a single-use authorization code.
    pub async fn create_authorization_code(&self, grant: CodeGrant) -> AuthorizationCode {
        let code = AuthorizationCode {
            code: random_hex::<16>(),
            client_id: grant.client_id,
            redirect_uri: grant.redirect_uri,
            scope: grant.scope,
            state: grant.state,
            pkce_challenge: grant.pkce_challenge,
            pkce_method: grant.pkce_method,
        };
        self.put_record(CODE_PREFIX, &code.code, &code, AUTHORIZATION_CODE_TTL).await;
        code
    }

    /// Consume an authorization code. A second call with the same code
    /// always returns `None`.
    pub async fn redeem_authorization_code(&self, code: &str) -> Option<AuthorizationCode> {
        let value = self.kv.take(&key(CODE_PREFIX, code)).await?;
        decode(value)
    }

    /// Issue an access token and a refresh token linked to it.
    pub async fn issue_tokens(&self, grant: TokenGrant) -> TokenPair {
        let now = Utc::now();
        let access = AccessToken {
            token: random_hex::<32>(),
            client_id: grant.client_id.clone(),
            scope: grant.scope.clone(),
            issued_at: now,
            expires_at: now + chrono::Duration::seconds(ACCESS_TOKEN_TTL.as_secs() as i64),
            issuer: grant.issuer,
            audience: grant.audience,
            subject: grant.client_id.clone(),
        };
        let refresh = RefreshToken {
            token: random_hex::<32>(),
            client_id: grant.client_id,
            scope: grant.scope,
            linked_access_token: access.token.clone(),
        };

        self.put_record(ACCESS_PREFIX, &access.token, &access, ACCESS_TOKEN_TTL).await;
        self.put_record(REFRESH_PREFIX, &refresh.token, &refresh, REFRESH_TOKEN_TTL).await;

        TokenPair { access, refresh }
    }

    /// Look up a live access token.
    pub async fn access_token(&self, token: &str) -> Option<AccessToken> {
        let value = self.kv.get(&key(ACCESS_PREFIX, token)).await?;
        let access: AccessToken = decode(value)?;
        (!access.is_expired(Utc::now())).then_some(access)
    }

    pub async fn revoke_access_token(&self, token: &str) {
        self.kv.delete(&key(ACCESS_PREFIX, token)).await;
    }

    /// Consume a refresh token; it can be redeemed once.
    pub async fn redeem_refresh_token(&self, token: &str) -> Option<RefreshToken> {
        let value = self.kv.take(&key(REFRESH_PREFIX, token)).await?;
        decode(value)
    }

    pub async fn purge_expired(&self) -> usize {
        self.kv.purge_expired().await
    }

    async fn put_record<T: Serialize>(&self, prefix: &str, id: &str, record: &T, ttl: Duration) {
        match serde_json::to_value(record) {
            Ok(value) => self.kv.put(&key(prefix, id), value, ttl).await,
            Err(e) => tracing::error!(error = %e, "failed to encode credential record"),
        }
    }
}

fn key(prefix: &str, id: &str) -> String {
    format!("{prefix}{id}")
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Option<T> {
    serde_json::from_value(value)
        .map_err(|e| tracing::warn!(error = %e, "discarding undecodable credential record"))
        .ok()
}

/// `N` random bytes, hex encoded.
pub fn random_hex<const N: usize>() -> String {
    let bytes: [u8; N] = rand::rng().random();
    hex::encode(bytes)
}
