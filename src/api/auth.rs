//! Caller identity for the task API.
//!
//! - Every protected request is resolved to a [`Credential`] exactly once,
//!   by the `require_auth` middleware, and stored in the request extensions
//! - In dev mode the credential is the fixed placeholder (account 1, user 1)
//!   holding every permission
//! - Otherwise callers send `Authorization: Bearer <jwt>`; the claims carry
//!   `idAccount`, `idUser` and `permissions` such as `"TASK:CREATE"`
//!
//! # Security notes
//! - There is no login endpoint; tokens are minted by an external identity
//!   service sharing `JWT_SECRET`.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::routes::AppState;
use crate::config::AuthConfig;

/// Action requested against a securable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Create => "CREATE",
            Permission::Read => "READ",
            Permission::Update => "UPDATE",
            Permission::Delete => "DELETE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATE" => Some(Permission::Create),
            "READ" => Some(Permission::Read),
            "UPDATE" => Some(Permission::Update),
            "DELETE" => Some(Permission::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (securable, permission) pair an operation requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecurityRule {
    pub securable: String,
    pub permission: Permission,
}

impl SecurityRule {
    pub fn new(securable: impl Into<String>, permission: Permission) -> Self {
        Self {
            securable: securable.into(),
            permission,
        }
    }

    /// Parse the `SECURABLE:PERMISSION` token form used in JWT claims.
    pub fn parse(grant: &str) -> Option<Self> {
        let (securable, permission) = grant.split_once(':')?;
        if securable.is_empty() {
            return None;
        }
        Some(Self::new(securable, Permission::parse(permission)?))
    }

    pub fn to_grant(&self) -> String {
        format!("{}:{}", self.securable, self.permission)
    }
}

/// What a caller is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grants {
    All,
    Only(HashSet<SecurityRule>),
}

/// The resolved identity of a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub account_id: i64,
    pub user_id: i64,
    pub grants: Grants,
}

impl Credential {
    /// Dev-mode identity: account 1, user 1, every permission.
    pub fn placeholder() -> Self {
        Self {
            account_id: 1,
            user_id: 1,
            grants: Grants::All,
        }
    }

    pub fn allows(&self, rule: &SecurityRule) -> bool {
        match &self.grants {
            Grants::All => true,
            Grants::Only(rules) => rules.contains(rule),
        }
    }

    /// First required rule the caller does not hold, if any.
    pub fn first_missing<'a>(&self, required: &'a [SecurityRule]) -> Option<&'a SecurityRule> {
        required.iter().find(|rule| !self.allows(rule))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),
}

/// Resolves the caller of a request.
pub trait IdentityProvider: Send + Sync {
    /// Short name reported by the health endpoint.
    fn mode(&self) -> &'static str;

    fn resolve(&self, headers: &HeaderMap) -> Result<Credential, AuthError>;
}

/// Always answers with the same credential.
pub struct StaticIdentity {
    credential: Credential,
}

impl StaticIdentity {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl Default for StaticIdentity {
    fn default() -> Self {
        Self::new(Credential::placeholder())
    }
}

impl IdentityProvider for StaticIdentity {
    fn mode(&self) -> &'static str {
        "disabled"
    }

    fn resolve(&self, _headers: &HeaderMap) -> Result<Credential, AuthError> {
        Ok(self.credential.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    sub: String,
    id_account: i64,
    id_user: i64,
    /// `SECURABLE:PERMISSION` tokens, or `*` for everything
    #[serde(default)]
    permissions: Vec<String>,
    iat: i64,
    exp: i64,
}

impl Claims {
    fn into_credential(self) -> Credential {
        let grants = if self.permissions.iter().any(|p| p == "*") {
            Grants::All
        } else {
            let rules = self
                .permissions
                .iter()
                .filter_map(|p| {
                    let rule = SecurityRule::parse(p);
                    if rule.is_none() {
                        tracing::warn!("Ignoring malformed permission claim {:?}", p);
                    }
                    rule
                })
                .collect();
            Grants::Only(rules)
        };
        Credential {
            account_id: self.id_account,
            user_id: self.id_user,
            grants,
        }
    }
}

/// Verifies HS256 bearer tokens.
pub struct JwtIdentity {
    secret: String,
}

impl JwtIdentity {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Mint a token for `(account_id, user_id)` holding `grants`.
    ///
    /// There is no login endpoint; this is for tooling that mints dev and
    /// test tokens against the shared `JWT_SECRET`.
    pub fn issue(
        &self,
        account_id: i64,
        user_id: i64,
        grants: &[SecurityRule],
        ttl: Duration,
    ) -> jsonwebtoken::errors::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: format!("{}:{}", account_id, user_id),
            id_account: account_id,
            id_user: user_id,
            permissions: grants.iter().map(SecurityRule::to_grant).collect(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

impl IdentityProvider for JwtIdentity {
    fn mode(&self) -> &'static str {
        "jwt"
    }

    fn resolve(&self, headers: &HeaderMap) -> Result<Credential, AuthError> {
        let auth_header = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .unwrap_or("")
            .trim();

        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        Ok(self.verify(token)?.into_credential())
    }
}

/// Build the identity provider selected by the configuration.
pub fn provider_for(config: &AuthConfig) -> Arc<dyn IdentityProvider> {
    match config {
        AuthConfig::Disabled => Arc::new(StaticIdentity::default()),
        AuthConfig::Jwt { secret } => Arc::new(JwtIdentity::new(secret.clone())),
    }
}

/// Resolve the caller and stash the [`Credential`] for the handlers.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match state.identity.resolve(req.headers()) {
        Ok(credential) => {
            req.extensions_mut().insert(credential);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Rejected request to {}: {}", req.uri().path(), e);
            ApiError::from(e).into_response()
        }
    }
}
