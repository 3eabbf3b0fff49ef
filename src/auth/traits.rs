use super::error::RefreshError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Decoded payload of a session token. Only `exp` is mandatory; refresh
/// tokens carry little more than `sub`/`iat`/`exp`/`iss`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>, // Subject (user email)
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub authority: Option<String>, // Role, e.g. ROLE_ADMIN
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default, alias = "lastLogin")]
    pub last_login: Option<i64>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub validated: Option<bool>,
    #[serde(default)]
    pub iat: Option<i64>, // Issued at
    pub exp: i64,         // Expiration time
    #[serde(default)]
    pub iss: Option<String>, // Issuer
}

/// The two bearer credentials handed out by the authorization server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

// tokens are bearer secrets, keep them out of debug logs
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Whatever the client sent us; either cookie may be missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredCredentials {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<CredentialPair> for StoredCredentials {
    fn from(pair: CredentialPair) -> Self {
        Self {
            access_token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
        }
    }
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<present>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<present>"))
            .finish()
    }
}

/// Body of `POST /auth/token`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body of `POST /auth/login`
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful body of `POST /auth/token` and `POST /auth/login`. The server
/// also sends identity fields (email, authorities, ...) which we don't need.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The remote authorization server the gateway talks to.
#[async_trait]
pub trait AuthServer {
    /// Exchange a refresh token for a new credential pair. Exactly one attempt.
    async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, RefreshError>;

    /// Exchange email and password for a fresh credential pair.
    async fn login(&self, email: &str, password: &str) -> Result<CredentialPair, RefreshError>;

    /// Tell the server the session is over. Best effort.
    async fn logout(&self, access_token: &str) -> Result<(), RefreshError>;
}
