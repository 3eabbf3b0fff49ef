mod context;
mod cookie;
mod error;
mod middleware;
mod refresh;
mod routes;
mod token;
mod traits;

pub use context::{Identity, SessionContext};
pub use cookie::{
    ACCESS_COOKIE_NAME, COOKIE_PATH, CookieSettings, CookieUpdate, CredentialStore,
    REFRESH_COOKIE_NAME, get_cookie,
};
pub use error::{DecodeError, RefreshError, SessionError};
pub use middleware::session_gateway;
pub use refresh::{DEFAULT_REFRESH_TIMEOUT, HttpAuthServer};
pub use routes::{APPLICATION_PATH, LOGIN_PATH, RouteClassifier, RouteKind};
pub use token::{
    DEFAULT_REFRESH_BUFFER_SECS, decode, decode_fresh, is_expired, is_expired_at,
    time_until_expiry, time_until_expiry_at,
};
pub use traits::{AuthServer, Claims, CredentialPair, StoredCredentials};

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the session gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub auth_server_url: String,
    pub refresh_buffer_secs: i64,
    pub refresh_timeout: Duration,
    pub cookies: CookieSettings,
}

/// Where a request's stored credentials stand before any refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    NoCredentials,
    AccessFresh,
    AccessStaleRefreshFresh,
    AllExpiredOrInvalid,
}

/// Outcome of resolving one request's credentials.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub state: CredentialState,
    pub context: SessionContext,
    /// The pair in force once the response is applied: what the client sent,
    /// the refreshed pair, or nothing if the session was discarded.
    pub credentials: StoredCredentials,
    pub cookies: CookieUpdate,
}

/// Bundles the collaborators the gateway needs for every request.
/// Holds no per-request state, so one instance serves all requests.
#[derive(Clone)]
pub struct SessionGateway {
    auth_server: Arc<dyn AuthServer + Send + Sync>,
    store: CredentialStore,
    routes: RouteClassifier,
    buffer_secs: i64,
}

impl SessionGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let auth_server = Arc::new(HttpAuthServer::new(
            &config.auth_server_url,
            config.refresh_timeout,
        )?);

        Ok(Self::with_auth_server(
            auth_server,
            config.cookies,
            config.refresh_buffer_secs,
        ))
    }

    pub fn with_auth_server(
        auth_server: Arc<dyn AuthServer + Send + Sync>,
        cookies: CookieSettings,
        buffer_secs: i64,
    ) -> Self {
        Self {
            auth_server,
            store: CredentialStore::new(cookies, buffer_secs),
            routes: RouteClassifier::default(),
            buffer_secs,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn routes(&self) -> &RouteClassifier {
        &self.routes
    }

    /// Pure classification of what the client sent; no I/O.
    pub fn credential_state(&self, stored: &StoredCredentials, now: i64) -> CredentialState {
        if stored.is_empty() {
            return CredentialState::NoCredentials;
        }

        let access_fresh = stored
            .access_token
            .as_deref()
            .is_some_and(|t| !is_expired_at(t, self.buffer_secs, now));
        if access_fresh {
            return CredentialState::AccessFresh;
        }

        let refresh_fresh = stored
            .refresh_token
            .as_deref()
            .is_some_and(|t| !is_expired_at(t, self.buffer_secs, now));
        if refresh_fresh {
            CredentialState::AccessStaleRefreshFresh
        } else {
            CredentialState::AllExpiredOrInvalid
        }
    }

    /// Turn stored credentials into a session context plus the cookie changes
    /// to send back. Either a complete fresh pair is written, or everything is
    /// cleared; never a mix.
    pub async fn resolve(&self, stored: &StoredCredentials) -> Resolution {
        let now = Utc::now().timestamp();
        let state = self.credential_state(stored, now);
        tracing::debug!("Credential state: {:?}", state);

        let (context, credentials, cookies) = match (state, stored) {
            (CredentialState::NoCredentials, _) => (
                SessionContext::Anonymous,
                StoredCredentials::default(),
                CookieUpdate::none(),
            ),
            (
                CredentialState::AccessFresh,
                StoredCredentials {
                    access_token: Some(access_token),
                    ..
                },
            ) => match decode_fresh(access_token, self.buffer_secs, now) {
                Ok(claims) => (
                    SessionContext::authenticated(claims),
                    stored.clone(),
                    CookieUpdate::none(),
                ),
                Err(e) => self.discard(&e),
            },
            (
                CredentialState::AccessStaleRefreshFresh,
                StoredCredentials {
                    refresh_token: Some(refresh_token),
                    ..
                },
            ) => match self.refresh(refresh_token).await {
                Ok((claims, pair, cookies)) => {
                    (SessionContext::authenticated(claims), StoredCredentials::from(pair), cookies)
                }
                Err(e) => self.discard(&e),
            },
            _ => {
                let reason = match stored.access_token.as_deref().map(decode) {
                    Some(Err(e)) => SessionError::MalformedToken(e),
                    _ => SessionError::ExpiredToken,
                };
                self.discard(&reason)
            }
        };

        Resolution {
            state,
            context,
            credentials,
            cookies,
        }
    }

    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<(Claims, CredentialPair, CookieUpdate), SessionError> {
        let pair = self.auth_server.refresh(refresh_token).await?;
        let (claims, cookies) = self.persist(&pair)?;

        tracing::info!(
            "Refreshed session for {}",
            claims.sub.as_deref().unwrap_or("<unknown subject>")
        );
        Ok((claims, pair, cookies))
    }

    /// Start a session from email and password. Nothing is written unless the
    /// server hands back a complete, fresh pair.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(SessionContext, CookieUpdate), SessionError> {
        let pair = self.auth_server.login(email, password).await?;
        let (claims, cookies) = self.persist(&pair)?;

        tracing::info!("Logged in {}", email);
        Ok((SessionContext::authenticated(claims), cookies))
    }

    fn persist(&self, pair: &CredentialPair) -> Result<(Claims, CookieUpdate), SessionError> {
        // freshness is judged at write time, after the network round trip
        let cookies = self.store.write_at(pair, Utc::now().timestamp())?;
        let claims = decode(&pair.access_token)?;
        Ok((claims, cookies))
    }

    fn discard(&self, reason: &SessionError) -> (SessionContext, StoredCredentials, CookieUpdate) {
        match reason {
            SessionError::ExpiredToken => {
                tracing::debug!("Session expired, clearing credentials")
            }
            other => tracing::warn!(
                kind = other.kind(),
                "Discarding session credentials: {}",
                other
            ),
        }
        (
            SessionContext::Anonymous,
            StoredCredentials::default(),
            self.store.clear(),
        )
    }

    /// End the session: best-effort notify the API, then clear both cookies.
    /// `current` is the pair left in force by `resolve`, so a session refreshed
    /// on this very request is revoked with its new access token.
    pub async fn logout(&self, current: &StoredCredentials) -> CookieUpdate {
        if let Some(access_token) = current.access_token.as_deref() {
            match self.auth_server.logout(access_token).await {
                Ok(()) => tracing::info!("Session revoked at authorization server"),
                Err(e) => tracing::warn!("Logout call failed, clearing cookies anyway: {}", e),
            }
        }
        self.store.clear()
    }
}
