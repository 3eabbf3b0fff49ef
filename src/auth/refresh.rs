use super::error::RefreshError;
use super::traits::{AuthServer, CredentialPair, LoginRequest, RefreshTokenRequest, TokenResponse};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Upper bound on a single refresh call. Expiry counts as a failed refresh.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

const REFRESH_PATH: &str = "auth/token";
const LOGIN_PATH: &str = "auth/login";
const LOGOUT_PATH: &str = "auth/logout";

/// Talks to the eventify API's auth endpoints over HTTP.
#[derive(Clone)]
pub struct HttpAuthServer {
    client: Client,
    refresh_url: Url,
    login_url: Url,
    logout_url: Url,
}

impl HttpAuthServer {
    /// `base_url` is the API root, e.g. `https://eventify.example.com/api`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| anyhow!("Invalid authorization server URL '{}': {}", base_url, e))?;

        if base.cannot_be_a_base() {
            return Err(anyhow!("Authorization server URL '{}' cannot be a base", base_url));
        }

        // Url::join replaces the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            refresh_url: base.join(REFRESH_PATH)?,
            login_url: base.join(LOGIN_PATH)?,
            logout_url: base.join(LOGOUT_PATH)?,
        })
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    /// One POST, no retries. Non-2xx is a rejection; a body we can't parse is
    /// an invalid response unless reading it timed out.
    async fn post_tokens<T: Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &T,
    ) -> Result<TokenResponse, RefreshError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(RefreshError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                RefreshError::Unreachable(e)
            } else {
                RefreshError::InvalidResponse(e)
            }
        })
    }
}

#[async_trait]
impl AuthServer for HttpAuthServer {
    async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, RefreshError> {
        let body = self
            .post_tokens(&self.refresh_url, &RefreshTokenRequest { refresh_token })
            .await?;

        // the server may rotate the refresh token or hand back nothing,
        // in which case the one we sent is still the one to keep
        Ok(CredentialPair {
            access_token: body.access_token,
            refresh_token: body
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<CredentialPair, RefreshError> {
        let body = self
            .post_tokens(&self.login_url, &LoginRequest { email, password })
            .await?;

        Ok(CredentialPair {
            access_token: body.access_token,
            refresh_token: body.refresh_token.ok_or(RefreshError::MissingRefreshToken)?,
        })
    }

    async fn logout(&self, access_token: &str) -> Result<(), RefreshError> {
        let response = self
            .client
            .get(self.logout_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(RefreshError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status));
        }
        Ok(())
    }
}
