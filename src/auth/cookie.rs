//! Credential cookies: reading them off the request and building the
//! `Set-Cookie` headers that persist or clear them.

use super::error::SessionError;
use super::token;
use super::traits::{CredentialPair, StoredCredentials};
use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Utc;

/// Default cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "EVENTIFY_ACCESS_TOKEN";

/// Default cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "EVENTIFY_REFRESH_TOKEN";

/// Cookie scope. Writes and clears must use the same path or the browser
/// keeps two copies around.
pub const COOKIE_PATH: &str = "/";

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub access_name: String,
    pub refresh_name: String,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            access_name: ACCESS_COOKIE_NAME.to_string(),
            refresh_name: REFRESH_COOKIE_NAME.to_string(),
            secure: true,
        }
    }
}

/// Pending `Set-Cookie` headers. Built whole, applied whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieUpdate(Vec<HeaderValue>);

impl CookieUpdate {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn headers(&self) -> &[HeaderValue] {
        &self.0
    }

    /// Cookies a handler already set are re-appended after ours, so a
    /// handler clearing the session (logout) wins over a refresh write.
    pub fn apply(self, headers: &mut HeaderMap) {
        if self.0.is_empty() {
            return;
        }

        let downstream: Vec<HeaderValue> = headers.get_all(header::SET_COOKIE).iter().cloned().collect();
        headers.remove(header::SET_COOKIE);
        for value in self.0.into_iter().chain(downstream) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

/// Reads and writes the credential pair held in the client's cookie jar.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    settings: CookieSettings,
    buffer_secs: i64,
}

impl CredentialStore {
    pub fn new(settings: CookieSettings, buffer_secs: i64) -> Self {
        Self {
            settings,
            buffer_secs,
        }
    }

    pub fn read(&self, headers: &HeaderMap) -> StoredCredentials {
        StoredCredentials {
            access_token: get_cookie(headers, &self.settings.access_name).map(str::to_string),
            refresh_token: get_cookie(headers, &self.settings.refresh_name).map(str::to_string),
        }
    }

    pub fn write(&self, pair: &CredentialPair) -> Result<CookieUpdate, SessionError> {
        self.write_at(pair, Utc::now().timestamp())
    }

    /// Both cookies or neither. Refuses pairs whose access token is not fresh
    /// or whose refresh token is already dead, and sizes each cookie's
    /// Max-Age to its own token's remaining lifetime.
    pub fn write_at(&self, pair: &CredentialPair, now: i64) -> Result<CookieUpdate, SessionError> {
        token::decode_fresh(&pair.access_token, self.buffer_secs, now)?;
        token::decode_fresh(&pair.refresh_token, 0, now)?;

        let access = self.set_cookie(
            &self.settings.access_name,
            &pair.access_token,
            token::time_until_expiry_at(&pair.access_token, now),
        )?;
        let refresh = self.set_cookie(
            &self.settings.refresh_name,
            &pair.refresh_token,
            token::time_until_expiry_at(&pair.refresh_token, now),
        )?;

        Ok(CookieUpdate(vec![access, refresh]))
    }

    pub fn clear(&self) -> CookieUpdate {
        let values = [&self.settings.access_name, &self.settings.refresh_name]
            .into_iter()
            .filter_map(|name| self.set_cookie(name, "", 0).ok())
            .collect();
        CookieUpdate(values)
    }

    fn set_cookie(&self, name: &str, value: &str, max_age: u64) -> Result<HeaderValue, SessionError> {
        if !value.bytes().all(is_cookie_octet) {
            return Err(SessionError::StorageWriteFailure(format!(
                "value for cookie {} contains characters not allowed in a cookie",
                name
            )));
        }

        let secure = if self.settings.secure { "; Secure" } else { "" };
        let cookie = format!(
            "{}={}; HttpOnly; SameSite=Strict; Path={}; Max-Age={}{}",
            name, value, COOKIE_PATH, max_age, secure
        );

        HeaderValue::from_str(&cookie).map_err(|e| SessionError::StorageWriteFailure(e.to_string()))
    }
}

/// RFC 6265 cookie-octet
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

/// Extract a cookie value from the Cookie header(s). Empty values count as absent.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
