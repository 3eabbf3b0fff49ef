//! Request-scoped session context.
//!
//! The gateway computes exactly one `SessionContext` per request, puts it in
//! the request extensions, and nothing mutates it afterwards. Handlers read
//! it back with the extractor below.

use super::traits::Claims;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

/// Advisory identity snapshot copied out of the access token. The API still
/// makes every real authorization decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub subject: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub authority: Option<String>,
    pub permissions: Vec<String>,
    pub teams: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub validated: bool,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub issuer: Option<String>,
}

impl Identity {
    /// "First Last", whichever halves exist, else the subject.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            self.subject.clone().unwrap_or_default()
        } else {
            name
        }
    }

    /// Enabled and email-validated.
    pub fn is_active(&self) -> bool {
        self.enabled && self.validated
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            first_name: claims.first_name,
            last_name: claims.last_name,
            authority: claims.authority,
            permissions: claims.permissions,
            teams: claims.teams,
            last_login: timestamp(claims.last_login),
            created: timestamp(claims.created),
            enabled: claims.enabled.unwrap_or(false),
            validated: claims.validated.unwrap_or(false),
            issued_at: timestamp(claims.iat),
            expires_at: timestamp(Some(claims.exp)),
            issuer: claims.iss,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionContext {
    Authenticated(Arc<Identity>),
    Anonymous,
}

impl SessionContext {
    pub fn authenticated(claims: Claims) -> Self {
        SessionContext::Authenticated(Arc::new(Identity::from(claims)))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionContext::Authenticated(identity) => Some(identity.as_ref()),
            SessionContext::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionContext::Authenticated(_))
    }
}

/// Never fails. A request that bypassed the gateway is anonymous.
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .unwrap_or(SessionContext::Anonymous))
    }
}
