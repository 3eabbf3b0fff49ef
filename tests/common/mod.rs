#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, http::Response};
use eventify_gateway::auth::{
    AuthServer, CookieSettings, CredentialPair, RefreshError, SessionGateway,
};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SUBJECT: &str = "jane@example.com";

/// Mint a signed token expiring `offset_secs` from now.
pub fn mint_token(offset_secs: i64) -> String {
    mint_token_for(SUBJECT, offset_secs)
}

pub fn mint_token_for(subject: &str, offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": subject,
        "first_name": "Jane",
        "last_name": "Doe",
        "authority": "ROLE_USER",
        "permissions": ["READ_DASHBOARD"],
        "teams": ["ops"],
        "enabled": true,
        "validated": true,
        "last_login": now - 3600,
        "created": now - 86_400,
        "iat": now,
        "exp": now + offset_secs,
        "iss": "https://api.eventify.test"
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-jwt-secret"),
    )
    .expect("Failed to encode test token")
}

/// Two segments instead of three.
pub fn malformed_token() -> String {
    let token = mint_token(600);
    let (head, _) = token.rsplit_once('.').unwrap();
    head.to_string()
}

pub fn cookie_header(access: Option<&str>, refresh: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(a) = access {
        parts.push(format!("EVENTIFY_ACCESS_TOKEN={}", a));
    }
    if let Some(r) = refresh {
        parts.push(format!("EVENTIFY_REFRESH_TOKEN={}", r));
    }
    parts.join("; ")
}

pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub fn is_clear(cookie: &str) -> bool {
    cookie.contains("=;") && cookie.contains("Max-Age=0") && cookie.contains("Path=/")
}

/// In-process stand-in for the authorization server.
pub struct FakeAuthServer {
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    reply: Mutex<Option<CredentialPair>>,
    revoked: Mutex<Vec<String>>,
}

impl FakeAuthServer {
    /// Answers every refresh with this pair.
    pub fn accepting(pair: CredentialPair) -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            reply: Mutex::new(Some(pair)),
            revoked: Mutex::new(Vec::new()),
        })
    }

    /// Answers every refresh with a 401.
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            reply: Mutex::new(None),
            revoked: Mutex::new(Vec::new()),
        })
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    /// Access tokens the gateway asked us to revoke, in order.
    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthServer for FakeAuthServer {
    async fn refresh(&self, _refresh_token: &str) -> Result<CredentialPair, RefreshError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .lock()
            .unwrap()
            .clone()
            .ok_or(RefreshError::Rejected(reqwest::StatusCode::UNAUTHORIZED))
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<CredentialPair, RefreshError> {
        self.reply
            .lock()
            .unwrap()
            .clone()
            .ok_or(RefreshError::Rejected(reqwest::StatusCode::UNAUTHORIZED))
    }

    async fn logout(&self, access_token: &str) -> Result<(), RefreshError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.revoked.lock().unwrap().push(access_token.to_string());
        Ok(())
    }
}

pub fn gateway_with(server: Arc<FakeAuthServer>) -> Arc<SessionGateway> {
    Arc::new(SessionGateway::with_auth_server(
        server,
        CookieSettings::default(),
        60,
    ))
}

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
