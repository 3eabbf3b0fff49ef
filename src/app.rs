//! Router assembly. The page handlers here are thin placeholders for the
//! dashboard front end; what matters is that they sit behind the gateway.

use crate::auth::{
    self, APPLICATION_PATH, LOGIN_PATH, SessionContext, SessionError, SessionGateway,
    StoredCredentials,
};
use axum::{
    Extension, Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_app(gateway: Arc<SessionGateway>) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route(LOGIN_PATH, get(login_page).post(login_action))
        .route("/logout", get(logout_handler))
        .route("/verify/resend", get(|| async { "Resend verification email" }))
        .route("/verify/email/{token}", get(verify_email_page))
        .route("/password/forgot", get(|| async { "Forgot password" }))
        .route("/password/reset/{token}", get(reset_password_page))
        .route(APPLICATION_PATH, get(dashboards_page))
        .route("/app/session", get(session_handler))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(middleware::from_fn_with_state(
            gateway.clone(),
            auth::session_gateway,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

async fn home_page(session: SessionContext) -> String {
    match session.identity() {
        Some(identity) => format!("Welcome back, {}", identity.display_name()),
        None => "Welcome to Eventify".to_string(),
    }
}

/// Already-logged-in users skip the login form.
async fn login_page(session: SessionContext) -> Response {
    if session.identity().is_some_and(|i| i.is_active()) {
        return Redirect::to(APPLICATION_PATH).into_response();
    }
    "Log in".into_response()
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login_action(
    State(gateway): State<Arc<SessionGateway>>,
    Form(form): Form<LoginForm>,
) -> Response {
    match gateway.login(&form.email, &form.password).await {
        Ok((session, cookies)) => {
            let mut response = if session.identity().is_some_and(|i| i.is_active()) {
                Redirect::to(APPLICATION_PATH).into_response()
            } else {
                "Check your inbox to verify your account".into_response()
            };
            cookies.apply(response.headers_mut());
            response
        }
        Err(e) => {
            tracing::warn!(kind = e.kind(), "Login failed: {}", e);
            match e {
                SessionError::RefreshRejected(_) => {
                    (StatusCode::UNAUTHORIZED, "Invalid email or password").into_response()
                }
                SessionError::RefreshUnreachable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "Login is unavailable right now")
                        .into_response()
                }
                _ => (StatusCode::BAD_GATEWAY, "Login failed").into_response(),
            }
        }
    }
}

/// Revokes with the credentials the gateway left in force, which after a
/// refresh on this request are the new ones, not what the browser sent.
async fn logout_handler(
    State(gateway): State<Arc<SessionGateway>>,
    Extension(current): Extension<StoredCredentials>,
) -> Response {
    let cookies = gateway.logout(&current).await;

    let mut response = Redirect::to(LOGIN_PATH).into_response();
    cookies.apply(response.headers_mut());
    response
}

async fn verify_email_page(Path(_token): Path<String>) -> &'static str {
    "Verifying email"
}

async fn reset_password_page(Path(_token): Path<String>) -> &'static str {
    "Reset password"
}

async fn dashboards_page(session: SessionContext) -> String {
    let name = session
        .identity()
        .map(|i| i.display_name())
        .unwrap_or_default();
    format!("Dashboards for {}", name)
}

async fn session_handler(session: SessionContext) -> Response {
    match session.identity() {
        Some(identity) => Json(identity.clone()).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
