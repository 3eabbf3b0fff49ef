use super::routes::{LOGIN_PATH, RouteKind};
use super::SessionGateway;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Session gateway middleware.
///
/// Resolves the cookie credentials (refreshing them if needed), attaches the
/// resulting `SessionContext` and the credentials now in force to the
/// request, and gates private routes:
/// unauthenticated requests to them get a 303 to the login page and the
/// downstream handler never runs. Public routes always go through.
pub async fn session_gateway(
    State(gateway): State<Arc<SessionGateway>>,
    req: Request,
    next: Next,
) -> Response {
    let span = tracing::info_span!(
        "session_gateway",
        request_id = %Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    );

    handle(gateway, req, next).instrument(span).await
}

async fn handle(gateway: Arc<SessionGateway>, mut req: Request, next: Next) -> Response {
    // pure, so do it before touching cookies or the network
    let route = gateway.routes().classify(req.uri().path());
    tracing::debug!("Route classified as {:?}", route);

    let stored = gateway.store().read(req.headers());
    let resolution = gateway.resolve(&stored).await;

    if route == RouteKind::Private && !resolution.context.is_authenticated() {
        tracing::debug!("Unauthenticated request to private route, redirecting to login");
        let mut response = Redirect::to(LOGIN_PATH).into_response();
        resolution.cookies.apply(response.headers_mut());
        return response;
    }

    req.extensions_mut().insert(resolution.context);
    req.extensions_mut().insert(resolution.credentials);
    let mut response = next.run(req).await;
    resolution.cookies.apply(response.headers_mut());
    response
}
