use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::issuer::ISSUER_EMAIL_KEY;

/// Send visitors without an issuer session to the login page.
pub async fn require_issuer(session: Session, request: Request<Body>, next: Next) -> Response {
    let email: Option<String> = session.get(ISSUER_EMAIL_KEY).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to read session");
        None
    });

    if email.is_none() {
        tracing::debug!(path = %request.uri().path(), "No issuer session, redirecting to login");
        return Redirect::to("/login").into_response();
    }

    next.run(request).await
}
