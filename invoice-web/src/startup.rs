use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use web_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, SecurityHeaders,
    REQUEST_ID_HEADER,
};

use crate::handlers::{
    app::{health_check, index, metrics, not_found},
    auth::{login_handler, login_page, logout_handler},
    invoices::{invoice_detail_page, list_invoices_page},
};
use crate::middleware::require_issuer;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let production = state.settings.environment.is_production();

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(production)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            state.settings.server.session_ttl_minutes,
        )));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/login", get(login_page).post(login_handler))
        .route("/logout", post(logout_handler))
        .route(
            "/invoices",
            get(list_invoices_page).layer(from_fn(require_issuer)),
        )
        .route("/invoices/:id", get(invoice_detail_page))
        .nest_service("/static", ServeDir::new(&state.settings.server.static_dir))
        .fallback(not_found)
        .layer(session_layer)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn_with_state(
            SecurityHeaders { hsts: production },
            security_headers_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outermost, so the span above sees the id.
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
