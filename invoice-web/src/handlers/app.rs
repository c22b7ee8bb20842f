use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use super::error::not_found_response;
use crate::AppState;

/// The root has no page of its own.
pub async fn index() -> Redirect {
    Redirect::to("/login")
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

pub async fn not_found() -> Response {
    not_found_response()
}
