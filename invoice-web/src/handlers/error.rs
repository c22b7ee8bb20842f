use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::services::StoreError;

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: &'static str,
    pub message: String,
}

/// Failures that end a page request, each with its own HTML rendering.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("document store unavailable: {0}")]
    Upstream(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, title, message) = match &self {
            PageError::NotFound => return not_found_response(),
            PageError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "Bad request", reason.clone())
            }
            PageError::Upstream(err) => {
                tracing::error!(error = %err, status = ?err.status(), "Document store request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Invoice unavailable",
                    "The invoice could not be loaded right now. Please try again shortly."
                        .to_string(),
                )
            }
            PageError::Internal(err) => {
                tracing::error!(error = ?err, "Internal error while rendering page");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong",
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        render(
            status,
            ErrorTemplate {
                status: status.as_u16(),
                title,
                message,
            },
        )
    }
}

pub fn not_found_response() -> Response {
    render(StatusCode::NOT_FOUND, NotFoundTemplate {})
}

/// Render a template with an explicit status, falling back to plain text.
pub fn render<T: Template>(status: StatusCode, template: T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render template");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
