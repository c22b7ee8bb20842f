use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session key holding the signed-in issuer's email.
pub const ISSUER_EMAIL_KEY: &str = "issuer_email";

/// Authenticated issuer extracted from the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    pub email: String,
}

impl Issuer {
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Issuer
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to extract session",
                )
                    .into_response()
            })?;

        let email: Option<String> = session.get(ISSUER_EMAIL_KEY).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to read issuer from session");
            None
        });

        match email {
            Some(email) => Ok(Issuer { email }),
            None => Err(Redirect::to("/login").into_response()),
        }
    }
}
