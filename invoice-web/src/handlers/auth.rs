use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tower_sessions::Session;

use super::error::render;
use crate::models::credentials::LOGIN_FAILED_MESSAGE;
use crate::models::issuer::ISSUER_EMAIL_KEY;
use crate::models::{FieldErrors, Issuer, LoginForm};
use crate::AppState;

#[derive(Template, Default)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Echoed back after a failed attempt; the password never is.
    pub email: String,
    pub errors: FieldErrors,
    pub server_error: Option<&'static str>,
}

pub async fn login_page(session: Session) -> Response {
    let signed_in = session
        .get::<String>(ISSUER_EMAIL_KEY)
        .await
        .ok()
        .flatten()
        .is_some();

    if signed_in {
        return Redirect::to("/invoices").into_response();
    }

    render(StatusCode::OK, LoginTemplate::default())
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.clone();

    let credentials = match form.into_credentials() {
        Ok(credentials) => credentials,
        Err(errors) => {
            return render(
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginTemplate {
                    email,
                    errors,
                    server_error: None,
                },
            );
        }
    };

    let issuer = match state.authenticator.authenticate(&credentials).await {
        Ok(issuer) => issuer,
        Err(e) => {
            tracing::warn!(error = %e, "Login attempt rejected");
            return login_failed(email);
        }
    };

    if let Err(e) = start_session(&session, &issuer).await {
        tracing::error!(error = %e, "Failed to store issuer session");
        return login_failed(email);
    }

    tracing::info!(email = %issuer.email, "Issuer logged in");
    Redirect::to("/invoices").into_response()
}

async fn start_session(session: &Session, issuer: &Issuer) -> Result<(), tower_sessions::session::Error> {
    // New id on privilege change.
    session.cycle_id().await?;
    session.insert(ISSUER_EMAIL_KEY, &issuer.email).await
}

fn login_failed(email: String) -> Response {
    render(
        StatusCode::UNAUTHORIZED,
        LoginTemplate {
            email,
            errors: FieldErrors::default(),
            server_error: Some(LOGIN_FAILED_MESSAGE),
        },
    )
}

pub async fn logout_handler(session: Session) -> Redirect {
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to clear session on logout");
    }
    Redirect::to("/login")
}
