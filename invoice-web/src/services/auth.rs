use crate::config::IssuerSettings;
use crate::models::{Credentials, Issuer};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no issuer account is configured")]
    NotConfigured,

    #[error("authentication backend failed: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Checks validated credentials and yields the signed-in issuer.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Issuer, AuthError>;
}

/// Single issuer account taken from configuration.
///
/// Without a configured account every attempt is rejected.
pub struct ConfiguredIssuer {
    account: Option<IssuerSettings>,
}

impl ConfiguredIssuer {
    pub fn new(account: Option<IssuerSettings>) -> Self {
        Self { account }
    }
}

#[async_trait]
impl Authenticator for ConfiguredIssuer {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Issuer, AuthError> {
        let account = self.account.as_ref().ok_or(AuthError::NotConfigured)?;

        let email_matches = account.email.eq_ignore_ascii_case(credentials.email.trim());
        let password_matches: bool = account
            .password
            .expose_secret()
            .as_bytes()
            .ct_eq(credentials.password.expose_secret().as_bytes())
            .into();

        if email_matches && password_matches {
            Ok(Issuer {
                email: account.email.clone(),
            })
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
