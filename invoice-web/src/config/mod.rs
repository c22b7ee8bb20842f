use crate::models::CompanyProfile;
use secrecy::Secret;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

pub const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com/v1";

/// Flat environment variables read alongside the `APP_`-prefixed overrides.
const ENVIRONMENT_VARIABLES: [&str; 10] = [
    "NODE_ENV",
    "NOTION_API_KEY",
    "NOTION_DATABASE_ID",
    "NOTION_API_URL",
    "VERCEL_URL",
    "NEXT_PUBLIC_APP_URL",
    "ISSUER_EMAIL",
    "ISSUER_PASSWORD",
    "OTEL_EXPORTER_OTLP_ENDPOINT",
    "LOG_LEVEL",
];

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration:\n{0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("NODE_ENV must be one of development, production, test (got `{0}`)")]
    UnknownEnvironment(String),

    #[error("ISSUER_EMAIL and ISSUER_PASSWORD must be set together")]
    IncompleteIssuer,

    #[error("could not determine the working directory: {0}")]
    WorkingDirectory(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    #[default]
    Development,
    Production,
    Test,
}

impl AppEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, AppEnvironment::Production)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppEnvironment {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "test" => Ok(AppEnvironment::Test),
            other => Err(ConfigurationError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Validated process configuration. Built once in `main` and shared by `Arc`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: AppEnvironment,
    pub server: ServerSettings,
    pub notion: NotionSettings,
    pub deployment: DeploymentSettings,
    pub company: CompanyProfile,
    pub issuer: Option<IssuerSettings>,
    pub telemetry: TelemetrySettings,
}

/// One year. Larger values overflow the session expiry arithmetic.
const MAX_SESSION_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_session_ttl_minutes")]
    #[validate(range(
        min = 1,
        max = MAX_SESSION_TTL_MINUTES,
        message = "server.session_ttl_minutes must be between 1 and 525600"
    ))]
    pub session_ttl_minutes: i64,
    /// Relative paths are taken from the crate directory by `get_configuration`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_session_ttl_minutes() -> i64 {
    12 * 60
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub api_key: Secret<String>,
    pub database_id: String,
    /// Base URL of the Notion REST API, without a trailing slash.
    pub api_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentSettings {
    pub vercel_url: Option<String>,
    pub app_url: Option<String>,
}

/// The single issuer account allowed to sign in.
#[derive(Debug, Clone)]
pub struct IssuerSettings {
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

/// Everything as read, before validation.
#[derive(Debug, Deserialize, Validate)]
struct RawSettings {
    #[validate(nested)]
    server: ServerSettings,
    #[serde(default)]
    company: CompanyProfile,

    node_env: Option<String>,

    #[validate(
        required(message = "NOTION_API_KEY is not set"),
        length(min = 1, message = "NOTION_API_KEY is empty")
    )]
    notion_api_key: Option<String>,

    #[validate(
        required(message = "NOTION_DATABASE_ID is not set"),
        length(min = 1, message = "NOTION_DATABASE_ID is empty")
    )]
    notion_database_id: Option<String>,

    #[validate(url(message = "NOTION_API_URL must be a valid URL"))]
    notion_api_url: Option<String>,

    vercel_url: Option<String>,

    #[validate(url(message = "NEXT_PUBLIC_APP_URL must be a valid URL"))]
    next_public_app_url: Option<String>,

    #[validate(email(message = "ISSUER_EMAIL must be a valid email address"))]
    issuer_email: Option<String>,

    issuer_password: Option<String>,

    otel_exporter_otlp_endpoint: Option<String>,

    log_level: Option<String>,
}

impl RawSettings {
    fn into_settings(self) -> Result<Settings, ConfigurationError> {
        let environment = match non_empty(self.node_env) {
            Some(value) => value.parse()?,
            None => AppEnvironment::default(),
        };

        let issuer = match (non_empty(self.issuer_email), non_empty(self.issuer_password)) {
            (Some(email), Some(password)) => Some(IssuerSettings {
                email,
                password: Secret::new(password),
            }),
            (None, None) => None,
            _ => return Err(ConfigurationError::IncompleteIssuer),
        };

        Ok(Settings {
            environment,
            server: self.server,
            notion: NotionSettings {
                // Presence and non-emptiness were checked by `validate`.
                api_key: Secret::new(self.notion_api_key.unwrap_or_default()),
                database_id: self.notion_database_id.unwrap_or_default(),
                api_url: non_empty(self.notion_api_url)
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_NOTION_API_URL.to_string()),
            },
            deployment: DeploymentSettings {
                vercel_url: non_empty(self.vercel_url),
                app_url: self.next_public_app_url,
            },
            company: self.company,
            issuer,
            telemetry: TelemetrySettings {
                log_level: non_empty(self.log_level).unwrap_or_else(|| "info".to_string()),
                otlp_endpoint: non_empty(self.otel_exporter_otlp_endpoint),
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// Build settings from a base source (usually `base.yaml`) and an
    /// environment snapshot.
    ///
    /// `APP_SERVER__PORT`-style variables override nested keys; the flat
    /// variables in `ENVIRONMENT_VARIABLES` fill the top-level ones.
    pub fn load<S>(base: S, env: &HashMap<String, String>) -> Result<Self, ConfigurationError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut builder = config::Config::builder().add_source(base).add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(
                    env.iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )),
        );

        for name in ENVIRONMENT_VARIABLES {
            builder = builder.set_override_option(name.to_lowercase(), env.get(name).cloned())?;
        }

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        raw.validate()?;
        raw.into_settings()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Anchor a relative static directory at `crate_dir`.
    pub fn resolve_static_dir(&mut self, crate_dir: &Path) {
        if self.server.static_dir.is_relative() {
            self.server.static_dir = crate_dir.join(&self.server.static_dir);
        }
    }

    /// Absolute base URL used for share links.
    pub fn public_base_url(&self) -> String {
        if let Some(url) = &self.deployment.app_url {
            return url.trim_end_matches('/').to_string();
        }
        if let Some(host) = &self.deployment.vercel_url {
            return format!("https://{}", host.trim_end_matches('/'));
        }
        format!("http://{}", self.address())
    }
}

pub fn get_configuration() -> Result<Settings, ConfigurationError> {
    let base_path = std::env::current_dir()?;

    // Run either from the workspace root or from inside the crate directory.
    let crate_directory: PathBuf = if base_path.ends_with("invoice-web") {
        base_path
    } else {
        base_path.join("invoice-web")
    };
    let configuration_file = crate_directory.join("config").join("base.yaml");

    let env: HashMap<String, String> = std::env::vars().collect();

    let mut settings = Settings::load(config::File::from(configuration_file).required(true), &env)?;
    settings.resolve_static_dir(&crate_directory);
    Ok(settings)
}
