//! Process configuration from environment variables.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use exportdesk_observability::{LogFormat, UnknownLogFormat};

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const DEV_TOKEN_SECRET: &str = "dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid EXPORTDESK_BIND '{value}': {source}")]
    InvalidBind {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid TOKEN_TTL_SECS '{0}': expected a positive number of seconds")]
    InvalidTtl(String),

    #[error("invalid LOG_FORMAT: {0}")]
    LogFormat(#[from] UnknownLogFormat),
}

/// Where accounts and tokens are managed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthBackend {
    /// Hosted GoTrue-compatible service.
    Hosted { url: String, anon_key: String },
    /// Accounts kept by this process.
    InMemory,
}

/// First admin account created at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// `None` keeps records in memory.
    pub database_url: Option<String>,
    pub auth: AuthBackend,
    pub token_secret: String,
    pub token_ttl: Duration,
    pub log_format: LogFormat,
    pub seed_admin: Option<SeedAdmin>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_value = var("EXPORTDESK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_value
            .parse()
            .map_err(|source| ConfigError::InvalidBind {
                value: bind_value.clone(),
                source,
            })?;

        let auth = match (var("AUTH_URL"), var("AUTH_ANON_KEY")) {
            (Some(url), Some(anon_key)) if !is_placeholder(&url) && !is_placeholder(&anon_key) => {
                AuthBackend::Hosted { url, anon_key }
            }
            _ => AuthBackend::InMemory,
        };

        let token_ttl = match var("TOKEN_TTL_SECS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(secs) if secs > 0 => Duration::seconds(secs),
                _ => return Err(ConfigError::InvalidTtl(raw)),
            },
            None => Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        };

        let log_format = match var("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        let seed_admin = match (var("SEED_ADMIN_EMAIL"), var("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            bind,
            database_url: var("DATABASE_URL"),
            auth,
            token_secret: var("TOKEN_SECRET").unwrap_or_else(|| DEV_TOKEN_SECRET.to_string()),
            token_ttl,
            log_format,
            seed_admin,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.token_secret == DEV_TOKEN_SECRET
    }

    /// Startup warnings about insecure or in-memory fallbacks.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.database_url.is_none() {
            warnings.push("DATABASE_URL not set; records are kept in memory and lost on restart");
        }
        if self.auth == AuthBackend::InMemory {
            warnings.push("AUTH_URL/AUTH_ANON_KEY not configured; using in-process accounts");
            if self.uses_dev_secret() {
                warnings.push("TOKEN_SECRET not set; using insecure dev default");
            }
        }
        warnings
    }
}

/// Values copied from an env template (`your_project_url`) count as unset.
fn is_placeholder(value: &str) -> bool {
    value.starts_with("your_")
}
