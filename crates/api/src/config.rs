use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Outbound mail settings. Present only when `SMTP_HOST` is set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL connection URL. Without it the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    /// HS256 secret for bearer tokens.
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    /// Channel capacity of the live relay.
    pub relay_capacity: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    /// Allowed CORS origin and base for links in emails.
    pub frontend_url: String,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                port: parse(&lookup, "SMTP_PORT", 587)?,
                user: var("SMTP_USER"),
                password: var("SMTP_PASSWORD"),
                from: or("MAIL_FROM", "NoteHub <noreply@notehub.local>"),
                host,
            }),
            None => None,
        };

        Ok(Self {
            host: or("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 5000)?,
            database_url: var("DATABASE_URL"),
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 20)?,
            db_min_connections: parse(&lookup, "DB_MIN_CONNECTIONS", 5)?,
            jwt_secret: or("JWT_SECRET", "dev-secret-change-me-in-production"),
            jwt_issuer: var("JWT_ISSUER"),
            relay_capacity: parse(&lookup, "RELAY_CAPACITY", 1024)?,
            log_level: or("LOG_LEVEL", "info"),
            frontend_url: or("FRONTEND_URL", "http://localhost:3000"),
            smtp,
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key).filter(|value| !value.trim().is_empty()) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
