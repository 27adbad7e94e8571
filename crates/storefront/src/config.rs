//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `APP_ENV` - `production`, `development` or `test` (default: production)
//! - `STOREFRONT_STORE_TIMEOUT_MS` - Bound on every database call (default: 3000)
//! - `STOREFRONT_ALLOW_UNSAVED_ORDERS` - Return unsaved orders when the database
//!   cannot take them (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Port used by transaction-mode connection poolers.
const POOLER_PORT: &str = "6543";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    #[default]
    Production,
    Development,
    Test,
}

impl AppEnvironment {
    /// Whether issued passcodes may be returned to API callers.
    #[must_use]
    pub const fn exposes_passcodes(self) -> bool {
        !matches!(self, Self::Production)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => Err(format!(
                "expected production, development or test (got {other})"
            )),
        }
    }
}

/// Storefront application configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment
    pub environment: AppEnvironment,
    /// Bound on every primary store call
    pub store_timeout: Duration,
    /// Whether unsaved (synthetic) orders may be returned
    pub allow_unsaved_orders: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("store_timeout", &self.store_timeout)
            .field("allow_unsaved_orders", &self.allow_unsaved_orders)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .field("sentry_sample_rate", &self.sentry_sample_rate)
            .field("sentry_traces_sample_rate", &self.sentry_traces_sample_rate)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        validate_database_url(database_url.expose_secret())?;

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let environment = parse_env("APP_ENV", "production")?;
        let store_timeout = Duration::from_millis(parse_env("STOREFRONT_STORE_TIMEOUT_MS", "3000")?);
        let allow_unsaved_orders = parse_env("STOREFRONT_ALLOW_UNSAVED_ORDERS", "true")?;

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            store_timeout,
            allow_unsaved_orders,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Check that a database URL is a direct `PostgreSQL` connection string.
///
/// Hosted projects hand out both a REST URL and a database URL; only the
/// latter works here, and only against the `db.` host. A pooler port is
/// accepted with a warning.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDatabaseUrl` describing the problem.
pub fn validate_database_url(url: &str) -> Result<(), ConfigError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        return Err(ConfigError::InvalidDatabaseUrl(
            "got an HTTP API URL, expected postgresql://".to_string(),
        ));
    }

    let Some(rest) = url
        .strip_prefix("postgresql://")
        .or_else(|| url.strip_prefix("postgres://"))
    else {
        return Err(ConfigError::InvalidDatabaseUrl(
            "must start with postgres:// or postgresql://".to_string(),
        ));
    };

    // Credentials may contain '@'; the host follows the last one.
    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    };

    if host.is_empty() {
        return Err(ConfigError::InvalidDatabaseUrl("missing host".to_string()));
    }

    if host.ends_with(".supabase.co") && !host.starts_with("db.") {
        return Err(ConfigError::InvalidDatabaseUrl(format!(
            "host {host} is not a database host, expected db.<project>.supabase.co"
        )));
    }

    if port == Some(POOLER_PORT) {
        tracing::warn!(
            host,
            "database URL uses pooler port {POOLER_PORT}; prefer the direct port 5432"
        );
    }

    Ok(())
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, using `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
