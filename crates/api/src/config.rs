//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ENTREGA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ENTREGA_BASE_URL` - Public URL for the API
//! - `ENTREGA_SESSION_SECRET` - Session signing secret (min 32 chars, no placeholders)
//!
//! ## Optional
//! - `ENTREGA_HOST` - Bind address (default: 127.0.0.1)
//! - `ENTREGA_PORT` - Listen port (default: 4000)
//! - `GOOGLE_CLIENT_ID` - OAuth client id for provider login (provider login
//!   is rejected when unset)
//! - `ENTREGA_DEFAULT_PROFILE_PICTURE` - Picture URL assigned to new users
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

/// Picture given to accounts that register without one.
const DEFAULT_PROFILE_PICTURE: &str = "https://static.entrega.app/profile/default-user.webp";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the API
    pub base_url: String,
    /// Session signing secret. tower-sessions doesn't take a key for its
    /// server-side store, so nothing consumes this yet; it is required and
    /// validated up front so that enabling signed/private cookies later is a
    /// config no-op for deployments.
    pub session_secret: SecretString,
    /// OAuth client id accepted for provider id tokens
    pub google_client_id: Option<String>,
    /// Profile picture URL assigned to new users
    pub default_profile_picture: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret fails validation (length, placeholder detection).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ENTREGA_DATABASE_URL")?;
        let host = get_env_or_default("ENTREGA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ENTREGA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ENTREGA_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ENTREGA_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("ENTREGA_BASE_URL")?;
        let session_secret = SecretString::from(get_required_env("ENTREGA_SESSION_SECRET")?);
        validate_session_secret(&session_secret, "ENTREGA_SESSION_SECRET")?;

        let google_client_id = get_optional_env("GOOGLE_CLIENT_ID");
        let default_profile_picture = get_env_or_default(
            "ENTREGA_DEFAULT_PROFILE_PICTURE",
            DEFAULT_PROFILE_PICTURE,
        );
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            google_client_id,
            default_profile_picture,
            sentry_dsn,
            sentry_environment,
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

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret is long enough and not a placeholder.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();

    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters"),
        ));
    }

    if let Some(pattern) = find_placeholder(value) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("looks like a placeholder ({pattern})"),
        ));
    }

    Ok(())
}

/// Returns the first placeholder pattern found in the value, if any.
fn find_placeholder(value: &str) -> Option<&'static str> {
    let lowered = value.to_lowercase();
    PLACEHOLDER_PATTERNS
        .iter()
        .find(|pattern| lowered.contains(**pattern))
        .copied()
}
