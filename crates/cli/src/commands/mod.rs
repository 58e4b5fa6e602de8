//! CLI command implementations.

pub mod admin;
pub mod migrate;

use thiserror::Error;

/// Errors shared by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No user with the given email exists.
    #[error("No user found with email: {0}")]
    UserNotFound(String),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(String),
}

/// Load the database URL, preferring `ENTREGA_DATABASE_URL`.
pub(crate) fn database_url() -> Result<String, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("ENTREGA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("ENTREGA_DATABASE_URL"))
}
