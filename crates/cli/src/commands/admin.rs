//! Administrator management commands.
//!
//! # Usage
//!
//! ```bash
//! # Promote an existing user to administrator
//! entrega-cli admin grant -e admin@example.com
//! ```
//!
//! There is no "create admin" path: accounts always register through the API
//! without admin rights and get promoted afterwards.

use sqlx::PgPool;

use entrega_api::db::RepositoryError;
use entrega_api::db::users::UserRepository;
use entrega_core::Email;

use super::{CommandError, database_url};

/// Grant administrator rights to the user with the given email.
///
/// # Errors
///
/// Returns `CommandError::UserNotFound` if no such user exists.
pub async fn grant(email: &str) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::InvalidEmail(e.to_string()))?;

    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    let users = UserRepository::new(&pool);
    match users.grant_admin(&email).await {
        Ok(()) => {
            tracing::info!("Granted admin rights to {}", email);
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(CommandError::UserNotFound(email.to_string())),
        Err(RepositoryError::Database(e)) => Err(CommandError::Database(e)),
        Err(other) => Err(CommandError::Repository(other.to_string())),
    }
}
