//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! entrega-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ENTREGA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection
//!   string
//!
//! Migration files live in `crates/api/migrations/`.

use sqlx::PgPool;

use super::{CommandError, database_url};

/// Run all pending database migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
