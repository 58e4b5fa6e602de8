//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use entrega_core::{CardId, CommentId, Email, UserId};

use super::RepositoryError;
use crate::models::user::{Comment, User};

/// Fields for inserting a new user.
#[derive(Debug)]
pub struct NewUserRecord<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub profile_picture: &'a str,
    pub is_ss: bool,
    pub group: &'a str,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: Email,
    profile_picture: String,
    is_admin: bool,
    is_ss: bool,
    group_name: String,
    my_cards: Vec<CardId>,
    my_total_cards: Vec<CardId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: CommentId,
    card_id: CardId,
    text: String,
}

const USER_COLUMNS: &str = "id, name, email, profile_picture, is_admin, is_ss, group_name, \
                            my_cards, my_total_cards, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID, including their comments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Whether a display name is already taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn name_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        Ok(exists.is_some())
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or name is already in
    /// use. Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUserRecord<'_>) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, password_hash, profile_picture, is_ss, group_name) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new_user.name)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.profile_picture)
        .bind(new_user.is_ss)
        .bind(new_user.group)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                let field = match db_err.constraint() {
                    Some("users_name_key") => "name",
                    _ => "email",
                };
                return RepositoryError::Conflict(format!("{field} already in use"));
            }
            RepositoryError::Database(e)
        })?;

        self.hydrate(row).await
    }

    /// Update a user's profile fields. `None` fields are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users \
             SET name = COALESCE($2, name), \
                 profile_picture = COALESCE($3, profile_picture), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(profile_picture)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("name already in use".to_owned());
            }
            RepositoryError::Database(e)
        })?
        .ok_or(RepositoryError::NotFound)?;

        self.hydrate(row).await
    }

    /// Mark a user as administrator.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn grant_admin(&self, email: &Email) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET is_admin = TRUE, updated_at = now() WHERE email = $1")
            .bind(email)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a user.
    ///
    /// # Returns
    ///
    /// Returns `true` if the user was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a user and their password hash by email.
    ///
    /// Returns `None` if no such user exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<(UserId, String)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(self.pool)
                .await?;

        let Some((id, password_hash)) = row else {
            return Ok(None);
        };

        let user = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        Ok(Some((user, password_hash)))
    }

    /// Attach comments to a user row.
    async fn hydrate(&self, row: UserRow) -> Result<User, RepositoryError> {
        let comments = sqlx::query_as::<_, CommentRow>(
            "SELECT id, card_id, text FROM user_comments WHERE user_id = $1 ORDER BY id ASC",
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|c| Comment {
            id: c.id,
            card_id: c.card_id,
            text: c.text,
        })
        .collect();

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            profile_picture: row.profile_picture,
            is_admin: row.is_admin,
            is_ss: row.is_ss,
            group: row.group_name,
            my_cards: row.my_cards,
            my_total_cards: row.my_total_cards,
            comments,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
