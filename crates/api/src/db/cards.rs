//! Card repository for database operations.
//!
//! Card writes are guarded by invariants (unique number, disjoint address
//! sets) that span the whole table, so the write path runs inside a
//! transaction the service opens via [`CardRepository::begin`]. Every write
//! transaction first takes [`lock_writes`], a transaction-scoped advisory
//! lock, which serializes concurrent allocations and association checks.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use entrega_core::{AddressId, CardId, CardNumber, UserId};

use super::RepositoryError;
use crate::models::Card;

/// Advisory lock key for card writes (arbitrary but stable).
const CARD_WRITE_LOCK: i64 = 0xCA8D;

#[derive(sqlx::FromRow)]
struct CardRow {
    id: CardId,
    street: Vec<AddressId>,
    user_id: Option<UserId>,
    number: CardNumber,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CardRow> for Card {
    fn from(row: CardRow) -> Self {
        Self {
            id: row.id,
            street: row.street,
            user_id: row.user_id,
            number: row.number,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CARD_COLUMNS: &str =
    "id, street, user_id, number, start_date, end_date, created_at, updated_at";

/// Repository for card database operations.
pub struct CardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CardRepository<'a> {
    /// Create a new card repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a card by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CardId) -> Result<Option<Card>, RepositoryError> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Card::from))
    }

    /// List cards ordered by number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64, skip: i64) -> Result<Vec<Card>, RepositoryError> {
        let rows = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards ORDER BY number ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Card::from).collect())
    }

    /// Begin a write transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction cannot start.
    pub async fn begin(&self) -> Result<Transaction<'a, Postgres>, RepositoryError> {
        Ok(self.pool.begin().await?)
    }

    /// Take the card-write advisory lock for the current transaction.
    ///
    /// Released automatically at commit or rollback.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_writes(conn: &mut PgConnection) -> Result<(), RepositoryError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CARD_WRITE_LOCK)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Fetch every card inside a write transaction, for the association guard
    /// and the number allocator.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn fetch_all(conn: &mut PgConnection) -> Result<Vec<Card>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, CardRow>(&format!("SELECT {CARD_COLUMNS} FROM cards"))
                .fetch_all(conn)
                .await?;

        Ok(rows.into_iter().map(Card::from).collect())
    }

    /// Insert a new card inside a write transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the number is already taken
    /// (only possible if the caller skipped [`Self::lock_writes`]).
    pub async fn insert(
        conn: &mut PgConnection,
        street: &[AddressId],
        user_id: Option<UserId>,
        number: CardNumber,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Card, RepositoryError> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            "INSERT INTO cards (street, user_id, number, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {CARD_COLUMNS}"
        ))
        .bind(street)
        .bind(user_id)
        .bind(number)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!("card number {number} already taken"));
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    /// Replace a card's address list and ownership fields inside a write
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the card doesn't exist.
    pub async fn update(
        conn: &mut PgConnection,
        id: CardId,
        street: &[AddressId],
        user_id: Option<UserId>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Card, RepositoryError> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            "UPDATE cards \
             SET street = $2, user_id = $3, start_date = $4, end_date = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING {CARD_COLUMNS}"
        ))
        .bind(id)
        .bind(street)
        .bind(user_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Move a card between holders' `my_cards` lists inside a write
    /// transaction.
    ///
    /// The new holder also gets the card recorded in `my_total_cards`, which
    /// only ever grows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn sync_holder(
        conn: &mut PgConnection,
        card: CardId,
        previous: Option<UserId>,
        next: Option<UserId>,
    ) -> Result<(), RepositoryError> {
        if previous == next {
            return Ok(());
        }

        if let Some(user) = previous {
            sqlx::query(
                "UPDATE users SET my_cards = array_remove(my_cards, $2), updated_at = now() \
                 WHERE id = $1",
            )
            .bind(user)
            .bind(card)
            .execute(&mut *conn)
            .await?;
        }

        if let Some(user) = next {
            sqlx::query(
                "UPDATE users SET \
                    my_cards = array_append(array_remove(my_cards, $2), $2), \
                    my_total_cards = CASE WHEN $2 = ANY(my_total_cards) THEN my_total_cards \
                                          ELSE array_append(my_total_cards, $2) END, \
                    updated_at = now() \
                 WHERE id = $1",
            )
            .bind(user)
            .bind(card)
            .execute(conn)
            .await?;
        }

        Ok(())
    }

    /// Delete a card, removing it from its holder's `my_cards` list.
    ///
    /// The card stays in `my_total_cards`: that list records every card a
    /// user has ever held.
    ///
    /// # Returns
    ///
    /// Returns `true` if the card was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn delete(&self, id: CardId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Option<UserId>,)> =
            sqlx::query_as("DELETE FROM cards WHERE id = $1 RETURNING user_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((holder,)) = row else {
            return Ok(false);
        };

        if let Some(user) = holder {
            sqlx::query(
                "UPDATE users SET my_cards = array_remove(my_cards, $2), updated_at = now() \
                 WHERE id = $1",
            )
            .bind(user)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
