//! Address repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use entrega_core::{AddressId, UserId, Visited};

use super::RepositoryError;
use crate::models::Address;

/// Fields for inserting a new address (already sanitized by the service).
#[derive(Debug)]
pub struct NewAddressRecord<'a> {
    pub street: &'a str,
    pub number: &'a str,
    pub neighborhood: &'a str,
    pub city: &'a str,
    pub gps: Option<&'a str>,
    pub complement: Option<&'a str>,
    pub user_id: UserId,
    pub active: bool,
    pub confirmed: bool,
    pub visited: Option<Visited>,
}

/// Sanitized search filter. Exact match on city/neighborhood, partial match on
/// street.
#[derive(Debug, Default)]
pub struct AddressSearch {
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub limit: i64,
    pub skip: i64,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    street: String,
    number: String,
    neighborhood: String,
    city: String,
    gps: Option<String>,
    complement: Option<String>,
    user_id: UserId,
    active: bool,
    confirmed: bool,
    visited: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, RepositoryError> {
        let visited = row
            .visited
            .as_deref()
            .map(Visited::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid visited value: {e}")))?;

        Ok(Self {
            id: row.id,
            street: row.street,
            number: row.number,
            neighborhood: row.neighborhood,
            city: row.city,
            gps: row.gps,
            complement: row.complement,
            user_id: row.user_id,
            active: row.active,
            confirmed: row.confirmed,
            visited,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ADDRESS_COLUMNS: &str = "id, street, number, neighborhood, city, gps, complement, \
                               user_id, active, confirmed, visited, created_at, updated_at";

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an address by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Address::try_from).transpose()
    }

    /// Search addresses by sanitized filter fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, filter: &AddressSearch) -> Result<Vec<Address>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE TRUE"));

        if let Some(city) = &filter.city {
            builder.push(" AND city = ").push_bind(city);
        }
        if let Some(neighborhood) = &filter.neighborhood {
            builder.push(" AND neighborhood = ").push_bind(neighborhood);
        }
        if let Some(street) = &filter.street {
            builder
                .push(" AND street LIKE '%' || ")
                .push_bind(street)
                .push(" || '%'");
        }

        builder
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let rows: Vec<AddressRow> = builder.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(Address::try_from).collect()
    }

    /// Insert a new address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an address with the same street,
    /// number and city already exists.
    pub async fn create(&self, record: &NewAddressRecord<'_>) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "INSERT INTO addresses \
                 (street, number, neighborhood, city, gps, complement, \
                  user_id, active, confirmed, visited) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(record.street)
        .bind(record.number)
        .bind(record.neighborhood)
        .bind(record.city)
        .bind(record.gps)
        .bind(record.complement)
        .bind(record.user_id)
        .bind(record.active)
        .bind(record.confirmed)
        .bind(record.visited.map(|v| v.as_str()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("address already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Address::try_from(row)
    }

    /// Replace an address's mutable fields with the given, already-merged
    /// values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new street/number/city
    /// combination collides with another address.
    pub async fn replace(&self, address: &Address) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "UPDATE addresses \
             SET street = $2, number = $3, neighborhood = $4, city = $5, gps = $6, \
                 complement = $7, active = $8, confirmed = $9, visited = $10, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(address.id)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.neighborhood)
        .bind(&address.city)
        .bind(address.gps.as_deref())
        .bind(address.complement.as_deref())
        .bind(address.active)
        .bind(address.confirmed)
        .bind(address.visited.map(|v| v.as_str()))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("address already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?
        .ok_or(RepositoryError::NotFound)?;

        Address::try_from(row)
    }

    /// Delete an address.
    ///
    /// # Returns
    ///
    /// Returns `true` if the address was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: AddressId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
