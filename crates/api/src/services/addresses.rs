//! Address service: sanitization, validation, ownership checks.
//!
//! Text fields are trimmed and lowercased before they are validated or
//! stored, so lookups and the street/number/city uniqueness constraint are
//! case-insensitive in practice. The optional `complement` keeps its original
//! case and only passes through a sensitive-term redaction filter at write
//! time.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use entrega_core::{AddressId, GpsCoord, Visited};

use crate::db::RepositoryError;
use crate::db::addresses::{AddressRepository, AddressSearch, NewAddressRecord};
use crate::models::{Address, CurrentUser};

/// Default page size for address searches.
const DEFAULT_SEARCH_LIMIT: i64 = 50;
/// Hard cap on address search page size.
const MAX_SEARCH_LIMIT: i64 = 100;
/// Maximum complement length, matching the database column.
const MAX_COMPLEMENT_LENGTH: usize = 250;

/// Demographic terms removed from complements before storage.
const SENSITIVE_TERMS: &[&str] = &[
    "homem",
    "homens",
    "hombre",
    "hombres",
    "mulher",
    "mulheres",
    "mujer",
    "mujeres",
    "criança",
    "jovem",
    "niño",
    "niña",
    "muchacho",
    "muchacha",
    "peru",
    "peruano",
    "peruana",
    "argentino",
    "argentina",
    "chileno",
    "chilena",
    "uruguaio",
    "uruguaia",
    "uruguayo",
    "uruguaya",
    "paraguaio",
    "paraguaia",
    "paraguayo",
    "paraguaya",
    "venezuelano",
    "venezuelana",
    "boliviano",
    "boliviana",
    "cubano",
    "cubana",
    "equadoriano",
    "equadoriana",
    "colombiano",
    "colombiana",
];

/// What redacted terms are replaced with.
const REDACTION_MASK: &str = "******";

static SENSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = SENSITIVE_TERMS.join("|");
    #[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid sensitive-term pattern")
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
    Regex::new(r"^\d+[a-zA-Z]?$").expect("valid number pattern")
});

/// Errors from address operations.
#[derive(Debug, Error)]
pub enum AddressError {
    /// Invalid or missing input field.
    #[error("{0}")]
    Validation(String),

    /// An address with the same street, number and city already exists.
    #[error("address already exists")]
    Duplicate,

    /// Actor is not the owner and not an admin.
    #[error("you do not have permission to modify this address")]
    Forbidden,

    /// Address not found.
    #[error("address not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Input for creating an address.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddressInput {
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub neighborhood: Option<String>,
    pub city: String,
    #[serde(default)]
    pub gps: Option<String>,
    #[serde(default)]
    pub complement: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub visited: Option<Visited>,
}

/// Input for updating an address. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAddressInput {
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub gps: Option<String>,
    pub complement: Option<String>,
    pub active: Option<bool>,
    pub confirmed: Option<bool>,
    pub visited: Option<Visited>,
}

/// Search filter for addresses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressFilterInput {
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

/// Address service.
pub struct AddressService<'a> {
    addresses: AddressRepository<'a>,
}

impl<'a> AddressService<'a> {
    /// Create a new address service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            addresses: AddressRepository::new(pool),
        }
    }

    /// Get an address by ID.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::NotFound` if no such address exists.
    pub async fn get(&self, id: AddressId) -> Result<Address, AddressError> {
        self.addresses.get(id).await?.ok_or(AddressError::NotFound)
    }

    /// Search addresses. Filter fields are sanitized the same way stored
    /// fields were; street matches partially, city and neighborhood exactly.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Validation` if a filter field contains
    /// disallowed characters.
    pub async fn search(
        &self,
        filter: AddressFilterInput,
    ) -> Result<Vec<Address>, AddressError> {
        let search = AddressSearch {
            street: sanitize_filter_field("street", filter.street)?,
            neighborhood: sanitize_filter_field("neighborhood", filter.neighborhood)?,
            city: sanitize_filter_field("city", filter.city)?,
            limit: filter
                .limit
                .unwrap_or(DEFAULT_SEARCH_LIMIT)
                .clamp(1, MAX_SEARCH_LIMIT),
            skip: filter.skip.unwrap_or(0).max(0),
        };

        Ok(self.addresses.search(&search).await?)
    }

    /// Create an address owned by `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Validation` for missing or malformed fields and
    /// `AddressError::Duplicate` if the street/number/city triple exists.
    pub async fn create(
        &self,
        actor: &CurrentUser,
        input: NewAddressInput,
    ) -> Result<Address, AddressError> {
        let street = require_clean_field("street", &input.street)?;
        let number = sanitize(&input.number);
        if !NUMBER_RE.is_match(&number) {
            return Err(AddressError::Validation(
                "number must be digits optionally followed by one letter".to_owned(),
            ));
        }
        let city = require_clean_field("city", &input.city)?;

        let neighborhood = match input.neighborhood.as_deref() {
            Some(value) if !sanitize(value).is_empty() => {
                require_clean_field("neighborhood", value)?
            }
            _ => String::new(),
        };

        let gps = validate_gps(input.gps.as_deref())?;
        let complement = input
            .complement
            .as_deref()
            .map(prepare_complement)
            .transpose()?;

        let record = NewAddressRecord {
            street: &street,
            number: &number,
            neighborhood: &neighborhood,
            city: &city,
            gps: gps.as_deref(),
            complement: complement.as_deref(),
            user_id: actor.id,
            active: input.active,
            confirmed: input.confirmed,
            visited: input.visited,
        };

        self.addresses.create(&record).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AddressError::Duplicate,
            other => AddressError::Repository(other),
        })
    }

    /// Update an address. Only the owner or an admin may do so.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Forbidden` for other actors,
    /// `AddressError::NotFound` if the address doesn't exist, and the same
    /// validation errors as [`Self::create`] for changed fields.
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: AddressId,
        update: UpdateAddressInput,
    ) -> Result<Address, AddressError> {
        let mut address = self.get(id).await?;
        authorize(actor, &address)?;

        if let Some(street) = update.street.as_deref() {
            address.street = require_clean_field("street", street)?;
        }
        if let Some(number) = update.number.as_deref() {
            let number = sanitize(number);
            if !NUMBER_RE.is_match(&number) {
                return Err(AddressError::Validation(
                    "number must be digits optionally followed by one letter".to_owned(),
                ));
            }
            address.number = number;
        }
        if let Some(neighborhood) = update.neighborhood.as_deref() {
            address.neighborhood = require_clean_field("neighborhood", neighborhood)?;
        }
        if let Some(city) = update.city.as_deref() {
            address.city = require_clean_field("city", city)?;
        }
        if update.gps.is_some() {
            address.gps = validate_gps(update.gps.as_deref())?;
        }
        if let Some(complement) = update.complement.as_deref() {
            address.complement = Some(prepare_complement(complement)?);
        }
        if let Some(active) = update.active {
            address.active = active;
        }
        if let Some(confirmed) = update.confirmed {
            address.confirmed = confirmed;
        }
        if let Some(visited) = update.visited {
            address.visited = Some(visited);
        }

        self.addresses.replace(&address).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AddressError::Duplicate,
            RepositoryError::NotFound => AddressError::NotFound,
            other => AddressError::Repository(other),
        })
    }

    /// Delete an address. Only the owner or an admin may do so.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Forbidden` for other actors and
    /// `AddressError::NotFound` if the address doesn't exist.
    pub async fn delete(&self, actor: &CurrentUser, id: AddressId) -> Result<(), AddressError> {
        let address = self.get(id).await?;
        authorize(actor, &address)?;

        if self.addresses.delete(id).await? {
            Ok(())
        } else {
            Err(AddressError::NotFound)
        }
    }
}

/// Owner-or-admin check.
fn authorize(actor: &CurrentUser, address: &Address) -> Result<(), AddressError> {
    if actor.is_admin || actor.id == address.user_id {
        Ok(())
    } else {
        Err(AddressError::Forbidden)
    }
}

/// Trim and lowercase.
fn sanitize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Letters (including accented), digits and spaces only.
fn is_clean_text(value: &str) -> bool {
    value.chars().all(|c| c.is_alphanumeric() || c == ' ')
}

/// Sanitize a required text field and check its character set.
fn require_clean_field(field: &str, value: &str) -> Result<String, AddressError> {
    let value = sanitize(value);
    if value.is_empty() {
        return Err(AddressError::Validation(format!("{field} is required")));
    }
    if !is_clean_text(&value) {
        return Err(AddressError::Validation(format!(
            "{field} contains invalid characters"
        )));
    }
    Ok(value)
}

/// Sanitize an optional filter field; empty values become `None`.
fn sanitize_filter_field(
    field: &str,
    value: Option<String>,
) -> Result<Option<String>, AddressError> {
    match value {
        Some(value) => {
            let value = sanitize(&value);
            if value.is_empty() {
                return Ok(None);
            }
            if !is_clean_text(&value) {
                return Err(AddressError::Validation(format!(
                    "{field} contains invalid characters"
                )));
            }
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Validate an optional GPS string, normalizing empty to `None`.
fn validate_gps(gps: Option<&str>) -> Result<Option<String>, AddressError> {
    match gps.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let coord = GpsCoord::parse(value)
                .map_err(|e| AddressError::Validation(e.to_string()))?;
            Ok(Some(coord.to_string()))
        }
    }
}

/// Trim, length-check and redact a complement. Unlike the lookup fields, the
/// complement keeps its original case.
fn prepare_complement(complement: &str) -> Result<String, AddressError> {
    let complement = complement.trim();
    if complement.chars().count() > MAX_COMPLEMENT_LENGTH {
        return Err(AddressError::Validation(format!(
            "complement must be at most {MAX_COMPLEMENT_LENGTH} characters"
        )));
    }
    Ok(redact_sensitive_terms(complement))
}

/// Replace every sensitive term with the redaction mask.
fn redact_sensitive_terms(text: &str) -> String {
    SENSITIVE_RE.replace_all(text, REDACTION_MASK).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  Rua das Flores "), "rua das flores");
    }

    #[test]
    fn test_is_clean_text_allows_accents() {
        assert!(is_clean_text("avenida são joão 12"));
        assert!(!is_clean_text("rua; drop table"));
        assert!(!is_clean_text("rua$"));
    }

    #[test]
    fn test_number_pattern() {
        assert!(NUMBER_RE.is_match("123"));
        assert!(NUMBER_RE.is_match("123b"));
        assert!(!NUMBER_RE.is_match("12 3"));
        assert!(!NUMBER_RE.is_match("abc"));
        assert!(!NUMBER_RE.is_match("12bc"));
    }

    #[test]
    fn test_redaction_masks_terms_case_insensitively() {
        assert_eq!(
            redact_sensitive_terms("procurar o Homem da casa azul"),
            "procurar o ****** da casa azul"
        );
        assert_eq!(
            redact_sensitive_terms("duas mulheres e um jovem"),
            "duas ****** e um ******"
        );
    }

    #[test]
    fn test_redaction_respects_word_boundaries() {
        // "perua" (station wagon) must not be caught by "peru"
        assert_eq!(redact_sensitive_terms("uma perua branca"), "uma perua branca");
    }

    #[test]
    fn test_redaction_leaves_clean_text_alone() {
        assert_eq!(
            redact_sensitive_terms("portão verde, tocar duas vezes"),
            "portão verde, tocar duas vezes"
        );
    }

    #[test]
    fn test_prepare_complement_keeps_case() {
        assert_eq!(
            prepare_complement("  Portão Azul, falar com o Homem  ").unwrap(),
            "Portão Azul, falar com o ******"
        );
    }

    #[test]
    fn test_prepare_complement_caps_length() {
        let long = "a".repeat(MAX_COMPLEMENT_LENGTH + 1);
        assert!(matches!(
            prepare_complement(&long),
            Err(AddressError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_gps() {
        assert_eq!(
            validate_gps(Some("-23.5505, -46.6333")).unwrap(),
            Some("-23.5505, -46.6333".to_owned())
        );
        assert_eq!(validate_gps(None).unwrap(), None);
        assert_eq!(validate_gps(Some("  ")).unwrap(), None);
        assert!(validate_gps(Some("91, 0")).is_err());
    }

    #[test]
    fn test_require_clean_field() {
        assert_eq!(require_clean_field("city", " Osasco ").unwrap(), "osasco");
        assert!(require_clean_field("city", "  ").is_err());
        assert!(require_clean_field("city", "x;y").is_err());
    }
}
