//! Address domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use entrega_core::{AddressId, UserId, Visited};

/// A physical location owned by a user.
///
/// Street, number, neighborhood and city are stored trimmed and lowercased;
/// the `complement` has already had sensitive terms redacted at write time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    /// Validated `latitude, longitude` string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    /// Owning user.
    pub user_id: UserId,
    pub active: bool,
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visited: Option<Visited>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
