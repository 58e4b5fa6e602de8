//! Card domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use entrega_core::{AddressId, CardId, CardNumber, UserId};

/// A numbered delivery card referencing a set of addresses.
///
/// Invariants (enforced by `crate::services::cards`):
/// - `number` is unique across all cards and allocated as the smallest unused
///   positive integer
/// - `street` never intersects the `street` of any other card
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    /// Address ids covered by this card.
    pub street: Vec<AddressId>,
    /// Current holder, if assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub number: CardNumber,
    /// Set when an owner is assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// Set when the card has no owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
