//! Card service: numbering allocation, address association, lifecycle.
//!
//! Two invariants hold across the whole `cards` table:
//!
//! - every `number` is unique, and newly created cards take the smallest
//!   unused positive number (holes left by deletions are refilled)
//! - an address id is referenced by at most one card at a time
//!
//! Both are checked against a snapshot of the table taken inside a write
//! transaction that holds the card-write advisory lock, so a concurrent
//! create cannot allocate the same number or claim the same address between
//! the check and the insert.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use entrega_core::{AddressId, CardId, CardNumber, UserId};

use crate::db::RepositoryError;
use crate::db::cards::CardRepository;
use crate::models::Card;

/// Default page size for card listings.
const DEFAULT_LIST_LIMIT: i64 = 50;
/// Hard cap on card listing page size.
const MAX_LIST_LIMIT: i64 = 100;

/// Errors from card operations.
#[derive(Debug, Error)]
pub enum CardError {
    /// One or more candidate addresses already belong to another card.
    #[error(
        "addresses already associated with another card: {}",
        join_ids(.addresses)
    )]
    Conflict {
        /// The offending address ids, sorted and deduplicated.
        addresses: Vec<AddressId>,
    },

    /// Card not found.
    #[error("card not found")]
    NotFound,

    /// Invalid request.
    #[error("{0}")]
    Validation(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Requested changes for a card update.
///
/// `street` is required: an update without an address list is rejected rather
/// than deleting the card (the delete operation exists for that). A `None`
/// `user_id` clears ownership.
#[derive(Debug, Default)]
pub struct CardUpdate {
    pub street: Option<Vec<AddressId>>,
    pub user_id: Option<UserId>,
}

/// Card service.
pub struct CardService<'a> {
    cards: CardRepository<'a>,
}

impl<'a> CardService<'a> {
    /// Create a new card service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            cards: CardRepository::new(pool),
        }
    }

    /// Get a card by ID.
    ///
    /// # Errors
    ///
    /// Returns `CardError::NotFound` if no such card exists.
    pub async fn get(&self, id: CardId) -> Result<Card, CardError> {
        self.cards.get(id).await?.ok_or(CardError::NotFound)
    }

    /// List cards ordered by number. `limit` defaults to 50 and is capped at
    /// 100; `skip` defaults to 0.
    ///
    /// # Errors
    ///
    /// Returns `CardError::Repository` if the query fails.
    pub async fn list(
        &self,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Card>, CardError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let skip = skip.unwrap_or(0).max(0);
        Ok(self.cards.list(limit, skip).await?)
    }

    /// Create a card covering `street`, with a freshly allocated number.
    ///
    /// An owned card starts its holding period now; an unowned card is
    /// created already "returned" (`end_date` set).
    ///
    /// # Errors
    ///
    /// Returns `CardError::Validation` if `street` is empty and
    /// `CardError::Conflict` if any address already belongs to another card.
    pub async fn create(
        &self,
        street: Vec<AddressId>,
        user_id: Option<UserId>,
    ) -> Result<Card, CardError> {
        if street.is_empty() {
            return Err(CardError::Validation(
                "a card requires at least one address".to_owned(),
            ));
        }
        let street = dedup_preserving_order(street);

        let mut tx = self.cards.begin().await?;
        CardRepository::lock_writes(&mut *tx).await?;
        let existing = CardRepository::fetch_all(&mut *tx).await?;

        let conflicts = conflicting_addresses(&street, None, &existing);
        if !conflicts.is_empty() {
            return Err(CardError::Conflict {
                addresses: conflicts,
            });
        }

        let numbers: Vec<CardNumber> = existing.iter().map(|c| c.number).collect();
        let number = CardNumber::first_available(&numbers);

        let now = Utc::now();
        let (start_date, end_date) = holding_period(user_id.is_some(), now);
        let card =
            CardRepository::insert(&mut *tx, &street, user_id, number, start_date, end_date)
                .await?;
        CardRepository::sync_holder(&mut *tx, card.id, None, user_id).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(card)
    }

    /// Update a card's address list and ownership.
    ///
    /// If the candidate list intersects the card's current list, the new
    /// addresses are merged in on top of the current ones; a fully disjoint
    /// candidate list replaces the current list. Ownership is applied on
    /// every update: a present `user_id` starts a holding period
    /// (`start_date` now, `end_date` cleared), an absent one ends it.
    ///
    /// # Errors
    ///
    /// Returns `CardError::Validation` if no address list was supplied,
    /// `CardError::NotFound` if the card doesn't exist, and
    /// `CardError::Conflict` if any candidate address belongs to a different
    /// card.
    pub async fn update(&self, id: CardId, update: CardUpdate) -> Result<Card, CardError> {
        let Some(street) = update.street else {
            return Err(CardError::Validation(
                "an update requires an address list; use the delete action to remove a card"
                    .to_owned(),
            ));
        };
        let street = dedup_preserving_order(street);

        let mut tx = self.cards.begin().await?;
        CardRepository::lock_writes(&mut *tx).await?;
        let existing = CardRepository::fetch_all(&mut *tx).await?;

        let current = existing
            .iter()
            .find(|c| c.id == id)
            .ok_or(CardError::NotFound)?;
        let previous_holder = current.user_id;

        let conflicts = conflicting_addresses(&street, Some(id), &existing);
        if !conflicts.is_empty() {
            return Err(CardError::Conflict {
                addresses: conflicts,
            });
        }

        let street = if intersects(&current.street, &street) {
            merge_addresses(&current.street, &street)
        } else {
            street
        };

        let now = Utc::now();
        let (start_date, end_date) = holding_period(update.user_id.is_some(), now);
        let card =
            CardRepository::update(&mut *tx, id, &street, update.user_id, start_date, end_date)
                .await?;
        CardRepository::sync_holder(&mut *tx, id, previous_holder, update.user_id).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(card)
    }

    /// Delete a card.
    ///
    /// # Errors
    ///
    /// Returns `CardError::NotFound` if no such card exists.
    pub async fn delete(&self, id: CardId) -> Result<(), CardError> {
        if self.cards.delete(id).await? {
            Ok(())
        } else {
            Err(CardError::NotFound)
        }
    }
}

/// Address ids in `candidate` that already belong to a card other than
/// `exclude`, sorted and deduplicated.
fn conflicting_addresses(
    candidate: &[AddressId],
    exclude: Option<CardId>,
    cards: &[Card],
) -> Vec<AddressId> {
    let mut conflicts: Vec<AddressId> = cards
        .iter()
        .filter(|card| Some(card.id) != exclude)
        .flat_map(|card| card.street.iter().copied())
        .filter(|id| candidate.contains(id))
        .collect();
    conflicts.sort_unstable();
    conflicts.dedup();
    conflicts
}

/// Current addresses, followed by candidate addresses not already present.
fn merge_addresses(current: &[AddressId], candidate: &[AddressId]) -> Vec<AddressId> {
    let mut merged = current.to_vec();
    for id in candidate {
        if !merged.contains(id) {
            merged.push(*id);
        }
    }
    merged
}

/// Whether two address lists share any id.
fn intersects(a: &[AddressId], b: &[AddressId]) -> bool {
    a.iter().any(|id| b.contains(id))
}

/// `(start_date, end_date)` for a card that is owned or not as of `now`.
const fn holding_period(
    owned: bool,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    if owned { (Some(now), None) } else { (None, Some(now)) }
}

/// Remove duplicate ids, keeping first occurrences.
fn dedup_preserving_order(ids: Vec<AddressId>) -> Vec<AddressId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

fn join_ids(ids: &[AddressId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address_ids(ids: &[i32]) -> Vec<AddressId> {
        ids.iter().map(|&id| AddressId::new(id)).collect()
    }

    fn card(id: i32, number: i32, street: &[i32]) -> Card {
        let now = Utc::now();
        Card {
            id: CardId::new(id),
            street: address_ids(street),
            user_id: None,
            number: CardNumber::new(number).expect("positive number"),
            start_date: None,
            end_date: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_disjoint_candidate_has_no_conflicts() {
        let cards = vec![card(1, 1, &[1, 2]), card(2, 2, &[3, 4])];
        assert!(conflicting_addresses(&address_ids(&[5, 6]), None, &cards).is_empty());
    }

    #[test]
    fn test_conflicts_name_exactly_the_overlapping_ids() {
        let cards = vec![card(1, 1, &[1, 2]), card(2, 2, &[3, 4])];
        assert_eq!(
            conflicting_addresses(&address_ids(&[2, 3, 5]), None, &cards),
            address_ids(&[2, 3])
        );
    }

    #[test]
    fn test_target_card_is_excluded_from_conflicts() {
        let cards = vec![card(1, 1, &[1, 2]), card(2, 2, &[3, 4])];
        assert!(
            conflicting_addresses(&address_ids(&[1, 2]), Some(CardId::new(1)), &cards)
                .is_empty()
        );
        assert_eq!(
            conflicting_addresses(&address_ids(&[1, 3]), Some(CardId::new(1)), &cards),
            address_ids(&[3])
        );
    }

    #[test]
    fn test_conflicts_are_sorted_and_deduplicated() {
        let cards = vec![card(1, 1, &[9, 2]), card(2, 2, &[2])];
        assert_eq!(
            conflicting_addresses(&address_ids(&[9, 2]), None, &cards),
            address_ids(&[2, 9])
        );
    }

    #[test]
    fn test_merge_keeps_current_and_appends_new() {
        assert_eq!(
            merge_addresses(&address_ids(&[1, 2]), &address_ids(&[2, 3])),
            address_ids(&[1, 2, 3])
        );
    }

    #[test]
    fn test_merge_with_subset_is_identity() {
        assert_eq!(
            merge_addresses(&address_ids(&[1, 2, 3]), &address_ids(&[2])),
            address_ids(&[1, 2, 3])
        );
    }

    #[test]
    fn test_intersects() {
        assert!(intersects(&address_ids(&[1, 2]), &address_ids(&[2, 9])));
        assert!(!intersects(&address_ids(&[1, 2]), &address_ids(&[3])));
        assert!(!intersects(&address_ids(&[]), &address_ids(&[1])));
    }

    #[test]
    fn test_holding_period_toggle() {
        let now = Utc::now();
        assert_eq!(holding_period(true, now), (Some(now), None));
        assert_eq!(holding_period(false, now), (None, Some(now)));
    }

    #[test]
    fn test_dedup_preserving_order() {
        assert_eq!(
            dedup_preserving_order(address_ids(&[3, 1, 3, 2, 1])),
            address_ids(&[3, 1, 2])
        );
    }

    #[test]
    fn test_conflict_error_message_lists_ids() {
        let err = CardError::Conflict {
            addresses: address_ids(&[4, 7]),
        };
        assert_eq!(
            err.to_string(),
            "addresses already associated with another card: 4, 7"
        );
    }
}
