//! Card route handlers.
//!
//! - `POST /api/query/card` - `get`, `list`
//! - `POST /api/mutation/card` - `create`, `update`, `delete`
//!
//! All card endpoints require a logged-in user. Number allocation and the
//! address-association guard live in [`crate::services::cards`]; the handlers
//! only translate between the JSON envelope and the service.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use entrega_core::{AddressId, CardId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Card;
use crate::services::cards::{CardService, CardUpdate};
use crate::state::AppState;

/// Card query actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CardQueryRequest {
    /// Fetch a single card.
    Get { id: CardId },
    /// List cards ordered by number.
    List {
        limit: Option<i64>,
        skip: Option<i64>,
    },
}

/// Card mutation actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
#[serde(rename_all_fields = "camelCase")]
pub enum CardMutationRequest {
    Create {
        street: Vec<AddressId>,
        user_id: Option<UserId>,
    },
    Update {
        id: CardId,
        street: Option<Vec<AddressId>>,
        user_id: Option<UserId>,
    },
    Delete {
        id: CardId,
    },
}

/// Response envelope for card endpoints.
#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
}

impl CardResponse {
    fn one(message: &str, card: Card) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
            card: Some(card),
            cards: None,
        })
    }

    fn many(message: &str, cards: Vec<Card>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
            card: None,
            cards: Some(cards),
        })
    }

    fn none(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
            card: None,
            cards: None,
        })
    }
}

/// Handle `POST /api/query/card`.
///
/// # Errors
///
/// Returns `AppError::Card` if the card doesn't exist or the query fails.
pub async fn query(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(request): Json<CardQueryRequest>,
) -> Result<Json<CardResponse>> {
    let cards = CardService::new(state.pool());

    match request {
        CardQueryRequest::Get { id } => {
            let card = cards.get(id).await?;
            Ok(CardResponse::one("card found", card))
        }
        CardQueryRequest::List { limit, skip } => {
            let found = cards.list(limit, skip).await?;
            Ok(CardResponse::many("cards found", found))
        }
    }
}

/// Handle `POST /api/mutation/card`.
///
/// # Errors
///
/// Returns `AppError::Card` for validation failures, unknown cards, and
/// address-association conflicts.
pub async fn mutation(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(request): Json<CardMutationRequest>,
) -> Result<Json<CardResponse>> {
    let cards = CardService::new(state.pool());

    match request {
        CardMutationRequest::Create { street, user_id } => {
            let card = cards.create(street, user_id).await?;
            Ok(CardResponse::one("card created", card))
        }
        CardMutationRequest::Update {
            id,
            street,
            user_id,
        } => {
            let card = cards.update(id, CardUpdate { street, user_id }).await?;
            Ok(CardResponse::one("card updated", card))
        }
        CardMutationRequest::Delete { id } => {
            cards.delete(id).await?;
            Ok(CardResponse::none("card deleted"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_accepts_camel_case_user_id() {
        let request: CardMutationRequest = serde_json::from_str(
            r#"{"action": "create", "street": [1, 2, 3], "userId": 7}"#,
        )
        .unwrap();
        let CardMutationRequest::Create { street, user_id } = request else {
            panic!("expected create");
        };
        assert_eq!(street.len(), 3);
        assert_eq!(user_id, Some(UserId::new(7)));
    }

    #[test]
    fn test_update_without_user_id_clears_ownership() {
        let request: CardMutationRequest =
            serde_json::from_str(r#"{"action": "update", "id": 2, "street": [5]}"#).unwrap();
        let CardMutationRequest::Update { user_id, .. } = request else {
            panic!("expected update");
        };
        assert_eq!(user_id, None);
    }

    #[test]
    fn test_list_defaults_are_absent() {
        let request: CardQueryRequest = serde_json::from_str(r#"{"action": "list"}"#).unwrap();
        let CardQueryRequest::List { limit, skip } = request else {
            panic!("expected list");
        };
        assert_eq!(limit, None);
        assert_eq!(skip, None);
    }
}
