//! Address route handlers.
//!
//! - `POST /api/query/address` - `get`, `search`
//! - `POST /api/mutation/address` - `create`, `update`, `delete`
//!
//! All address endpoints require a logged-in user.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use entrega_core::AddressId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Address;
use crate::services::addresses::{
    AddressFilterInput, AddressService, NewAddressInput, UpdateAddressInput,
};
use crate::state::AppState;

/// Address query actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AddressQueryRequest {
    /// Fetch a single address.
    Get { id: AddressId },
    /// Search addresses by street/neighborhood/city.
    Search {
        #[serde(flatten)]
        filter: AddressFilterInput,
    },
}

/// Address mutation actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AddressMutationRequest {
    Create {
        #[serde(flatten)]
        input: NewAddressInput,
    },
    Update {
        id: AddressId,
        #[serde(flatten)]
        input: UpdateAddressInput,
    },
    Delete {
        id: AddressId,
    },
}

/// Response envelope for address endpoints.
#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<Address>>,
}

impl AddressResponse {
    fn one(message: &str, address: Address) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
            address: Some(address),
            addresses: None,
        })
    }

    fn many(message: &str, addresses: Vec<Address>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
            address: None,
            addresses: Some(addresses),
        })
    }

    fn none(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
            address: None,
            addresses: None,
        })
    }
}

/// Handle `POST /api/query/address`.
///
/// # Errors
///
/// Returns `AppError::Address` for bad filters and missing addresses.
pub async fn query(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(request): Json<AddressQueryRequest>,
) -> Result<Json<AddressResponse>> {
    let addresses = AddressService::new(state.pool());

    match request {
        AddressQueryRequest::Get { id } => {
            let address = addresses.get(id).await?;
            Ok(AddressResponse::one("address found", address))
        }
        AddressQueryRequest::Search { filter } => {
            let found = addresses.search(filter).await?;
            Ok(AddressResponse::many("addresses found", found))
        }
    }
}

/// Handle `POST /api/mutation/address`.
///
/// # Errors
///
/// Returns `AppError::Address` for validation, permission and uniqueness
/// failures.
pub async fn mutation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<AddressMutationRequest>,
) -> Result<Json<AddressResponse>> {
    let addresses = AddressService::new(state.pool());

    match request {
        AddressMutationRequest::Create { input } => {
            let address = addresses.create(&user, input).await?;
            Ok(AddressResponse::one("address created", address))
        }
        AddressMutationRequest::Update { id, input } => {
            let address = addresses.update(&user, id, input).await?;
            Ok(AddressResponse::one("address updated", address))
        }
        AddressMutationRequest::Delete { id } => {
            addresses.delete(&user, id).await?;
            Ok(AddressResponse::none("address deleted"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_filter_flattens() {
        let request: AddressQueryRequest = serde_json::from_str(
            r#"{"action": "search", "city": "osasco", "limit": 10}"#,
        )
        .unwrap();
        let AddressQueryRequest::Search { filter } = request else {
            panic!("expected search");
        };
        assert_eq!(filter.city.as_deref(), Some("osasco"));
        assert_eq!(filter.limit, Some(10));
    }

    #[test]
    fn test_update_carries_id_and_fields() {
        let request: AddressMutationRequest = serde_json::from_str(
            r#"{"action": "update", "id": 4, "street": "rua nova", "active": false}"#,
        )
        .unwrap();
        let AddressMutationRequest::Update { id, input } = request else {
            panic!("expected update");
        };
        assert_eq!(id, AddressId::new(4));
        assert_eq!(input.street.as_deref(), Some("rua nova"));
        assert_eq!(input.active, Some(false));
        assert!(input.city.is_none());
    }
}
