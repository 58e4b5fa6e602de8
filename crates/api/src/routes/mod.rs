//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Queries (POST body carries an `action` field)
//! POST /api/query/user         - get | login | logout
//! POST /api/query/address      - get | search
//! POST /api/query/card         - get | list
//!
//! # Mutations
//! POST /api/mutation/user      - create | update | delete | google
//! POST /api/mutation/address   - create | update | delete
//! POST /api/mutation/card      - create | update | delete
//! ```

pub mod addresses;
pub mod cards;
pub mod users;

use axum::{Router, routing::post};

use crate::state::AppState;

/// Create the `/api` router, without middleware layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/query/user", post(users::query))
        .route("/api/query/address", post(addresses::query))
        .route("/api/query/card", post(cards::query))
        .route("/api/mutation/user", post(users::mutation))
        .route("/api/mutation/address", post(addresses::mutation))
        .route("/api/mutation/card", post(cards::mutation))
}
