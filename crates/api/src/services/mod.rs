//! Business logic services.
//!
//! - `auth` - registration, login, profile and account lifecycle
//! - `identity` - external identity providers for federated login
//! - `addresses` - address sanitization and CRUD
//! - `cards` - card numbering and address association

pub mod addresses;
pub mod auth;
pub mod cards;
pub mod identity;
