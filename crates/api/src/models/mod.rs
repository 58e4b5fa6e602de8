//! Domain models.
//!
//! These types represent validated domain objects separate from database row
//! types and from the JSON request/response shapes in [`crate::routes`].

pub mod address;
pub mod card;
pub mod session;
pub mod user;

pub use address::Address;
pub use card::Card;
pub use session::{CurrentUser, keys as session_keys};
pub use user::{Comment, PublicUser, User};
