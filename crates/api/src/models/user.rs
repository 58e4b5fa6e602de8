//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use entrega_core::{CardId, CommentId, Email, UserId};

/// A registered user (domain type).
///
/// The password hash never leaves the repository layer except through
/// [`crate::db::users::UserRepository::get_password_hash`].
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique display name.
    pub name: String,
    /// Unique email address.
    pub email: Email,
    /// Profile picture URL.
    pub profile_picture: String,
    /// Administrator flag.
    pub is_admin: bool,
    /// Service-staff flag.
    pub is_ss: bool,
    /// Group label ("0" by default).
    pub group: String,
    /// Cards currently assigned to this user.
    pub my_cards: Vec<CardId>,
    /// Every card this user has ever held.
    pub my_total_cards: Vec<CardId>,
    /// Per-card comments left by this user.
    pub comments: Vec<Comment>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A comment a user left on a card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub card_id: CardId,
    /// Free text, capped at 250 characters at the database.
    pub text: String,
}

/// The client-facing projection of a [`User`].
///
/// Excludes the email and anything credential-related; this is the shape every
/// user-returning endpoint responds with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub name: String,
    pub profile_picture: String,
    pub is_admin: bool,
    #[serde(rename = "isSS")]
    pub is_ss: bool,
    pub group: String,
    pub my_cards: Vec<CardId>,
    pub my_total_cards: Vec<CardId>,
    pub comments: Vec<Comment>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            profile_picture: user.profile_picture,
            is_admin: user.is_admin,
            is_ss: user.is_ss,
            group: user.group,
            my_cards: user.my_cards,
            my_total_cards: user.my_total_cards,
            comments: user.comments,
        }
    }
}
