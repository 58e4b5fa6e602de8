//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::identity::IdentityError;

/// Errors that can occur during authentication and account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] entrega_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// The email or display name is already registered.
    #[error("{0} already in use")]
    AlreadyInUse(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Display name missing or malformed.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Profile picture is not a valid URL.
    #[error("profile picture must be a valid URL")]
    InvalidProfilePicture,

    /// An update request carried no fields to change.
    #[error("nothing to update")]
    NothingToUpdate,

    /// Actor may not perform this operation on that account.
    #[error("you do not have permission to modify this account")]
    Forbidden,

    /// External identity provider error.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Federated login was requested but no provider is configured.
    #[error("federated login is not configured")]
    ProviderUnavailable,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
