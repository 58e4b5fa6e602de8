//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error response carries the same JSON envelope the success paths use:
//! `{"success": false, "message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::addresses::AddressError;
use crate::services::auth::AuthError;
use crate::services::cards::CardError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Address operation failed.
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Card operation failed.
    #[error("Card error: {0}")]
    Card(#[from] CardError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Internal(_) => true,
            Self::Auth(err) => matches!(
                err,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::Identity(_)
            ),
            Self::Address(err) => matches!(err, AddressError::Repository(_)),
            Self::Card(err) => matches!(err, CardError::Repository(_)),
            Self::Unauthorized(_) | Self::BadRequest(_) => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::ProviderUnavailable => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Identity(_) => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::AlreadyInUse(_) => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::InvalidName(_)
                | AuthError::InvalidProfilePicture
                | AuthError::NothingToUpdate => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Address(err) => match err {
                AddressError::Validation(_) => StatusCode::BAD_REQUEST,
                AddressError::Duplicate => StatusCode::CONFLICT,
                AddressError::Forbidden => StatusCode::FORBIDDEN,
                AddressError::NotFound => StatusCode::NOT_FOUND,
                AddressError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Card(err) => match err {
                CardError::Validation(_) => StatusCode::BAD_REQUEST,
                CardError::Conflict { .. } => StatusCode::CONFLICT,
                CardError::NotFound => StatusCode::NOT_FOUND,
                CardError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Server errors are collapsed so internal detail
    /// never reaches the response body.
    fn message(&self) -> String {
        if self.is_server_error() {
            return match self {
                Self::Auth(AuthError::Identity(_)) => "identity verification failed".to_owned(),
                _ => "internal server error".to_owned(),
            };
        }

        match self {
            Self::Auth(err) => err.to_string(),
            Self::Address(err) => err.to_string(),
            Self::Card(err) => err.to_string(),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "internal server error".to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "success": false,
            "message": self.message(),
        });

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Unauthorized("login required".to_owned());
        assert_eq!(err.to_string(), "Unauthorized: login required");

        let err = AppError::BadRequest("invalid input".to_owned());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::Unauthorized("test".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::BadRequest("test".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Internal("test".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Auth(AuthError::AlreadyInUse("name".to_owned()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Address(AddressError::Forbidden)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::Card(CardError::NotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::Internal("pool exhausted at 10 connections".to_owned());
        assert_eq!(err.message(), "internal server error");
    }

    #[test]
    fn test_card_conflict_names_addresses() {
        use entrega_core::AddressId;
        let err = AppError::Card(CardError::Conflict {
            addresses: vec![AddressId::new(3), AddressId::new(7)],
        });
        assert!(err.message().contains("3, 7"));
    }
}
