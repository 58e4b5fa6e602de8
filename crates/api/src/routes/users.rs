//! User route handlers.
//!
//! Two endpoints, each dispatching on the request's `action` field:
//!
//! - `POST /api/query/user` - `get`, `login`, `logout`
//! - `POST /api/mutation/user` - `create`, `update`, `delete`, `google`
//!
//! Every response uses the `{success, message, user?}` envelope, and user
//! payloads are always the [`PublicUser`] projection (no email).

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use entrega_core::UserId;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, PublicUser, User};
use crate::services::auth::{AuthService, RegisterInput, UpdateProfileInput};
use crate::state::AppState;

/// User query actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum UserQueryRequest {
    /// Fetch a user's public profile. Without an `id`, the logged-in user's
    /// own.
    Get { id: Option<UserId> },
    /// Password login.
    Login { email: String, password: String },
    /// End the session.
    Logout,
}

/// User mutation actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum UserMutationRequest {
    /// Register a new account.
    Create {
        #[serde(flatten)]
        input: RegisterInput,
    },
    /// Update the logged-in user's profile.
    Update {
        #[serde(flatten)]
        input: UpdateProfileInput,
    },
    /// Delete an account. Without an `id`, deletes the logged-in account.
    Delete { id: Option<UserId> },
    /// Login (or register) through the Google identity provider.
    Google { token: String },
}

/// Response envelope for user endpoints.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

impl UserResponse {
    fn ok(message: &str, user: Option<User>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
            user: user.map(PublicUser::from),
        })
    }
}

/// Handle `POST /api/query/user`.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for `get` without a session and
/// `AppError::Auth` for failed logins.
pub async fn query(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
    Json(request): Json<UserQueryRequest>,
) -> Result<Json<UserResponse>> {
    let auth = AuthService::new(state.pool(), &state.config().default_profile_picture);

    match request {
        UserQueryRequest::Get { id } => {
            let current = current.ok_or_else(unauthorized)?;
            let user = auth.get_user(id.unwrap_or(current.id)).await?;
            Ok(UserResponse::ok("user found", Some(user)))
        }
        UserQueryRequest::Login { email, password } => {
            let user = auth.login(&email, &password).await?;
            start_session(&session, &user).await?;
            Ok(UserResponse::ok("login successful", Some(user)))
        }
        UserQueryRequest::Logout => {
            clear_current_user(&session)
                .await
                .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
            clear_sentry_user();
            Ok(UserResponse::ok("logout successful", None))
        }
    }
}

/// Handle `POST /api/mutation/user`.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for `update`/`delete` without a session
/// and `AppError::Auth` for validation or permission failures.
pub async fn mutation(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
    Json(request): Json<UserMutationRequest>,
) -> Result<Json<UserResponse>> {
    let auth = AuthService::new(state.pool(), &state.config().default_profile_picture);

    match request {
        UserMutationRequest::Create { input } => {
            let user = auth.register(input).await?;
            Ok(UserResponse::ok("user created", Some(user)))
        }
        UserMutationRequest::Update { input } => {
            let current = current.ok_or_else(unauthorized)?;
            let user = auth.update_profile(&current, input).await?;

            // The session copy of the name may now be stale
            let refreshed = CurrentUser {
                id: user.id,
                name: user.name.clone(),
                is_admin: user.is_admin,
            };
            set_current_user(&session, &refreshed)
                .await
                .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

            Ok(UserResponse::ok("user updated", Some(user)))
        }
        UserMutationRequest::Delete { id } => {
            let current = current.ok_or_else(unauthorized)?;
            let target = id.unwrap_or(current.id);
            auth.delete(&current, target).await?;

            if target == current.id {
                clear_current_user(&session)
                    .await
                    .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
                clear_sentry_user();
            }

            Ok(UserResponse::ok("user deleted", None))
        }
        UserMutationRequest::Google { token } => {
            let provider = state
                .identity()
                .ok_or(AppError::Auth(crate::services::auth::AuthError::ProviderUnavailable))?;
            let user = auth.login_with_provider(provider, &token).await?;
            start_session(&session, &user).await?;
            Ok(UserResponse::ok("login successful", Some(user)))
        }
    }
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("authentication required".to_owned())
}

/// Store the user in the session and tag Sentry events with them.
async fn start_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        name: user.name.clone(),
        is_admin: user.is_admin,
    };
    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_dispatches_on_action() {
        let request: UserQueryRequest = serde_json::from_str(
            r#"{"action": "login", "email": "a@b.com", "password": "hunter22"}"#,
        )
        .unwrap();
        assert!(matches!(request, UserQueryRequest::Login { .. }));

        let request: UserQueryRequest = serde_json::from_str(r#"{"action": "get"}"#).unwrap();
        assert!(matches!(request, UserQueryRequest::Get { id: None }));

        let request: UserQueryRequest =
            serde_json::from_str(r#"{"action": "get", "id": 7}"#).unwrap();
        assert!(matches!(request, UserQueryRequest::Get { id: Some(_) }));
    }

    #[test]
    fn test_mutation_request_flattens_input() {
        let request: UserMutationRequest = serde_json::from_str(
            r#"{
                "action": "create",
                "name": "Joana",
                "email": "joana@example.com",
                "password": "longenough"
            }"#,
        )
        .unwrap();
        let UserMutationRequest::Create { input } = request else {
            panic!("expected create");
        };
        assert_eq!(input.name, "Joana");
        assert!(input.profile_picture.is_none());
    }

    #[test]
    fn test_google_action_uses_lowercase_tag() {
        let request: UserMutationRequest =
            serde_json::from_str(r#"{"action": "google", "token": "abc"}"#).unwrap();
        assert!(matches!(request, UserMutationRequest::Google { .. }));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(serde_json::from_str::<UserQueryRequest>(r#"{"action": "drop"}"#).is_err());
    }
}
