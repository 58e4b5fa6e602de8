//! Authentication and account service.
//!
//! Passwords are hashed with Argon2id. Federated login goes through an
//! [`IdentityProvider`]; unknown provider emails are registered on the fly
//! with a random placeholder password, so those accounts can only ever log in
//! through the provider.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Deserialize;
use sqlx::PgPool;
use url::Url;

use entrega_core::Email;
use entrega_core::UserId;

use crate::db::RepositoryError;
use crate::db::users::{NewUserRecord, UserRepository};
use crate::models::{CurrentUser, User};
use crate::services::identity::IdentityProvider;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum display name length.
const MAX_NAME_LENGTH: usize = 60;
/// Length of the placeholder password minted for provider-created accounts.
const PLACEHOLDER_PASSWORD_LENGTH: usize = 32;
/// How many numeric suffixes to try when a provider name is taken.
const NAME_DEDUP_ATTEMPTS: u32 = 50;

/// Input for registering a new user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default, rename = "isSS")]
    pub is_ss: bool,
    #[serde(default)]
    pub group: Option<String>,
}

/// Input for updating a user's own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub profile_picture: Option<String>,
}

/// Authentication and account service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    default_profile_picture: &'a str,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, default_profile_picture: &'a str) -> Self {
        Self {
            users: UserRepository::new(pool),
            default_profile_picture,
        }
    }

    /// Register a new user with email and password.
    ///
    /// Accounts always start without administrator rights; those are granted
    /// separately, out of band.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::InvalidName` or
    /// `AuthError::WeakPassword` for bad input, and `AuthError::AlreadyInUse`
    /// if the email or name is taken.
    pub async fn register(&self, input: RegisterInput) -> Result<User, AuthError> {
        let email = Email::parse(&input.email)?;
        let name = validate_name(&input.name)?;
        validate_password(&input.password)?;

        let profile_picture = match input.profile_picture.as_deref() {
            Some(url) if !url.trim().is_empty() => validate_picture_url(url)?,
            _ => self.default_profile_picture.to_owned(),
        };

        let password_hash = hash_password(&input.password)?;
        let group = input.group.unwrap_or_else(|| "0".to_owned());

        self.create_user(&name, &email, &password_hash, &profile_picture, input.is_ss, &group)
            .await
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Login with a provider-issued ID token, registering the account if the
    /// asserted email is unknown.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` if the token does not verify.
    pub async fn login_with_provider(
        &self,
        provider: &dyn IdentityProvider,
        token: &str,
    ) -> Result<User, AuthError> {
        let identity = provider.verify(token).await?;
        let email = Email::parse(&identity.email)?;

        if let Some(user) = self.users.get_by_email(&email).await? {
            return Ok(user);
        }

        let name = self.dedup_name(&identity.name).await?;
        let picture = identity
            .picture
            .as_deref()
            .unwrap_or(self.default_profile_picture);

        // No usable password: the account is provider-only.
        let placeholder = random_password();
        let password_hash = hash_password(&placeholder)?;

        self.create_user(&name, &email, &password_hash, picture, false, "0")
            .await
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update the actor's own profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NothingToUpdate` when no fields are set, plus the
    /// usual validation errors for each changed field.
    pub async fn update_profile(
        &self,
        actor: &CurrentUser,
        update: UpdateProfileInput,
    ) -> Result<User, AuthError> {
        if update.name.is_none() && update.profile_picture.is_none() {
            return Err(AuthError::NothingToUpdate);
        }

        let name = update.name.as_deref().map(validate_name).transpose()?;
        let picture = update
            .profile_picture
            .as_deref()
            .map(validate_picture_url)
            .transpose()?;

        self.users
            .update_profile(actor.id, name.as_deref(), picture.as_deref())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AlreadyInUse("name".to_owned()),
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Delete an account. Allowed for the account owner or an admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` for other actors and
    /// `AuthError::UserNotFound` if the account doesn't exist.
    pub async fn delete(&self, actor: &CurrentUser, user_id: UserId) -> Result<(), AuthError> {
        if !actor.is_admin && actor.id != user_id {
            return Err(AuthError::Forbidden);
        }

        if self.users.delete(user_id).await? {
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }

    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
        profile_picture: &str,
        is_ss: bool,
        group: &str,
    ) -> Result<User, AuthError> {
        let record = NewUserRecord {
            name,
            email,
            password_hash,
            profile_picture,
            is_ss,
            group,
        };

        self.users.create(&record).await.map_err(|e| match e {
            RepositoryError::Conflict(message) => conflict_to_error(&message),
            other => AuthError::Repository(other),
        })
    }

    /// Find an unused variant of a provider-asserted display name.
    async fn dedup_name(&self, raw: &str) -> Result<String, AuthError> {
        let base = validate_name(raw).unwrap_or_else(|_| "user".to_owned());

        if !self.users.name_exists(&base).await? {
            return Ok(base);
        }
        for n in 2..=NAME_DEDUP_ATTEMPTS {
            let candidate = format!("{base} {n}");
            if !self.users.name_exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        // Extremely popular name; fall back to a random tag.
        let tag: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        Ok(format!("{base} {tag}"))
    }
}

/// Map a unique-violation message to the field it names.
fn conflict_to_error(message: &str) -> AuthError {
    let field = if message.starts_with("name") {
        "name"
    } else {
        "email"
    };
    AuthError::AlreadyInUse(field.to_owned())
}

/// Validate and normalize a display name.
fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("name is required".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == ' ') {
        return Err(AuthError::InvalidName(
            "name may only contain letters, digits and spaces".to_owned(),
        ));
    }
    Ok(name.to_owned())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Require an absolute http(s) URL for profile pictures.
fn validate_picture_url(url: &str) -> Result<String, AuthError> {
    let parsed = Url::parse(url.trim()).map_err(|_| AuthError::InvalidProfilePicture)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AuthError::InvalidProfilePicture);
    }
    Ok(parsed.into())
}

fn random_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PLACEHOLDER_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Joana Silva ").unwrap(), "Joana Silva");
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("joana<script>").is_err());
        assert!(validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("12345678").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_validate_picture_url() {
        assert!(validate_picture_url("https://example.com/a.png").is_ok());
        assert!(validate_picture_url("http://example.com/a.png").is_ok());
        assert!(validate_picture_url("ftp://example.com/a.png").is_err());
        assert!(validate_picture_url("not a url").is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_random_password_length_and_charset() {
        let p = random_password();
        assert_eq!(p.len(), PLACEHOLDER_PASSWORD_LENGTH);
        assert!(p.chars().all(char::is_alphanumeric));
    }

    #[test]
    fn test_conflict_field_mapping() {
        assert!(matches!(
            conflict_to_error("name already in use"),
            AuthError::AlreadyInUse(f) if f == "name"
        ));
        assert!(matches!(
            conflict_to_error("email already in use"),
            AuthError::AlreadyInUse(f) if f == "email"
        ));
    }
}
