//! External identity providers for federated login.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Errors from identity token verification.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token was rejected by the provider.
    #[error("identity token was rejected")]
    InvalidToken,

    /// The token belongs to a different OAuth client.
    #[error("identity token was issued for another application")]
    AudienceMismatch,

    /// The provider did not report a verified email.
    #[error("identity provider did not supply a verified email")]
    UnverifiedEmail,

    /// Transport-level failure talking to the provider.
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Identity asserted by an external provider.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Verifies provider-issued ID tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a token and return the identity it asserts.
    async fn verify(&self, token: &str) -> Result<ProviderIdentity, IdentityError>;
}

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Deserialize)]
struct GoogleTokenInfo {
    aud: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Google's tokeninfo endpoint as an [`IdentityProvider`].
pub struct GoogleIdentity {
    client: reqwest::Client,
    client_id: String,
    endpoint: String,
}

impl GoogleIdentity {
    /// Create a verifier bound to an OAuth client ID.
    #[must_use]
    pub fn new(client: reqwest::Client, client_id: String) -> Self {
        Self::with_endpoint(client, client_id, GOOGLE_TOKENINFO_URL.to_owned())
    }

    /// Create a verifier against a non-default tokeninfo endpoint.
    #[must_use]
    pub fn with_endpoint(client: reqwest::Client, client_id: String, endpoint: String) -> Self {
        Self {
            client,
            client_id,
            endpoint,
        }
    }
}

/// Display name when the provider sends none: the email's local part.
fn fallback_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_owned()
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn verify(&self, token: &str) -> Result<ProviderIdentity, IdentityError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::InvalidToken);
        }

        let info: GoogleTokenInfo = response.json().await?;

        if info.aud != self.client_id {
            return Err(IdentityError::AudienceMismatch);
        }
        if info.email_verified.as_deref() != Some("true") {
            return Err(IdentityError::UnverifiedEmail);
        }
        let email = info.email.ok_or(IdentityError::UnverifiedEmail)?;

        let name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name(&email));

        Ok(ProviderIdentity {
            email,
            name,
            picture: info.picture,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::get};

    use super::*;

    /// Serve one canned tokeninfo response on an ephemeral port and return
    /// its URL.
    async fn spawn_tokeninfo(status: StatusCode, body: serde_json::Value) -> String {
        let app = Router::new().route(
            "/tokeninfo",
            get(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/tokeninfo")
    }

    fn provider(endpoint: String) -> GoogleIdentity {
        GoogleIdentity::with_endpoint(reqwest::Client::new(), "client-123".to_owned(), endpoint)
    }

    #[tokio::test]
    async fn test_verify_accepts_matching_audience() {
        let endpoint = spawn_tokeninfo(
            StatusCode::OK,
            serde_json::json!({
                "aud": "client-123",
                "email": "joana@example.com",
                "email_verified": "true",
                "picture": "https://example.com/p.png"
            }),
        )
        .await;

        let identity = provider(endpoint).verify("tok").await.unwrap();
        assert_eq!(identity.email, "joana@example.com");
        // No name in the response, so the email's local part stands in
        assert_eq!(identity.name, "joana");
        assert_eq!(identity.picture.as_deref(), Some("https://example.com/p.png"));
    }

    #[tokio::test]
    async fn test_verify_rejects_foreign_audience() {
        let endpoint = spawn_tokeninfo(
            StatusCode::OK,
            serde_json::json!({
                "aud": "someone-else",
                "email": "joana@example.com",
                "email_verified": "true"
            }),
        )
        .await;

        assert!(matches!(
            provider(endpoint).verify("tok").await,
            Err(IdentityError::AudienceMismatch)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_unverified_email() {
        let endpoint = spawn_tokeninfo(
            StatusCode::OK,
            serde_json::json!({
                "aud": "client-123",
                "email": "joana@example.com",
                "email_verified": "false"
            }),
        )
        .await;

        assert!(matches!(
            provider(endpoint).verify("tok").await,
            Err(IdentityError::UnverifiedEmail)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_provider_error_status() {
        let endpoint = spawn_tokeninfo(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": "invalid_token"}),
        )
        .await;

        assert!(matches!(
            provider(endpoint).verify("tok").await,
            Err(IdentityError::InvalidToken)
        ));
    }

    #[test]
    fn test_tokeninfo_deserializes() {
        let json = r#"{
            "aud": "client-123",
            "email": "user@example.com",
            "email_verified": "true",
            "name": "User Example",
            "picture": "https://example.com/p.png"
        }"#;
        let info: GoogleTokenInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.aud, "client-123");
        assert_eq!(info.email_verified.as_deref(), Some("true"));
    }

    #[test]
    fn test_tokeninfo_tolerates_missing_profile_fields() {
        let json = r#"{"aud": "client-123"}"#;
        let info: GoogleTokenInfo = serde_json::from_str(json).unwrap();
        assert!(info.email.is_none());
        assert!(info.name.is_none());
    }

    #[test]
    fn test_fallback_name_uses_local_part() {
        assert_eq!(fallback_name("joana@example.com"), "joana");
        assert_eq!(fallback_name("no-at-sign"), "no-at-sign");
    }
}
