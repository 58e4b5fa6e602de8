//! Integration tests for Entrega.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and run migrations
//! cargo run -p entrega-cli -- migrate
//!
//! # Start the API server
//! cargo run -p entrega-api
//!
//! # Run integration tests
//! cargo test -p entrega-integration-tests -- --ignored
//! ```
//!
//! Tests register their own throwaway users (unique emails via UUID) and talk
//! to the server over HTTP with a cookie-store client, the same way a browser
//! session would.

use reqwest::Client;
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("ENTREGA_BASE_URL").unwrap_or_else(|_| "http://localhost:4000".to_owned())
}

/// A cookie-holding client plus the credentials of a freshly registered user.
pub struct TestSession {
    pub client: Client,
    pub email: String,
    pub password: String,
    pub user_id: i64,
}

/// Build a client that keeps session cookies.
///
/// # Panics
///
/// Panics if the client cannot be constructed.
#[must_use]
pub fn http_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Register a new user with a unique email and log them in.
///
/// # Panics
///
/// Panics if registration or login fails; integration tests treat that as a
/// hard setup failure.
pub async fn register_and_login() -> TestSession {
    let client = http_client();
    let base_url = api_base_url();

    let tag = Uuid::new_v4().simple().to_string();
    let email = format!("it-{tag}@example.com");
    let name = format!("it user {}", &tag[..8]);
    let password = "integration-test-password".to_owned();

    let resp = client
        .post(format!("{base_url}/api/mutation/user"))
        .json(&json!({
            "action": "create",
            "name": name,
            "email": email,
            "password": password,
        }))
        .send()
        .await
        .expect("Failed to register test user");
    assert!(
        resp.status().is_success(),
        "registration failed: {}",
        resp.status()
    );
    let body: Value = resp.json().await.expect("Failed to parse registration");
    let user_id = body["user"]["id"].as_i64().expect("missing user id");

    let resp = client
        .post(format!("{base_url}/api/query/user"))
        .json(&json!({
            "action": "login",
            "email": email,
            "password": password,
        }))
        .send()
        .await
        .expect("Failed to login test user");
    assert!(resp.status().is_success(), "login failed: {}", resp.status());

    TestSession {
        client,
        email,
        password,
        user_id,
    }
}

/// Create an address with a unique street via the API, returning its id.
///
/// # Panics
///
/// Panics if the request fails.
pub async fn create_test_address(session: &TestSession, city: &str) -> i64 {
    let base_url = api_base_url();
    let street = format!("rua {}", Uuid::new_v4().simple());

    let resp = session
        .client
        .post(format!("{base_url}/api/mutation/address"))
        .json(&json!({
            "action": "create",
            "street": street,
            "number": "1",
            "city": city,
            "active": true,
        }))
        .send()
        .await
        .expect("Failed to create test address");
    assert!(
        resp.status().is_success(),
        "address creation failed: {}",
        resp.status()
    );

    let body: Value = resp.json().await.expect("Failed to parse address");
    body["address"]["id"].as_i64().expect("missing address id")
}
