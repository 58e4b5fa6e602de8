//! Integration tests for the user lifecycle.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p entrega-api)
//!
//! Run with: cargo test -p entrega-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use entrega_integration_tests::{api_base_url, http_client, register_and_login};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_register_login_get_logout() {
    let session = register_and_login().await;
    let base_url = api_base_url();

    // Authenticated get returns the profile without the email
    let resp = session
        .client
        .post(format!("{base_url}/api/query/user"))
        .json(&json!({"action": "get"}))
        .send()
        .await
        .expect("get failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("bad json");
    assert_eq!(body["success"], true);
    assert!(body["user"]["email"].is_null(), "email must not be exposed");
    assert_eq!(body["user"]["id"].as_i64(), Some(session.user_id));

    // Logout, then get is rejected
    let resp = session
        .client
        .post(format!("{base_url}/api/query/user"))
        .json(&json!({"action": "logout"}))
        .send()
        .await
        .expect("logout failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = session
        .client
        .post(format!("{base_url}/api/query/user"))
        .json(&json!({"action": "get"}))
        .send()
        .await
        .expect("get failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_login_with_wrong_password_is_rejected() {
    let session = register_and_login().await;
    let base_url = api_base_url();

    let resp = http_client()
        .post(format!("{base_url}/api/query/user"))
        .json(&json!({
            "action": "login",
            "email": session.email,
            "password": "not-the-password",
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.expect("bad json");
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_email_registration_conflicts() {
    let session = register_and_login().await;
    let base_url = api_base_url();

    let resp = http_client()
        .post(format!("{base_url}/api/mutation/user"))
        .json(&json!({
            "action": "create",
            "name": "someone else entirely",
            "email": session.email,
            "password": "another-password",
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_profile_update_and_delete() {
    let session = register_and_login().await;
    let base_url = api_base_url();

    let resp = session
        .client
        .post(format!("{base_url}/api/mutation/user"))
        .json(&json!({
            "action": "update",
            "profilePicture": "https://example.com/avatar.png",
        }))
        .send()
        .await
        .expect("update failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("bad json");
    assert_eq!(
        body["user"]["profilePicture"].as_str(),
        Some("https://example.com/avatar.png")
    );

    // An update with no fields is a 400
    let resp = session
        .client
        .post(format!("{base_url}/api/mutation/user"))
        .json(&json!({"action": "update"}))
        .send()
        .await
        .expect("update failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Self-delete ends the session
    let resp = session
        .client
        .post(format!("{base_url}/api/mutation/user"))
        .json(&json!({"action": "delete"}))
        .send()
        .await
        .expect("delete failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = session
        .client
        .post(format!("{base_url}/api/query/user"))
        .json(&json!({"action": "get"}))
        .send()
        .await
        .expect("get failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
