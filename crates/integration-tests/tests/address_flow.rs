//! Integration tests for address sanitization and CRUD.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p entrega-api)
//!
//! Run with: cargo test -p entrega-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use entrega_integration_tests::{api_base_url, create_test_address, register_and_login};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_address_fields_are_sanitized_and_redacted() {
    let session = register_and_login().await;
    let base_url = api_base_url();

    let street = format!("Rua {}", Uuid::new_v4().simple());

    let resp = session
        .client
        .post(format!("{base_url}/api/mutation/address"))
        .json(&json!({
            "action": "create",
            "street": format!("  {street}  "),
            "number": "12B",
            "city": "  OSASCO ",
            "complement": "Casa do Homem de portão Azul",
            "active": true,
        }))
        .send()
        .await
        .expect("create failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("bad json");
    let address = &body["address"];
    assert_eq!(address["street"].as_str(), Some(street.to_lowercase().as_str()));
    assert_eq!(address["number"].as_str(), Some("12b"));
    assert_eq!(address["city"].as_str(), Some("osasco"));
    assert_eq!(
        address["complement"].as_str(),
        Some("Casa do ****** de portão Azul")
    );
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_malformed_number_is_rejected() {
    let session = register_and_login().await;
    let base_url = api_base_url();

    let resp = session
        .client
        .post(format!("{base_url}/api/mutation/address"))
        .json(&json!({
            "action": "create",
            "street": format!("rua {}", Uuid::new_v4().simple()),
            "number": "12 bis",
            "city": "osasco",
            "active": true,
        }))
        .send()
        .await
        .expect("create failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_search_matches_partial_street() {
    let session = register_and_login().await;
    let base_url = api_base_url();

    let id = create_test_address(&session, "search city").await;

    let resp = session
        .client
        .post(format!("{base_url}/api/query/address"))
        .json(&json!({"action": "search", "city": "search city"}))
        .send()
        .await
        .expect("search failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("bad json");
    let found = body["addresses"].as_array().expect("missing addresses");
    assert!(found.iter().any(|a| a["id"].as_i64() == Some(id)));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_only_owner_or_admin_can_delete() {
    let owner = register_and_login().await;
    let stranger = register_and_login().await;
    let base_url = api_base_url();

    let id = create_test_address(&owner, "permission city").await;

    let resp = stranger
        .client
        .post(format!("{base_url}/api/mutation/address"))
        .json(&json!({"action": "delete", "id": id}))
        .send()
        .await
        .expect("delete failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = owner
        .client
        .post(format!("{base_url}/api/mutation/address"))
        .json(&json!({"action": "delete", "id": id}))
        .send()
        .await
        .expect("delete failed");
    assert_eq!(resp.status(), StatusCode::OK);
}
