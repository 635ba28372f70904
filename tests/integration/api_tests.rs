//! Live API tests against a running server

use reqwest::Client;
use serde_json::Value;

use crate::common::{student, token};

const BASE_URL: &str = "http://localhost:8080/api/v1";

// Tokens are signed with the development secret from config/default.toml

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .bearer_auth(token(&student(9001)))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_cart_requires_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/cart", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_get_cart() {
    let client = Client::new();

    let response = client
        .get(format!("{}/cart", BASE_URL))
        .bearer_auth(token(&student(9001)))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user_id"], 9001);
    assert!(body["lines"].is_array());
}
