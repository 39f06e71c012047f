//! API integration tests against a running server

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Log in and return the bearer token
async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register a throwaway reader and return its token
async fn reader_token(client: &Client) -> String {
    let username = format!("reader{}", chrono::Utc::now().timestamp_micros());

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    login(client, &username, "secret").await
}

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
async fn test_admin_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "ADMIN");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_register_rejects_duplicate_username() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "admin",
            "email": "other@example.com",
            "password": "secret"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_register_rejects_case_variant_username() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "ADMIN",
            "email": "shout@example.com",
            "password": "secret"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_public_catalog() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?page=0&per_page=500", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 100);
}

#[tokio::test]
#[ignore]
async fn test_reader_cannot_use_admin_area() {
    let client = Client::new();
    let token = reader_token(&client).await;

    let response = client
        .get(format!("{}/admin/users", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_order_lifecycle() {
    let client = Client::new();
    let admin = login(&client, "admin", "admin").await;

    // Catalog a book with one copy
    let book: Value = client
        .post(format!("{}/admin/books", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Integration Test Book",
            "author_first_name": "Test",
            "author_last_name": "Author"
        }))
        .send()
        .await
        .expect("Failed to create book")
        .json()
        .await
        .expect("Failed to parse book");
    let book_id = book["id"].as_i64().expect("No book id");

    let response = client
        .post(format!("{}/admin/books/{}/copies", BASE_URL, book_id))
        .bearer_auth(&admin)
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to create copy");
    assert_eq!(response.status(), StatusCode::CREATED);

    // Reader requests it
    let reader = reader_token(&client).await;
    let response = client
        .post(format!("{}/orders", BASE_URL))
        .bearer_auth(&reader)
        .json(&json!({ "book_id": book_id, "order_type": "HOME" }))
        .send()
        .await
        .expect("Failed to create order");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse order");
    assert_eq!(body["order"]["status"], "PENDING");
    let order_id = body["order"]["id"].as_i64().expect("No order id");

    // The only copy is now reserved
    let response = client
        .post(format!("{}/orders", BASE_URL))
        .bearer_auth(&reader)
        .json(&json!({ "book_id": book_id, "order_type": "READING_ROOM" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Book cannot be deleted while the order is active
    let response = client
        .delete(format!("{}/admin/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Reader cancels, the copy is released and the book can go
    let response = client
        .post(format!("{}/orders/{}/cancel", BASE_URL, order_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to cancel order");
    assert!(response.status().is_success());

    let response = client
        .delete(format!("{}/admin/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to delete book");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
