//! API integration tests
//!
//! These run against a live server with the default seed admin:
//! `cargo test --test api_tests -- --ignored`

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:5000/api";
const ADMIN_EMAIL: &str = "admin@library.local";
const ADMIN_PASSWORD: &str = "change-me-now";

fn unique_email(prefix: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{}@example.com", prefix, nanos)
}

async fn login(client: &Client, email: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request")
}

/// Helper to get an admin token
async fn admin_token(client: &Client) -> String {
    let body: Value = login(client, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .json()
        .await
        .expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register a fresh member and return (token, user id)
async fn member(client: &Client, prefix: &str) -> (String, i64) {
    let email = unique_email(prefix);
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "username": prefix, "email": email, "password": "secret123" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = login(client, &email, "secret123").await.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    let id = body["user"]["id"].as_i64().unwrap();
    (token, id)
}

async fn add_book(client: &Client, admin: &str, title: &str) -> i64 {
    let response = client
        .post(format!("{}/admin/books", BASE_URL))
        .header("x-auth-token", admin)
        .json(&json!({ "title": title, "author": "Test Author", "year": 2001, "image": "cover.jpg" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    body["book"]["id"].as_i64().unwrap()
}

async fn request_book(client: &Client, token: &str, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/books/request", BASE_URL))
        .header("x-auth-token", token)
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .unwrap()
}

async fn admin_put(client: &Client, admin: &str, path: &str) -> reqwest::Response {
    client
        .put(format!("{}{}", BASE_URL, path))
        .header("x-auth-token", admin)
        .send()
        .await
        .unwrap()
}

async fn get_book(client: &Client, book_id: i64) -> Value {
    client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
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
async fn test_register_login_and_profile() {
    let client = Client::new();
    let email = unique_email("reader");

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "username": "reader", "email": email, "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password").is_none());

    let response = login(&client, &email, "secret123").await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["role"], "user");
    let token = body["token"].as_str().unwrap();

    let response = client
        .get(format!("{}/auth/profile", BASE_URL))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], email);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_rejected() {
    let client = Client::new();
    let email = unique_email("dup");
    let payload = json!({ "username": "dup", "email": email, "password": "secret123" });

    let first = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let wrong_password = login(&client, ADMIN_EMAIL, "wrong").await;
    assert_eq!(wrong_password.status(), StatusCode::BAD_REQUEST);
    let wrong_password: Value = wrong_password.json().await.unwrap();

    let unknown_email = login(&client, &unique_email("ghost"), "wrong").await;
    assert_eq!(unknown_email.status(), StatusCode::BAD_REQUEST);
    let unknown_email: Value = unknown_email.json().await.unwrap();

    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

#[tokio::test]
#[ignore]
async fn test_admin_routes_need_admin_role() {
    let client = Client::new();
    let (token, _) = member(&client, "member").await;

    let response = client
        .get(format!("{}/admin/users", BASE_URL))
        .header("x-auth-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.get(format!("{}/admin/users", BASE_URL)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_borrow_workflow() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (alice, alice_id) = member(&client, "alice").await;
    let (bob, _) = member(&client, "bob").await;
    let book_id = add_book(&client, &admin, "Workflow").await;

    let response = request_book(&client, &alice, book_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let alice_request = body["request"]["id"].as_i64().unwrap();
    assert_eq!(body["request"]["status"], "pending");

    // One pending request per user and book
    let response = request_book(&client, &alice, book_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = request_book(&client, &bob, book_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let bob_request = body["request"]["id"].as_i64().unwrap();

    let response = admin_put(&client, &admin, &format!("/admin/requests/approve/{}", alice_request)).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["request"]["status"], "approved");
    assert!(body["request"]["dueDate"].is_string());

    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], false);
    assert_eq!(book["issuedTo"], alice_id);

    // Competing request was closed by the approval
    let response = admin_put(&client, &admin, &format!("/admin/requests/approve/{}", bob_request)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = request_book(&client, &bob, book_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let borrowed: Value = client
        .get(format!("{}/books/user/borrowed", BASE_URL))
        .header("x-auth-token", &alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(borrowed
        .as_array()
        .unwrap()
        .iter()
        .any(|request| request["id"].as_i64() == Some(alice_request)));

    // Issued books and their borrowers cannot be deleted
    let response = client
        .delete(format!("{}/admin/books/{}", BASE_URL, book_id))
        .header("x-auth-token", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .delete(format!("{}/admin/users/{}", BASE_URL, alice_id))
        .header("x-auth-token", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = admin_put(&client, &admin, &format!("/admin/requests/return/{}", alice_request)).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["request"]["status"], "returned");
    assert!(body["request"]["returnDate"].is_string());

    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], true);
    assert!(book["issuedTo"].is_null());

    let response = admin_put(&client, &admin, &format!("/admin/requests/return/{}", alice_request)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .delete(format!("{}/admin/books/{}", BASE_URL, book_id))
        .header("x-auth-token", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn test_reject_and_custom_due_date() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (token, _) = member(&client, "carol").await;
    let book_id = add_book(&client, &admin, "Rejected").await;

    let body: Value = request_book(&client, &token, book_id).await.json().await.unwrap();
    let request_id = body["request"]["id"].as_i64().unwrap();

    let response = admin_put(&client, &admin, &format!("/admin/requests/reject/{}", request_id)).await;
    assert!(response.status().is_success());
    assert_eq!(get_book(&client, book_id).await["available"], true);

    let response = admin_put(&client, &admin, &format!("/admin/requests/reject/{}", request_id)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = request_book(&client, &token, book_id).await.json().await.unwrap();
    let request_id = body["request"]["id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/admin/requests/approve/{}", BASE_URL, request_id))
        .header("x-auth-token", &admin)
        .json(&json!({ "dueDate": "2031-05-01" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert!(body["request"]["dueDate"]
        .as_str()
        .unwrap()
        .starts_with("2031-05-01T00:00:00"));

    admin_put(&client, &admin, &format!("/admin/requests/return/{}", request_id)).await;
}

#[tokio::test]
#[ignore]
async fn test_statistics() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let response = client
        .get(format!("{}/admin/statistics", BASE_URL))
        .header("x-auth-token", &admin)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    let total = body["totalBooks"].as_i64().unwrap();
    let available = body["availableBooks"].as_i64().unwrap();
    let borrowed = body["borrowedBooks"].as_i64().unwrap();
    assert_eq!(total, available + borrowed);
    assert!(body["recentActivity"].is_array());
    assert!(body["overdueBooks"].is_array());
}
