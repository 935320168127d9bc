//! HTTP smoke tests against a running server
//!
//! Start the server with a bootstrap administrator configured, then run:
//! cargo test --test api_tests -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:4000";

fn admin_credentials() -> (String, String) {
    (
        std::env::var("BIBLIOTHECA_AUTH__ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.org".to_string()),
        std::env::var("BIBLIOTHECA_AUTH__ADMIN_PASSWORD").unwrap_or_else(|_| "change-me".to_string()),
    )
}

/// Send a GraphQL document, optionally authenticated
async fn graphql(client: &Client, token: Option<&str>, query: &str, variables: Value) -> Value {
    let mut request = client
        .post(format!("{}/graphql", BASE_URL))
        .json(&json!({ "query": query, "variables": variables }));
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    let response = request.send().await.expect("Failed to send request");
    assert!(response.status().is_success());
    response.json().await.expect("Failed to parse response")
}

async fn admin_token(client: &Client) -> String {
    let (email, password) = admin_credentials();
    let body = graphql(
        client,
        None,
        "mutation($input: LoginInput!) { login(input: $input) { token } }",
        json!({ "input": { "email": email, "password": password } }),
    )
    .await;
    body["data"]["login"]["token"]
        .as_str()
        .expect("No token in response")
        .to_string()
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
async fn test_readiness() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let body = graphql(
        &client,
        None,
        "mutation($input: LoginInput!) { login(input: $input) { token } }",
        json!({ "input": { "email": "nobody@example.org", "password": "wrong" } }),
    )
    .await;

    assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
#[ignore]
async fn test_anonymous_cannot_create_book() {
    let client = Client::new();
    let body = graphql(
        &client,
        None,
        r#"mutation { createBook(input: { title: "Nope" }) { id } }"#,
        json!({}),
    )
    .await;

    assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let me = graphql(&client, Some(&token), "{ me { id role } }", json!({})).await;
    assert_eq!(me["data"]["me"]["role"], "ADMIN");
    let admin_id = me["data"]["me"]["id"].as_i64().expect("No user ID");

    let created = graphql(
        &client,
        Some(&token),
        "mutation($input: BookInput!) { createBook(input: $input) { id availableCopies } }",
        json!({ "input": { "title": "Smoke Test Book", "totalCopies": 1 } }),
    )
    .await;
    let book_id = created["data"]["createBook"]["id"].as_i64().expect("No book ID");

    let borrowed = graphql(
        &client,
        Some(&token),
        "mutation($u: Int!, $b: Int!) { borrowBook(userId: $u, bookId: $b) { id status book { availableCopies } } }",
        json!({ "u": admin_id, "b": book_id }),
    )
    .await;
    assert_eq!(borrowed["data"]["borrowBook"]["status"], "ACTIVE");
    assert_eq!(borrowed["data"]["borrowBook"]["book"]["availableCopies"], 0);
    let loan_id = borrowed["data"]["borrowBook"]["id"].as_i64().expect("No loan ID");

    let again = graphql(
        &client,
        Some(&token),
        "mutation($u: Int!, $b: Int!) { borrowBook(userId: $u, bookId: $b) { id } }",
        json!({ "u": admin_id, "b": book_id }),
    )
    .await;
    assert_eq!(again["errors"][0]["extensions"]["code"], "UNAVAILABLE");

    let returned = graphql(
        &client,
        Some(&token),
        "mutation($id: Int!) { returnBook(loanId: $id) { status returnDate } }",
        json!({ "id": loan_id }),
    )
    .await;
    assert_eq!(returned["data"]["returnBook"]["status"], "RETURNED");

    let twice = graphql(
        &client,
        Some(&token),
        "mutation($id: Int!) { returnBook(loanId: $id) { status } }",
        json!({ "id": loan_id }),
    )
    .await;
    assert_eq!(twice["errors"][0]["extensions"]["code"], "CONFLICT");

    // Cleanup: returned loans do not block deletion
    let deleted = graphql(
        &client,
        Some(&token),
        "mutation($id: Int!) { deleteBook(id: $id) }",
        json!({ "id": book_id }),
    )
    .await;
    assert_eq!(deleted["data"]["deleteBook"], true);
}
