//! API integration tests, driving the full router over the in-memory store

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookrent_server::{
    config::{AppConfig, UnavailablePolicy},
    create_router,
    models::user::{Role, UserClaims},
    repository::Repository,
    services::Services,
    AppState,
};
use common::{StubMetadata, KNOWN_ISBN};

fn app(policy: UnavailablePolicy) -> Router {
    let mut config = AppConfig::default();
    config.database.url = "memory:".to_string();
    config.rentals.unavailable_policy = policy;

    let services = Services::new(Repository::in_memory(), &config, Arc::new(StubMetadata));
    create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn register(app: &Router, email: &str, role: &str, code: Option<&str>) -> (StatusCode, Value) {
    let mut body = json!({
        "name": "Test User",
        "email": email,
        "password": "password1",
        "role": role,
    });
    if let Some(code) = code {
        body["librarianCode"] = json!(code);
    }
    call(app, Method::POST, "/api/auth/register", None, Some(body)).await
}

async fn token_for(app: &Router, email: &str, role: &str) -> String {
    let code = AppConfig::default().auth.librarian_code;
    let (status, body) = register(app, email, role, Some(&code)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn rent(app: &Router, token: &str, isbn: &str) -> (StatusCode, Value) {
    call(app, Method::POST, "/api/rentals/rent", Some(token), Some(json!({ "isbn": isbn }))).await
}

async fn return_book(app: &Router, token: &str, isbn: &str, code: &str) -> (StatusCode, Value) {
    let body = json!({ "isbn": isbn, "returnCode": code });
    call(app, Method::POST, "/api/rentals/return", Some(token), Some(body)).await
}

async fn catalog_book(app: &Router, isbn: &str) -> Value {
    let (_, books) = call(app, Method::GET, "/api/books", None, None).await;
    books
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["isbn"] == isbn)
        .cloned()
        .unwrap_or(Value::Null)
}

#[tokio::test]
async fn test_health_check() {
    let app = app(UnavailablePolicy::Reopen);

    let (status, body) = call(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call(&app, Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register_librarian_needs_code() {
    let app = app(UnavailablePolicy::Reopen);
    let code = AppConfig::default().auth.librarian_code;

    let (status, body) = register(&app, "lib@school.edu", "librarian", Some(&code)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["role"], "librarian");
    assert_eq!(body["user"]["email"], "lib@school.edu");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = register(&app, "other@school.edu", "librarian", Some("wrong")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidLibrarianCode");
}

#[tokio::test]
async fn test_register_rejects_bad_input_and_duplicates() {
    let app = app(UnavailablePolicy::Reopen);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "A", "email": "not-an-email", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = register(&app, "dup@school.edu", "student", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = register(&app, "DUP@school.edu", "student", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn test_login() {
    let app = app(UnavailablePolicy::Reopen);
    token_for(&app, "lib@school.edu", "librarian").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "lib@school.edu", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, me) = call(&app, Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "librarian");

    let (wrong_status, wrong) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "lib@school.edu", "password": "nope-nope" })),
    )
    .await;
    let (unknown_status, unknown) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ghost@school.edu", "password": "password1" })),
    )
    .await;
    assert_eq!(wrong_status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn test_access_gate() {
    let app = app(UnavailablePolicy::Reopen);
    let student = token_for(&app, "s@school.edu", "student").await;

    let (status, _) = call(&app, Method::GET, "/api/rentals/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/api/rentals/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let book = json!({ "isbn": "123", "title": "Nope" });
    let (status, body) = call(&app, Method::POST, "/api/books", Some(&student), Some(book)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_rejected_tokens_share_one_answer() {
    let app = app(UnavailablePolicy::Reopen);
    let secret = AppConfig::default().auth.jwt_secret;

    let mut claims = UserClaims::new(uuid::Uuid::new_v4(), Role::Student, 1);
    claims.iat -= 48 * 3600;
    claims.exp -= 48 * 3600;
    let expired = claims.create_token(&secret).unwrap();
    let forged = UserClaims::new(uuid::Uuid::new_v4(), Role::Librarian, 1)
        .create_token("not-the-server-secret")
        .unwrap();

    let (status, missing) = call(&app, Method::GET, "/api/rentals/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing["message"], "Invalid or missing token");

    for token in [expired.as_str(), forged.as_str(), "garbage"] {
        let (status, body) = call(&app, Method::GET, "/api/rentals/me", Some(token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, missing);
    }
}

#[tokio::test]
async fn test_bad_query_uses_error_body() {
    let app = app(UnavailablePolicy::Reopen);
    let student = token_for(&app, "s@school.edu", "student").await;

    let (status, body) = call(&app, Method::GET, "/api/rentals/me?active=maybe", Some(&student), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_librarian_manages_catalog() {
    let app = app(UnavailablePolicy::Reopen);
    let librarian = token_for(&app, "lib@school.edu", "librarian").await;

    let book = json!({
        "isbn": "978-0-596-51774-8",
        "title": "JavaScript: The Good Parts",
        "authors": ["Douglas Crockford"],
        "description": "Short",
        "imageUrl": ""
    });
    let (status, created) = call(&app, Method::POST, "/api/books", Some(&librarian), Some(book.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["isbn"], "9780596517748");
    assert_eq!(created["available"], true);

    let (status, body) = call(&app, Method::POST, "/api/books", Some(&librarian), Some(book)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Book already in library");

    let id = created["id"].as_str().unwrap();
    let (status, updated) = call(
        &app,
        Method::PUT,
        &format!("/api/books/{}", id),
        Some(&librarian),
        Some(json!({ "title": "The Good Parts" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "The Good Parts");
    assert_eq!(updated["authors"], json!(["Douglas Crockford"]));

    let (status, fetched) = call(&app, Method::GET, &format!("/api/books/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "The Good Parts");

    let missing = "/api/books/00000000-0000-0000-0000-000000000000";
    let (status, _) = call(&app, Method::PUT, missing, Some(&librarian), Some(json!({ "title": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::DELETE, missing, Some(&librarian), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_and_popular() {
    let app = app(UnavailablePolicy::Reopen);

    let (status, body) = call(&app, Method::GET, "/api/books/search/978-0-13-468599-1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Effective Java");

    let (status, _) = call(&app, Method::GET, "/api/books/search/0000000000", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::GET, "/api/books/popular", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["imageUrl"], "https://books.google.com/ej.jpg");

    // search never writes to the catalog
    let (_, books) = call(&app, Method::GET, "/api/books", None, None).await;
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn test_rent_imports_unknown_book_and_return() {
    let app = app(UnavailablePolicy::Reopen);
    let student = token_for(&app, "s@school.edu", "student").await;

    let (status, body) = rent(&app, &student, KNOWN_ISBN).await;
    assert_eq!(status, StatusCode::OK);
    let code = body["returnCode"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(body["book"]["isbn"], KNOWN_ISBN);
    assert_eq!(body["book"]["title"], "Effective Java");

    assert_eq!(catalog_book(&app, KNOWN_ISBN).await["available"], false);

    let (status, rentals) = call(&app, Method::GET, "/api/rentals/me?active=true", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rentals.as_array().unwrap().len(), 1);
    assert_eq!(rentals[0]["returnCode"], code.as_str());
    assert_eq!(rentals[0]["book"]["title"], "Effective Java");

    let (status, body) = return_book(&app, &student, KNOWN_ISBN, &code).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(catalog_book(&app, KNOWN_ISBN).await["available"], true);

    let (_, active) = call(&app, Method::GET, "/api/rentals/me?active=true", Some(&student), None).await;
    assert_eq!(active, json!([]));
    let (_, history) = call(&app, Method::GET, "/api/rentals/me", Some(&student), None).await;
    assert_eq!(history[0]["returned"], true);
    assert!(history[0]["returnedAt"].is_string());

    // a code works once
    let (status, body) = return_book(&app, &student, KNOWN_ISBN, &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidReturn");
}

#[tokio::test]
async fn test_rent_unknown_everywhere_is_not_found() {
    let app = app(UnavailablePolicy::Reopen);
    let student = token_for(&app, "s@school.edu", "student").await;

    let (status, body) = rent(&app, &student, "0000000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchBook");
}

#[tokio::test]
async fn test_second_rent_under_reopen_policy() {
    let app = app(UnavailablePolicy::Reopen);
    let a = token_for(&app, "a@school.edu", "student").await;
    let b = token_for(&app, "b@school.edu", "student").await;

    let (_, first) = rent(&app, &a, KNOWN_ISBN).await;
    let (status, second) = rent(&app, &b, KNOWN_ISBN).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(first["returnCode"], second["returnCode"]);
    assert_eq!(catalog_book(&app, KNOWN_ISBN).await["available"], false);
}

#[tokio::test]
async fn test_second_rent_under_reject_policy() {
    let app = app(UnavailablePolicy::Reject);
    let a = token_for(&app, "a@school.edu", "student").await;
    let b = token_for(&app, "b@school.edu", "student").await;

    let (status, _) = rent(&app, &a, KNOWN_ISBN).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = rent(&app, &b, KNOWN_ISBN).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BookUnavailable");

    let (_, rentals) = call(&app, Method::GET, "/api/rentals/me", Some(&b), None).await;
    assert_eq!(rentals, json!([]));
}

#[tokio::test]
async fn test_wrong_return_code_changes_nothing() {
    let app = app(UnavailablePolicy::Reopen);
    let student = token_for(&app, "s@school.edu", "student").await;

    let (_, body) = rent(&app, &student, KNOWN_ISBN).await;
    let code = body["returnCode"].as_str().unwrap();
    let wrong = if code == "123456" { "654321" } else { "123456" };

    let (status, body) = return_book(&app, &student, KNOWN_ISBN, wrong).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid ISBN or return code");

    assert_eq!(catalog_book(&app, KNOWN_ISBN).await["available"], false);
    let (_, active) = call(&app, Method::GET, "/api/rentals/me?active=true", Some(&student), None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_book_with_open_rental() {
    let app = app(UnavailablePolicy::Reopen);
    let librarian = token_for(&app, "lib@school.edu", "librarian").await;
    let student = token_for(&app, "s@school.edu", "student").await;

    let (_, body) = rent(&app, &student, KNOWN_ISBN).await;
    let code = body["returnCode"].as_str().unwrap().to_string();
    let id = catalog_book(&app, KNOWN_ISBN).await["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, Method::DELETE, &format!("/api/books/{}", id), Some(&librarian), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, rentals) = call(&app, Method::GET, "/api/rentals/me", Some(&student), None).await;
    assert_eq!(rentals.as_array().unwrap().len(), 1);
    assert!(rentals[0]["book"].is_null());

    let (status, _) = return_book(&app, &student, KNOWN_ISBN, &code).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let app = app(UnavailablePolicy::Reopen);
    let student = token_for(&app, "s@school.edu", "student").await;

    let (status, body) = call(&app, Method::POST, "/api/rentals/rent", Some(&student), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = rent(&app, &student, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
