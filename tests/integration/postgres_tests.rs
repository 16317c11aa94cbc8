//! PostgreSQL-backed tests.
//!
//! Need a reachable database in `DATABASE_URL`:
//! `cargo test --test postgres -- --ignored`

mod common;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use bookrent_server::{
    config::AppConfig,
    models::user::{RegisterUser, Role},
    repository::Repository,
    services::Services,
    AppError,
};
use common::{StubMetadata, KNOWN_ISBN};

async fn services() -> (Services, Repository) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let repository = Repository::new(pool);
    let services = Services::new(repository.clone(), &AppConfig::default(), Arc::new(StubMetadata));
    (services, repository)
}

#[tokio::test]
#[ignore]
async fn test_rent_and_return_round_trip() {
    let (services, repository) = services().await;
    let (_, student) = services
        .auth
        .register(RegisterUser {
            name: "Pg Student".to_string(),
            email: format!("{}@pg.test", Uuid::new_v4()),
            password: "password1".to_string(),
            role: Role::Student,
            librarian_code: None,
        })
        .await
        .unwrap();

    // the stub only knows one ISBN, so clear earlier runs first
    if let Some(book) = repository.books.find_by_isbn(KNOWN_ISBN).await.unwrap() {
        repository.books.delete(book.id).await.unwrap();
    }

    let outcome = services.rentals.rent(student.id, KNOWN_ISBN).await.unwrap();
    assert!(!outcome.book.available);

    let history = services.rentals.list_for_student(student.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].book.as_ref().map(|b| b.id), Some(outcome.book.id));

    let closed = services
        .rentals
        .return_book(student.id, KNOWN_ISBN, outcome.rental.return_code.as_str())
        .await
        .unwrap();
    assert!(closed.returned);

    let again = services
        .rentals
        .return_book(student.id, KNOWN_ISBN, outcome.rental.return_code.as_str())
        .await;
    assert!(matches!(again, Err(AppError::InvalidReturn)));

    let book = repository.books.get_by_id(outcome.book.id).await.unwrap().unwrap();
    assert!(book.available);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_case_insensitive() {
    let (services, _) = services().await;
    let email = format!("{}@pg.test", Uuid::new_v4());
    let request = |email: String| RegisterUser {
        name: "Dup".to_string(),
        email,
        password: "password1".to_string(),
        role: Role::Student,
        librarian_code: None,
    };

    services.auth.register(request(email.clone())).await.unwrap();
    let err = services.auth.register(request(email.to_uppercase())).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateEmail));
}
