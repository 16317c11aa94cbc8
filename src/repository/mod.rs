//! Repository layer: storage contracts and their backends

pub mod books;
pub mod cache;
pub mod memory;
pub mod rentals;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Book, CacheEntry, NewBook, NewRental, NewUser, Rental, RentalWithBook, ReturnCode, UpdateBook, User},
};

#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Case-insensitive lookup
    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Fails with `DuplicateEmail` when the email is taken
    async fn create(&self, user: &NewUser) -> AppResult<User>;
}

#[async_trait]
pub trait BooksRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;
    /// New books start available. Fails with `DuplicateIsbn`.
    async fn create(&self, book: &NewBook) -> AppResult<Book>;
    /// Fails with `BookNotFound` or `DuplicateIsbn`
    async fn update(&self, id: Uuid, patch: &UpdateBook) -> AppResult<Book>;
    /// Fails with `BookNotFound`. Rentals referencing the book are left untouched.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    /// Unconditional write, reserved to the rental engine
    async fn set_availability(&self, id: Uuid, available: bool) -> AppResult<()>;
    /// Insertion order
    async fn list_all(&self) -> AppResult<Vec<Book>>;
}

/// Result of trying to commit a rent
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    /// Availability swapped to false and rental inserted
    Opened(Rental),
    /// The book was not available at swap time; nothing written
    Unavailable,
    /// The book no longer exists; nothing written
    BookMissing,
    /// Another rental already holds this return code; nothing written
    CodeTaken,
}

#[async_trait]
pub trait RentalsRepository: Send + Sync {
    /// Whether any rental, open or closed, holds this code
    async fn return_code_exists(&self, code: &ReturnCode) -> AppResult<bool>;
    /// Atomically: set the book unavailable only if it is available, then insert the rental
    async fn open(&self, rental: &NewRental) -> AppResult<OpenOutcome>;
    /// Atomically: close the matching open rental and make its book available.
    /// None when no open rental matches all of student, book and code.
    async fn close(&self, student_id: Uuid, book_id: Uuid, code: &ReturnCode) -> AppResult<Option<Rental>>;
    async fn find_open_for_book(&self, book_id: Uuid) -> AppResult<Option<Rental>>;
    /// Full history, newest first
    async fn list_for_student(&self, student_id: Uuid) -> AppResult<Vec<RentalWithBook>>;
    /// Open rentals only, newest first
    async fn list_open_for_student(&self, student_id: Uuid) -> AppResult<Vec<RentalWithBook>>;
}

#[async_trait]
pub trait CacheRepository: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>>;
    /// Insert or replace, stamping the entry with the current time
    async fn put(&self, key: &str, payload: &serde_json::Value) -> AppResult<()>;
}

/// All storage backends bundled for the services
#[derive(Clone)]
pub struct Repository {
    pool: Option<Pool<Postgres>>,
    pub users: Arc<dyn UsersRepository>,
    pub books: Arc<dyn BooksRepository>,
    pub rentals: Arc<dyn RentalsRepository>,
    pub cache: Arc<dyn CacheRepository>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::PgUsersRepository::new(pool.clone())),
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            rentals: Arc::new(rentals::PgRentalsRepository::new(pool.clone())),
            cache: Arc::new(cache::PgCacheRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository held in process memory
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryRepository::default());
        Self {
            pool: None,
            users: store.clone(),
            books: store.clone(),
            rentals: store.clone(),
            cache: store,
        }
    }

    /// Check that the storage backend answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(ref pool) = self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Whether a database error is a unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
