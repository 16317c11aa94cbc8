//! Rental engine: rent and return with per-rental return codes

use std::sync::Arc;

use uuid::Uuid;

use super::metadata::MetadataSource;
use crate::{
    config::{RentalsConfig, UnavailablePolicy},
    error::{AppError, AppResult},
    models::{
        book::{normalize_isbn, Book, NewBook},
        rental::{NewRental, Rental, RentOutcome, RentalWithBook, ReturnCode},
    },
    repository::{OpenOutcome, Repository},
};

#[derive(Clone)]
pub struct RentalsService {
    repository: Repository,
    metadata: Arc<dyn MetadataSource>,
    config: RentalsConfig,
}

impl RentalsService {
    pub fn new(repository: Repository, metadata: Arc<dyn MetadataSource>, config: RentalsConfig) -> Self {
        Self {
            repository,
            metadata,
            config,
        }
    }

    /// Rent a book by ISBN, importing it from the metadata source if the
    /// catalog does not know it yet
    pub async fn rent(&self, student_id: Uuid, isbn: &str) -> AppResult<RentOutcome> {
        let isbn = normalize_isbn(isbn);
        if isbn.is_empty() {
            return Err(AppError::Validation("ISBN is required".to_string()));
        }

        let mut book = match self.repository.books.find_by_isbn(&isbn).await? {
            Some(book) => book,
            None => self.import(&isbn).await?,
        };

        if !book.available {
            match self.config.unavailable_policy {
                UnavailablePolicy::Reject => return Err(AppError::BookUnavailable),
                UnavailablePolicy::Reopen => {
                    let orphan = self.repository.rentals.find_open_for_book(book.id).await?;
                    tracing::warn!(
                        book_id = %book.id,
                        orphaned_rental = ?orphan.map(|r| r.id),
                        "Book flagged unavailable, forcing it back before renting"
                    );
                    self.repository.books.set_availability(book.id, true).await?;
                }
            }
        }

        for _ in 0..self.config.code_attempts {
            let code = ReturnCode::generate(&mut rand::thread_rng());
            if self.repository.rentals.return_code_exists(&code).await? {
                tracing::debug!("Return code collision, drawing again");
                continue;
            }

            let rental = NewRental {
                student_id,
                book_id: book.id,
                return_code: code,
            };
            match self.repository.rentals.open(&rental).await? {
                OpenOutcome::Opened(rental) => {
                    tracing::info!(rental_id = %rental.id, book_id = %book.id, student_id = %student_id, "Book rented");
                    book.available = false;
                    return Ok(RentOutcome { rental, book });
                }
                OpenOutcome::CodeTaken => continue,
                OpenOutcome::Unavailable => return Err(AppError::BookUnavailable),
                OpenOutcome::BookMissing => return Err(AppError::BookNotFound),
            }
        }

        Err(AppError::Internal(format!(
            "No free return code after {} attempts",
            self.config.code_attempts
        )))
    }

    /// Close the student's open rental of this book if the code matches
    pub async fn return_book(&self, student_id: Uuid, isbn: &str, return_code: &str) -> AppResult<Rental> {
        let isbn = normalize_isbn(isbn);
        let book = self
            .repository
            .books
            .find_by_isbn(&isbn)
            .await?
            .ok_or(AppError::BookNotFound)?;

        let code = ReturnCode::parse(return_code).ok_or(AppError::InvalidReturn)?;

        let rental = self
            .repository
            .rentals
            .close(student_id, book.id, &code)
            .await?
            .ok_or(AppError::InvalidReturn)?;

        tracing::info!(rental_id = %rental.id, book_id = %book.id, "Book returned");
        Ok(rental)
    }

    /// Full rental history, newest first
    pub async fn list_for_student(&self, student_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        self.repository.rentals.list_for_student(student_id).await
    }

    /// Rentals not yet returned, newest first
    pub async fn list_active_for_student(&self, student_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        self.repository.rentals.list_open_for_student(student_id).await
    }

    async fn import(&self, isbn: &str) -> AppResult<Book> {
        let metadata = self
            .metadata
            .lookup_by_isbn(isbn)
            .await?
            .ok_or(AppError::BookNotFound)?;
        if metadata.degraded {
            tracing::warn!(isbn = %isbn, "Importing book with placeholder metadata");
        }

        match self
            .repository
            .books
            .create(&NewBook::from_metadata(isbn, metadata))
            .await
        {
            Ok(book) => {
                tracing::info!(book_id = %book.id, isbn = %isbn, "Book imported from metadata source");
                Ok(book)
            }
            // Imported concurrently by another rent
            Err(AppError::DuplicateIsbn) => self
                .repository
                .books
                .find_by_isbn(isbn)
                .await?
                .ok_or(AppError::BookNotFound),
            Err(e) => Err(e),
        }
    }
}
