//! In-process storage backend.
//!
//! Selected with a `memory:` database url. Every operation takes the single
//! state lock, so each trait method is atomic with respect to the others,
//! which gives `open`/`close` the same all-or-nothing shape as the
//! PostgreSQL transactions.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{BooksRepository, CacheRepository, OpenOutcome, RentalsRepository, UsersRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        Book, CacheEntry, NewBook, NewRental, NewUser, Rental, RentalWithBook, ReturnCode, UpdateBook, User,
    },
};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    books: Vec<Book>,
    rentals: Vec<Rental>,
    cache: HashMap<String, CacheEntry>,
}

impl MemoryState {
    fn book(&self, id: Uuid) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    fn book_mut(&mut self, id: Uuid) -> Option<&mut Book> {
        self.books.iter_mut().find(|b| b.id == id)
    }

    fn student_rentals(&self, student_id: Uuid, open_only: bool) -> Vec<RentalWithBook> {
        let mut rentals: Vec<RentalWithBook> = self
            .rentals
            .iter()
            .rev()
            .filter(|r| r.student_id == student_id && (!open_only || r.is_open()))
            .map(|r| RentalWithBook {
                rental: r.clone(),
                book: self.book(r.book_id).cloned(),
            })
            .collect();
        // stable: same-instant rentals keep newest-inserted first
        rentals.sort_by(|a, b| b.rental.rented_at.cmp(&a.rental.rented_at));
        rentals
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UsersRepository for MemoryRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::DuplicateEmail);
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        state.users.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl BooksRepository for MemoryRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.lock()?.book(id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        Ok(self.lock()?.books.iter().find(|b| b.isbn == isbn).cloned())
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let mut state = self.lock()?;
        if state.books.iter().any(|b| b.isbn == book.isbn) {
            return Err(AppError::DuplicateIsbn);
        }
        let now = Utc::now();
        let created = Book {
            id: Uuid::new_v4(),
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            authors: book.authors.clone(),
            description: book.description.clone(),
            image_url: book.image_url.clone(),
            available: true,
            added_by: book.added_by,
            created_at: now,
            updated_at: now,
        };
        state.books.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: &UpdateBook) -> AppResult<Book> {
        let mut state = self.lock()?;
        if let Some(ref isbn) = patch.isbn {
            if state.books.iter().any(|b| b.id != id && &b.isbn == isbn) {
                return Err(AppError::DuplicateIsbn);
            }
        }
        let book = state.book_mut(id).ok_or(AppError::BookNotFound)?;
        patch.apply(book);
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.lock()?;
        let before = state.books.len();
        state.books.retain(|b| b.id != id);
        if state.books.len() == before {
            return Err(AppError::BookNotFound);
        }
        Ok(())
    }

    async fn set_availability(&self, id: Uuid, available: bool) -> AppResult<()> {
        let mut state = self.lock()?;
        if let Some(book) = state.book_mut(id) {
            book.available = available;
            book.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_all(&self) -> AppResult<Vec<Book>> {
        Ok(self.lock()?.books.clone())
    }
}

#[async_trait]
impl RentalsRepository for MemoryRepository {
    async fn return_code_exists(&self, code: &ReturnCode) -> AppResult<bool> {
        Ok(self.lock()?.rentals.iter().any(|r| &r.return_code == code))
    }

    async fn open(&self, rental: &NewRental) -> AppResult<OpenOutcome> {
        let mut state = self.lock()?;

        match state.book(rental.book_id) {
            None => return Ok(OpenOutcome::BookMissing),
            Some(book) if !book.available => return Ok(OpenOutcome::Unavailable),
            Some(_) => {}
        }
        if state.rentals.iter().any(|r| r.return_code == rental.return_code) {
            return Ok(OpenOutcome::CodeTaken);
        }

        let now = Utc::now();
        if let Some(book) = state.book_mut(rental.book_id) {
            book.available = false;
            book.updated_at = now;
        }
        let opened = Rental {
            id: Uuid::new_v4(),
            student_id: rental.student_id,
            book_id: rental.book_id,
            return_code: rental.return_code.clone(),
            returned: false,
            rented_at: now,
            returned_at: None,
        };
        state.rentals.push(opened.clone());
        Ok(OpenOutcome::Opened(opened))
    }

    async fn close(&self, student_id: Uuid, book_id: Uuid, code: &ReturnCode) -> AppResult<Option<Rental>> {
        let mut state = self.lock()?;
        let now = Utc::now();

        let Some(rental) = state.rentals.iter_mut().find(|r| {
            r.student_id == student_id && r.book_id == book_id && &r.return_code == code && r.is_open()
        }) else {
            return Ok(None);
        };
        rental.returned = true;
        rental.returned_at = Some(now);
        let closed = rental.clone();

        if let Some(book) = state.book_mut(book_id) {
            book.available = true;
            book.updated_at = now;
        }
        Ok(Some(closed))
    }

    async fn find_open_for_book(&self, book_id: Uuid) -> AppResult<Option<Rental>> {
        Ok(self
            .lock()?
            .rentals
            .iter()
            .rev()
            .find(|r| r.book_id == book_id && r.is_open())
            .cloned())
    }

    async fn list_for_student(&self, student_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        Ok(self.lock()?.student_rentals(student_id, false))
    }

    async fn list_open_for_student(&self, student_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        Ok(self.lock()?.student_rentals(student_id, true))
    }
}

#[async_trait]
impl CacheRepository for MemoryRepository {
    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        Ok(self.lock()?.cache.get(key).cloned())
    }

    async fn put(&self, key: &str, payload: &serde_json::Value) -> AppResult<()> {
        self.lock()?.cache.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                payload: payload.clone(),
                fetched_at: Utc::now(),
            },
        );
        Ok(())
    }
}
