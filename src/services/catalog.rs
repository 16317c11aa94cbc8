//! Catalog service: librarian book management, ISBN search and the
//! cached popular-books listing

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::metadata::MetadataSource;
use crate::{
    config::MetadataConfig,
    error::{AppError, AppResult},
    models::{
        book::{normalize_isbn, Book, BookMetadata, CreateBook, NewBook, UpdateBook},
        cache::POPULAR_BOOKS_KEY,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    metadata: Arc<dyn MetadataSource>,
    config: MetadataConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, metadata: Arc<dyn MetadataSource>, config: MetadataConfig) -> Self {
        Self {
            repository,
            metadata,
            config,
        }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list_all().await
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .get_by_id(id)
            .await?
            .ok_or(AppError::BookNotFound)
    }

    /// Add a book on behalf of a librarian
    pub async fn create_book(&self, librarian_id: Uuid, book: CreateBook) -> AppResult<Book> {
        let isbn = normalize_isbn(&book.isbn);
        if isbn.is_empty() {
            return Err(AppError::Validation("ISBN is required".to_string()));
        }

        let created = self
            .repository
            .books
            .create(&NewBook {
                isbn,
                title: book.title,
                authors: book.authors,
                description: book.description,
                image_url: book.image_url,
                added_by: Some(librarian_id),
            })
            .await?;

        tracing::info!(book_id = %created.id, isbn = %created.isbn, "Book added");
        Ok(created)
    }

    pub async fn update_book(&self, id: Uuid, mut patch: UpdateBook) -> AppResult<Book> {
        if let Some(ref isbn) = patch.isbn {
            let isbn = normalize_isbn(isbn);
            if isbn.is_empty() {
                return Err(AppError::Validation("ISBN cannot be empty".to_string()));
            }
            patch.isbn = Some(isbn);
        }
        self.repository.books.update(id, &patch).await
    }

    /// Remove a book. Rentals referencing it are kept.
    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = %id, "Book removed");
        Ok(())
    }

    /// Look an ISBN up in the external source without touching the catalog
    pub async fn search_isbn(&self, isbn: &str) -> AppResult<BookMetadata> {
        let isbn = normalize_isbn(isbn);
        if isbn.is_empty() {
            return Err(AppError::Validation("ISBN is required".to_string()));
        }
        self.metadata
            .lookup_by_isbn(&isbn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No book found for ISBN {}", isbn)))
    }

    /// Popular books, served from cache while fresh
    pub async fn popular_books(&self) -> AppResult<Vec<BookMetadata>> {
        let cached = self.repository.cache.get(POPULAR_BOOKS_KEY).await?;

        let stale = match cached {
            Some(entry) => match serde_json::from_value::<Vec<BookMetadata>>(entry.payload.clone()) {
                Ok(books) if entry.is_fresh(self.config.popular_cache_ttl_secs, Utc::now()) => {
                    return Ok(books);
                }
                Ok(books) => books,
                Err(e) => {
                    tracing::warn!("Discarding unreadable popular books cache: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let fresh = self.refresh_popular().await?;
        if fresh.is_empty() && !stale.is_empty() {
            tracing::warn!("Popular books source returned nothing, serving stale cache");
            return Ok(stale);
        }
        Ok(fresh)
    }

    /// Query the source and store a non-empty result in the cache
    pub async fn refresh_popular(&self) -> AppResult<Vec<BookMetadata>> {
        let books = self.metadata.search_popular(&self.config.popular_topics).await;
        if books.is_empty() {
            return Ok(books);
        }

        let payload = serde_json::to_value(&books)
            .map_err(|e| AppError::Internal(format!("Failed to encode popular books: {}", e)))?;
        if let Err(e) = self.repository.cache.put(POPULAR_BOOKS_KEY, &payload).await {
            tracing::warn!("Failed to store popular books cache: {}", e);
        }
        tracing::debug!(count = books.len(), "Popular books refreshed");
        Ok(books)
    }

    /// Periodically refresh the popular-books cache
    pub fn spawn_popular_refresh(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh_popular().await {
                    tracing::warn!("Scheduled popular books refresh failed: {}", e);
                }
            }
        })
    }
}
