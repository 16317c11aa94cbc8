//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{is_unique_violation, BooksRepository};
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, NewBook, UpdateBook},
};

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn isbn_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::DuplicateIsbn
    } else {
        AppError::Database(e)
    }
}

#[async_trait]
impl BooksRepository for PgBooksRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, isbn, title, authors, description, image_url, available, added_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.authors)
        .bind(&book.description)
        .bind(&book.image_url)
        .bind(book.added_by)
        .fetch_one(&self.pool)
        .await
        .map_err(isbn_conflict)
    }

    async fn update(&self, id: Uuid, patch: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                isbn = COALESCE($2, isbn),
                title = COALESCE($3, title),
                authors = COALESCE($4, authors),
                description = COALESCE($5, description),
                image_url = COALESCE($6, image_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.isbn)
        .bind(&patch.title)
        .bind(&patch.authors)
        .bind(&patch.description)
        .bind(&patch.image_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(isbn_conflict)?
        .ok_or(AppError::BookNotFound)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookNotFound);
        }
        Ok(())
    }

    async fn set_availability(&self, id: Uuid, available: bool) -> AppResult<()> {
        sqlx::query("UPDATE books SET available = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(available)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_all(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }
}
