//! Rentals repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use super::{is_unique_violation, OpenOutcome, RentalsRepository};
use crate::{
    error::AppResult,
    models::{
        book::Book,
        rental::{NewRental, Rental, RentalWithBook, ReturnCode},
    },
};

#[derive(Clone)]
pub struct PgRentalsRepository {
    pool: Pool<Postgres>,
}

impl PgRentalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn list_joined(&self, student_id: Uuid, open_only: bool) -> AppResult<Vec<RentalWithBook>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.student_id, r.book_id, r.return_code, r.returned, r.rented_at, r.returned_at,
                   b.id AS b_id, b.isbn AS b_isbn, b.title AS b_title, b.authors AS b_authors,
                   b.description AS b_description, b.image_url AS b_image_url,
                   b.available AS b_available, b.added_by AS b_added_by,
                   b.created_at AS b_created_at, b.updated_at AS b_updated_at
            FROM rentals r
            LEFT JOIN books b ON b.id = r.book_id
            WHERE r.student_id = $1 AND ($2 = FALSE OR r.returned = FALSE)
            ORDER BY r.rented_at DESC
            "#,
        )
        .bind(student_id)
        .bind(open_only)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(joined_from_row).collect()
    }
}

fn joined_from_row(row: &PgRow) -> AppResult<RentalWithBook> {
    let code: String = row.try_get("return_code")?;
    let rental = Rental {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        book_id: row.try_get("book_id")?,
        return_code: ReturnCode::try_from(code)
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
        returned: row.try_get("returned")?,
        rented_at: row.try_get("rented_at")?,
        returned_at: row.try_get("returned_at")?,
    };

    let book = match row.try_get::<Option<Uuid>, _>("b_id")? {
        Some(id) => Some(Book {
            id,
            isbn: row.try_get("b_isbn")?,
            title: row.try_get("b_title")?,
            authors: row.try_get("b_authors")?,
            description: row.try_get("b_description")?,
            image_url: row.try_get("b_image_url")?,
            available: row.try_get("b_available")?,
            added_by: row.try_get("b_added_by")?,
            created_at: row.try_get("b_created_at")?,
            updated_at: row.try_get("b_updated_at")?,
        }),
        None => None,
    };

    Ok(RentalWithBook { rental, book })
}

#[async_trait]
impl RentalsRepository for PgRentalsRepository {
    async fn return_code_exists(&self, code: &ReturnCode) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rentals WHERE return_code = $1)")
            .bind(code.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn open(&self, rental: &NewRental) -> AppResult<OpenOutcome> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap on the availability flag
        let swapped = sqlx::query(
            "UPDATE books SET available = FALSE, updated_at = NOW() WHERE id = $1 AND available = TRUE",
        )
        .bind(rental.book_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if swapped == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(rental.book_id)
                .fetch_one(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Ok(if exists {
                OpenOutcome::Unavailable
            } else {
                OpenOutcome::BookMissing
            });
        }

        let inserted = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (id, student_id, book_id, return_code, returned, rented_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rental.student_id)
        .bind(rental.book_id)
        .bind(rental.return_code.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(row) => {
                tx.commit().await?;
                Ok(OpenOutcome::Opened(row))
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                Ok(OpenOutcome::CodeTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn close(&self, student_id: Uuid, book_id: Uuid, code: &ReturnCode) -> AppResult<Option<Rental>> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals SET returned = TRUE, returned_at = $4
            WHERE student_id = $1 AND book_id = $2 AND return_code = $3 AND returned = FALSE
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(book_id)
        .bind(code.as_str())
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(rental) = closed else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE books SET available = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(rental))
    }

    async fn find_open_for_book(&self, book_id: Uuid) -> AppResult<Option<Rental>> {
        let rental = sqlx::query_as::<_, Rental>(
            "SELECT * FROM rentals WHERE book_id = $1 AND returned = FALSE ORDER BY rented_at DESC LIMIT 1",
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rental)
    }

    async fn list_for_student(&self, student_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        self.list_joined(student_id, false).await
    }

    async fn list_open_for_student(&self, student_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        self.list_joined(student_id, true).await
    }
}
