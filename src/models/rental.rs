//! Rental model, return codes and related types

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::book::Book;

/// Six-digit numeric code that closes a rental
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnCode(String);

impl ReturnCode {
    pub const MIN: u32 = 100_000;
    pub const MAX: u32 = 999_999;

    /// Draw a code uniformly from 100000..=999999
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        ReturnCode(format!("{:06}", rng.gen_range(Self::MIN..=Self::MAX)))
    }

    /// Accept exactly six ASCII digits
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
            Some(ReturnCode(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReturnCode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReturnCode::parse(&s).ok_or_else(|| format!("invalid return code: {}", s))
    }
}

/// Rental record. Never deleted; closed rentals are the rental history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: Uuid,
    pub student_id: Uuid,
    pub book_id: Uuid,
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "482913")]
    pub return_code: ReturnCode,
    pub returned: bool,
    pub rented_at: DateTime<Utc>,
    /// Set if and only if `returned`
    pub returned_at: Option<DateTime<Utc>>,
}

impl Rental {
    pub fn is_open(&self) -> bool {
        !self.returned
    }
}

/// Rental fields handed to the store when a rent is committed
#[derive(Debug, Clone)]
pub struct NewRental {
    pub student_id: Uuid,
    pub book_id: Uuid,
    pub return_code: ReturnCode,
}

/// Rental joined with its book; `book` is none once the book was deleted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalWithBook {
    #[serde(flatten)]
    pub rental: Rental,
    pub book: Option<Book>,
}

/// Outcome of a successful rent
#[derive(Debug, Clone)]
pub struct RentOutcome {
    pub rental: Rental,
    pub book: Book,
}
